//! Transaction category routes.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::json;

use saku_db::entities::transaction_categories;
use saku_shared::types::CategoryId;

use crate::{AppState, error::ApiResult};

/// Creates the public category routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/transaction-category/read/{id}", get(read_category))
        .route("/transaction-category/update/{id}", patch(update_category))
        .route("/transaction-category/delete/{id}", delete(delete_category))
        .route("/transaction-category/list", get(list_categories))
}

/// Creates the category routes that require a caller.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/transaction-category/create", post(create_category))
}

/// Request body for creating or renaming a category.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    /// Category name.
    pub name: String,
}

/// Response for a category.
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    /// Category ID.
    pub transaction_category_id: i64,
    /// Category name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<FixedOffset>,
}

impl From<transaction_categories::Model> for CategoryResponse {
    fn from(model: transaction_categories::Model) -> Self {
        Self {
            transaction_category_id: model.transaction_category_id,
            name: model.name,
            created_at: model.created_at,
        }
    }
}

async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let category = state.category_repository().create(&payload.name).await?;
    Ok(Json(CategoryResponse::from(category)))
}

async fn read_category(
    State(state): State<AppState>,
    path: Result<Path<CategoryId>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(category_id) = path?;
    let category = state.category_repository().get(category_id).await?;
    Ok(Json(CategoryResponse::from(category)))
}

async fn update_category(
    State(state): State<AppState>,
    path: Result<Path<CategoryId>, PathRejection>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(category_id) = path?;
    let Json(payload) = payload?;
    let category = state
        .category_repository()
        .rename(category_id, &payload.name)
        .await?;
    Ok(Json(CategoryResponse::from(category)))
}

async fn delete_category(
    State(state): State<AppState>,
    path: Result<Path<CategoryId>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(category_id) = path?;
    state.category_repository().delete(category_id).await?;
    Ok(Json(json!({ "transaction_category_id": category_id, "deleted": true })))
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let categories: Vec<CategoryResponse> = state
        .category_repository()
        .list()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(json!({ "transaction_categories": categories })))
}
