//! Transaction routes: manual ledger entries and the caller's history.

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use saku_core::ledger::EntryCommand;
use saku_db::entities::transactions;
use saku_shared::types::{CategoryId, PageRequest};

use super::idempotency_key;
use crate::{AppState, error::ApiResult, middleware::AuthUser};

/// Creates the transaction routes (requires auth middleware to be applied externally).
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/transaction/create", post(create_transaction))
        .route("/transaction/list", get(list_transactions))
}

/// Request body for a manual entry.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Signed amount in minor units: positive credits, negative debits.
    pub amount: i64,
    /// Optional category.
    pub transaction_category_id: Option<CategoryId>,
    /// Defaults to now.
    pub transaction_date: Option<DateTime<Utc>>,
}

/// A ledger row as returned by the API.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub transaction_id: i64,
    /// Owning account.
    pub account_id: i64,
    /// Category, if any.
    pub transaction_category_id: Option<i64>,
    /// Sender, on the credit row of a transfer.
    pub from_account_id: Option<i64>,
    /// Receiver, on the debit row of a transfer.
    pub to_account_id: Option<i64>,
    /// Credit row linked from a transfer's debit row.
    pub related_transaction_id: Option<i64>,
    /// Operation that wrote the row: `top_up`, `transfer` or `entry`.
    pub kind: String,
    /// Signed amount in minor units.
    pub amount: i64,
    /// When the transaction took effect.
    pub transaction_date: DateTime<FixedOffset>,
}

impl From<transactions::Model> for TransactionResponse {
    fn from(model: transactions::Model) -> Self {
        Self {
            transaction_id: model.transaction_id,
            account_id: model.account_id,
            transaction_category_id: model.transaction_category_id,
            from_account_id: model.from_account_id,
            to_account_id: model.to_account_id,
            related_transaction_id: model.related_transaction_id,
            kind: model.kind,
            amount: model.amount,
            transaction_date: model.transaction_date,
        }
    }
}

/// POST `/transaction/create` - Record a manual entry on the caller's account.
async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let command = EntryCommand {
        account_id: auth.account_id(),
        amount: payload.amount,
        category_id: payload.transaction_category_id,
        transaction_date: payload.transaction_date,
        idempotency_key: idempotency_key(&headers)?,
    };

    let receipt = state.ledger_repository().record_entry(command).await?;

    Ok(Json(json!({
        "transaction": TransactionResponse::from(receipt.transaction),
        "balance": receipt.balance,
        "replayed": receipt.replayed
    })))
}

/// GET `/transaction/list` - The caller's transactions, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(page) = query?;
    let rows = state
        .ledger_repository()
        .history(auth.account_id(), page)
        .await?;

    let items: Vec<TransactionResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(json!({
        "transactions": items,
        "page": page.page,
        "limit": page.limit
    })))
}
