//! Account routes: lifecycle, top-up, transfer, balance and history.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::HeaderMap,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use saku_core::ledger::{TopUpCommand, TransferCommand};
use saku_db::entities::accounts;
use saku_db::repositories::CreateAccount;
use saku_shared::types::{AccountId, PageRequest};

use super::idempotency_key;
use super::transactions::TransactionResponse;
use crate::{AppState, error::ApiResult, middleware::AuthUser};

/// Creates the public account routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/account/create", post(create_account))
        .route("/account/read/{id}", get(read_account))
        .route("/account/update/{id}", patch(update_account))
        .route("/account/delete/{id}", delete(delete_account))
        .route("/account/list", get(list_accounts))
}

/// Creates the account routes that act on the caller's own account.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/account/my", get(my_account))
        .route("/account/topup", post(top_up))
        .route("/account/balance", get(balance))
        .route("/account/transfer", post(transfer))
        .route("/account/mutation", get(mutation))
        .route("/account/audit", get(audit))
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account name.
    pub name: String,
    /// Opening balance in minor units (default 0).
    #[serde(default)]
    pub balance: i64,
}

/// Request body for renaming an account.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    /// New account name.
    pub name: String,
}

/// Request body for a top-up.
#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    /// Amount in minor units, must be positive.
    pub amount: i64,
    /// Defaults to now.
    pub transaction_date: Option<DateTime<Utc>>,
}

/// Request body for a transfer.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// Receiving account.
    pub target_account_id: AccountId,
    /// Amount in minor units, must be positive.
    pub amount: i64,
}

/// Response for an account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub account_id: i64,
    /// Account name.
    pub name: String,
    /// Current balance in minor units.
    pub balance: i64,
    /// Creation timestamp.
    pub created_at: DateTime<FixedOffset>,
}

impl From<accounts::Model> for AccountResponse {
    fn from(model: accounts::Model) -> Self {
        Self {
            account_id: model.account_id,
            name: model.name,
            balance: model.balance,
            created_at: model.created_at,
        }
    }
}

// ============================================================================
// Public lifecycle
// ============================================================================

/// POST `/account/create` - Create an account with an optional opening balance.
async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let account = state
        .account_repository()
        .create(CreateAccount {
            name: payload.name,
            opening_balance: payload.balance,
        })
        .await?;

    Ok(Json(AccountResponse::from(account)))
}

/// GET `/account/read/{id}` - Read an account.
async fn read_account(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(account_id) = path?;
    let account = state.account_repository().get(account_id).await?;
    Ok(Json(AccountResponse::from(account)))
}

/// PATCH `/account/update/{id}` - Rename an account.
async fn update_account(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(account_id) = path?;
    let Json(payload) = payload?;
    let account = state
        .account_repository()
        .rename(account_id, &payload.name)
        .await?;
    Ok(Json(AccountResponse::from(account)))
}

/// DELETE `/account/delete/{id}` - Delete an account without transactions.
async fn delete_account(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(account_id) = path?;
    state.account_repository().delete(account_id).await?;
    Ok(Json(json!({ "account_id": account_id, "deleted": true })))
}

/// GET `/account/list` - List accounts.
async fn list_accounts(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let accounts: Vec<AccountResponse> = state
        .account_repository()
        .list()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(json!({ "accounts": accounts })))
}

// ============================================================================
// Caller's account
// ============================================================================

/// GET `/account/my` - The caller's account.
async fn my_account(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let account = state.account_repository().get(auth.account_id()).await?;
    Ok(Json(AccountResponse::from(account)))
}

/// POST `/account/topup` - Credit the caller's account.
async fn top_up(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    payload: Result<Json<TopUpRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let command = TopUpCommand {
        account_id: auth.account_id(),
        amount: payload.amount,
        transaction_date: payload.transaction_date,
        idempotency_key: idempotency_key(&headers)?,
    };

    let receipt = state.ledger_repository().top_up(command).await?;

    Ok(Json(json!({
        "transaction": TransactionResponse::from(receipt.transaction),
        "balance": receipt.balance,
        "replayed": receipt.replayed
    })))
}

/// GET `/account/balance` - The caller's balance.
async fn balance(State(state): State<AppState>, auth: AuthUser) -> ApiResult<impl IntoResponse> {
    let account_id = auth.account_id();
    let balance = state.ledger_repository().balance(account_id).await?;
    Ok(Json(json!({
        "account_id": account_id,
        "balance": balance
    })))
}

/// POST `/account/transfer` - Move money from the caller to another account.
async fn transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let command = TransferCommand {
        source_account_id: auth.account_id(),
        target_account_id: payload.target_account_id,
        amount: payload.amount,
        idempotency_key: idempotency_key(&headers)?,
    };

    let receipt = state.ledger_repository().transfer(command).await?;

    Ok(Json(json!({
        "debit": TransactionResponse::from(receipt.debit),
        "credit": TransactionResponse::from(receipt.credit),
        "balance": receipt.source_balance,
        "replayed": receipt.replayed
    })))
}

/// GET `/account/mutation` - The caller's transactions, newest first.
async fn mutation(
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
        "mutations": items,
        "page": page.page,
        "limit": page.limit
    })))
}

/// GET `/account/audit` - Stored balance against the sum of the caller's rows.
async fn audit(State(state): State<AppState>, auth: AuthUser) -> ApiResult<impl IntoResponse> {
    let audit = state.ledger_repository().audit(auth.account_id()).await?;
    Ok(Json(json!({
        "account_id": audit.account_id,
        "stored_balance": audit.stored_balance,
        "ledger_total": audit.ledger_total,
        "consistent": audit.is_consistent()
    })))
}
