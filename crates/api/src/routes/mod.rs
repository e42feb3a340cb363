//! API route definitions.
//!
//! Paths are served at the root, without a version prefix.

use axum::{Router, http::HeaderMap, middleware};

use crate::{AppState, error::ApiResult, middleware::auth_middleware};
use saku_core::ledger::{IdempotencyKey, LedgerError};

pub mod accounts;
pub mod health;
pub mod transaction_categories;
pub mod transactions;

/// Creates the API router with public and protected routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(accounts::protected_routes())
        .merge(transaction_categories::protected_routes())
        .merge(transactions::protected_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(accounts::public_routes())
        .merge(transaction_categories::public_routes())
        .merge(protected_routes)
}

/// Header carrying the caller's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Reads the optional `Idempotency-Key` header.
pub(crate) fn idempotency_key(headers: &HeaderMap) -> ApiResult<Option<IdempotencyKey>> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| {
        LedgerError::InvalidIdempotencyKey("key must be visible ASCII".to_string())
    })?;
    Ok(Some(IdempotencyKey::parse(raw)?))
}
