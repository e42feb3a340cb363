//! Error-to-response mapping for handlers.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use saku_core::ledger::LedgerError;
use saku_db::repositories::{AccountError, CategoryError};
use saku_shared::AppError;

/// Handler error rendered as `{"error": CODE, "message": text}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

macro_rules! into_app_error {
    ($($source:ty),+) => {
        $(
            impl From<$source> for ApiError {
                fn from(err: $source) -> Self {
                    Self(err.into())
                }
            }
        )+
    };
}

into_app_error!(AppError, LedgerError, AccountError, CategoryError);

// Malformed bodies, query strings and path segments are validation errors.
macro_rules! rejection_as_validation {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    Self(AppError::Validation(rejection.body_text()))
                }
            }
        )+
    };
}

rejection_as_validation!(JsonRejection, QueryRejection, PathRejection);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Storage details stay in the log.
        let message = if self.0.is_server_error() {
            error!(error = %self.0, "Request failed");
            "An internal error occurred".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saku_shared::types::AccountId;

    #[test]
    fn test_server_errors_hide_details() {
        let response = ApiError(AppError::Database("password=hunter2".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_ledger_errors_keep_their_status() {
        let response = ApiError::from(LedgerError::IdempotencyConflict("k".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = ApiError::from(LedgerError::InsufficientFunds {
            account_id: AccountId::from_i64(1),
            balance: 0,
            requested: 5,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            ApiError::from(LedgerError::AccountNotFound(AccountId::from_i64(9))).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
