//! Ledger error types for validation, lookup, funds and storage failures.
//!
//! Every failure of a top-up, transfer, entry or history query is one of
//! these. The database layer classifies storage failures into
//! `LockContention` (retryable) or `Storage`.

use saku_shared::AppError;
use saku_shared::types::{AccountId, CategoryId};
use thiserror::Error;

/// Coarse classification of a ledger error, as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or semantically invalid input.
    Validation,
    /// A referenced account or category does not exist.
    NotFound,
    /// A debit exceeds the available balance.
    InsufficientFunds,
    /// The request conflicts with recorded state.
    Conflict,
    /// The store failed or could not acquire a lock in time.
    Storage,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Top-up and transfer amounts must be strictly positive.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    /// Manual entries must move money in some direction.
    #[error("Entry amount cannot be zero")]
    ZeroAmount,

    /// Source and target of a transfer are the same account.
    #[error("Cannot transfer from account {0} to itself")]
    SelfTransfer(AccountId),

    /// Applying the amount would overflow the balance.
    #[error("Balance of account {0} would overflow")]
    BalanceOverflow(AccountId),

    /// The idempotency key is empty, too long or contains control characters.
    #[error("Invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),

    /// The requested history page is out of range.
    #[error("Invalid page: page must be >= 1 and limit between 1 and {max}, got page {page}, limit {limit}")]
    InvalidPage {
        /// Requested page.
        page: u32,
        /// Requested limit.
        limit: u32,
        /// Largest allowed limit.
        max: u32,
    },

    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Transaction category not found.
    #[error("Transaction category not found: {0}")]
    CategoryNotFound(CategoryId),

    // ========== Funds Errors ==========
    /// The debit exceeds the balance read under lock.
    #[error("Insufficient balance in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// The debited account.
        account_id: AccountId,
        /// Balance at the time of the check.
        balance: i64,
        /// Amount that was requested.
        requested: i64,
    },

    // ========== Conflict Errors ==========
    /// The idempotency key was already used for a different mutation.
    #[error("Idempotency key '{0}' was already used for a different request")]
    IdempotencyConflict(String),

    // ========== Storage Errors ==========
    /// Serialization failure, deadlock or lock timeout.
    #[error("Lock contention, please retry: {0}")]
    LockContention(String),

    /// Any other storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the coarse error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NonPositiveAmount(_)
            | Self::ZeroAmount
            | Self::SelfTransfer(_)
            | Self::BalanceOverflow(_)
            | Self::InvalidIdempotencyKey(_)
            | Self::InvalidPage { .. } => ErrorKind::Validation,
            Self::AccountNotFound(_) | Self::CategoryNotFound(_) => ErrorKind::NotFound,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::IdempotencyConflict(_) => ErrorKind::Conflict,
            Self::LockContention(_) | Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::SelfTransfer(_) => "SELF_TRANSFER",
            Self::BalanceOverflow(_) => "BALANCE_OVERFLOW",
            Self::InvalidIdempotencyKey(_) => "INVALID_IDEMPOTENCY_KEY",
            Self::InvalidPage { .. } => "INVALID_PAGE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::IdempotencyConflict(_) => "IDEMPOTENCY_CONFLICT",
            Self::LockContention(_) => "LOCK_CONTENTION",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::InsufficientFunds => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Storage => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LockContention(_))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::InsufficientFunds => Self::InsufficientFunds(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Storage => Self::Database(message),
        }
    }
}
