//! Balance-mutation rules.
//!
//! This module implements the pure side of the ledger:
//! - Commands for top-up, transfer and manual entries
//! - Postings (planned transaction rows) and transfer plans
//! - Funds checks and checked balance arithmetic
//! - Row lock ordering
//! - Ledger audit (stored balance vs. sum of rows)
//! - Retry policy for lock contention
//! - Error types for ledger operations

pub mod error;
pub mod retry;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::{ErrorKind, LedgerError};
pub use retry::RetryPolicy;
pub use service::LedgerService;
pub use types::{
    EntryCommand, IdempotencyKey, LedgerAudit, Posting, PostingKind, RecordedPosting,
    TopUpCommand, TransferCommand, TransferPlan,
};
