//! Repository implementations for database operations.

pub mod account;
pub mod category;
pub mod ledger;

pub use account::{AccountError, AccountRepository, CreateAccount};
pub use category::{CategoryError, CategoryRepository};
pub use ledger::{LedgerRepository, PostingReceipt, TransferReceipt};

/// Longest accepted account or category name, matching the column width.
pub const MAX_NAME_LEN: usize = 255;

/// Rejected display name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// Empty after trimming.
    #[error("name must not be blank")]
    Blank,

    /// Longer than [`MAX_NAME_LEN`] characters.
    #[error("name must be at most {MAX_NAME_LEN} characters, got {0}")]
    TooLong(usize),
}

/// Trims a display name and checks its length.
pub fn normalize_name(raw: &str) -> Result<String, NameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(NameError::Blank);
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(NameError::TooLong(len));
    }
    Ok(name.to_string())
}
