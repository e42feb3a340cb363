//! Ledger domain types: commands coming in, postings going out.
//!
//! A command is what a caller asked for. A [`Posting`] is one transaction row
//! the store must write, together with the balance delta it implies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use saku_shared::types::{AccountId, CategoryId};

use super::error::LedgerError;

/// Longest accepted idempotency key, in characters.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Caller-chosen token that makes a mutation apply at most once per account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Parses and normalizes (trims) a raw key.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidIdempotencyKey` if the key is blank, longer
    /// than [`MAX_IDEMPOTENCY_KEY_LEN`] or contains control characters.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(LedgerError::InvalidIdempotencyKey("key is empty".into()));
        }
        if key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(LedgerError::InvalidIdempotencyKey(format!(
                "key is longer than {MAX_IDEMPOTENCY_KEY_LEN} characters"
            )));
        }
        if key.chars().any(char::is_control) {
            return Err(LedgerError::InvalidIdempotencyKey(
                "key contains control characters".into(),
            ));
        }
        Ok(Self(key.to_string()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credit the caller's own account.
#[derive(Debug, Clone)]
pub struct TopUpCommand {
    /// Authenticated account being credited.
    pub account_id: AccountId,
    /// Amount in minor units, must be positive.
    pub amount: i64,
    /// Optional caller-supplied booking date, defaults to now.
    pub transaction_date: Option<DateTime<Utc>>,
    /// Optional replay protection.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Move money from the caller's account to another account.
#[derive(Debug, Clone)]
pub struct TransferCommand {
    /// Authenticated account being debited.
    pub source_account_id: AccountId,
    /// Account being credited.
    pub target_account_id: AccountId,
    /// Amount in minor units, must be positive.
    pub amount: i64,
    /// Optional replay protection.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Record a categorized credit or debit on the caller's own account.
#[derive(Debug, Clone)]
pub struct EntryCommand {
    /// Authenticated account.
    pub account_id: AccountId,
    /// Signed amount in minor units, must be non-zero.
    pub amount: i64,
    /// Optional classification.
    pub category_id: Option<CategoryId>,
    /// Optional caller-supplied booking date, defaults to now.
    pub transaction_date: Option<DateTime<Utc>>,
    /// Optional replay protection.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// The operation that produced a transaction row.
///
/// Stored with the row, so a key reused across operations never replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostingKind {
    /// Top-up or opening balance.
    TopUp,
    /// One side of a transfer.
    Transfer,
    /// Manual entry.
    Entry,
}

impl PostingKind {
    /// Stored column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopUp => "top_up",
            Self::Transfer => "transfer",
            Self::Entry => "entry",
        }
    }

    /// Parses a stored column value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "top_up" => Some(Self::TopUp),
            "transfer" => Some(Self::Transfer),
            "entry" => Some(Self::Entry),
            _ => None,
        }
    }
}

/// One transaction row to be written, and the balance delta that goes with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Operation this row belongs to.
    pub kind: PostingKind,
    /// Account whose ledger line this is.
    pub account_id: AccountId,
    /// Signed amount; positive credits, negative debits.
    pub amount: i64,
    /// Optional classification.
    pub category_id: Option<CategoryId>,
    /// Sender, set on the credit side of a transfer.
    pub from_account_id: Option<AccountId>,
    /// Receiver, set on the debit side of a transfer.
    pub to_account_id: Option<AccountId>,
    /// Booking date.
    pub transaction_date: DateTime<Utc>,
}

impl Posting {
    /// Returns true if this posting reduces the balance.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        self.amount < 0
    }

    /// Returns true if a recorded row has the same effect as this posting.
    ///
    /// The booking date is ignored: a replay without an explicit date gets a
    /// fresh `now`.
    #[must_use]
    pub fn same_effect(&self, recorded: &RecordedPosting) -> bool {
        recorded.kind == Some(self.kind)
            && self.account_id == recorded.account_id
            && self.amount == recorded.amount
            && self.category_id == recorded.category_id
            && self.from_account_id == recorded.from_account_id
            && self.to_account_id == recorded.to_account_id
    }
}

/// The parts of a stored transaction row that identify its effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPosting {
    /// Operation that wrote the row; `None` if the stored value is unknown.
    pub kind: Option<PostingKind>,
    /// Account whose ledger line this is.
    pub account_id: AccountId,
    /// Signed amount.
    pub amount: i64,
    /// Optional classification.
    pub category_id: Option<CategoryId>,
    /// Sender, if any.
    pub from_account_id: Option<AccountId>,
    /// Receiver, if any.
    pub to_account_id: Option<AccountId>,
}

/// The two postings of a transfer. Both are written in one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    /// Source side, negative amount.
    pub debit: Posting,
    /// Target side, positive amount.
    pub credit: Posting,
}

impl TransferPlan {
    /// Debited account.
    #[must_use]
    pub const fn source(&self) -> AccountId {
        self.debit.account_id
    }

    /// Credited account.
    #[must_use]
    pub const fn target(&self) -> AccountId {
        self.credit.account_id
    }

    /// Positive amount moved.
    #[must_use]
    pub const fn amount(&self) -> i64 {
        self.credit.amount
    }
}

/// Stored balance compared with the sum of the account's transaction rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerAudit {
    /// Audited account.
    pub account_id: AccountId,
    /// Denormalized balance on the account row.
    pub stored_balance: i64,
    /// Sum of all transaction amounts for the account.
    pub ledger_total: i64,
}

impl LedgerAudit {
    /// Returns true if the stored balance equals the ledger total.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.stored_balance == self.ledger_total
    }

    /// Stored balance minus ledger total; zero when consistent.
    #[must_use]
    pub fn discrepancy(&self) -> i128 {
        i128::from(self.stored_balance) - i128::from(self.ledger_total)
    }
}
