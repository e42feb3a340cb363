//! Authentication types carried in JWTs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AccountId;

/// JWT claims for access tokens.
///
/// The subject is the caller's account; it is the only source of truth for
/// "my account" operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID).
    pub sub: AccountId,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for an account.
    #[must_use]
    pub fn new(account_id: AccountId, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: account_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the account ID from claims.
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        self.sub
    }
}
