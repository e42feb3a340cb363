//! Account repository for account lifecycle operations.
//!
//! Balances are never written here except through the opening-balance
//! posting, which reuses the ledger statements so the opening amount is
//! backed by a transaction row.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::info;

use saku_core::ledger::{LedgerError, LedgerService, TopUpCommand};
use saku_shared::AppError;
use saku_shared::types::AccountId;

use super::ledger::{adjust_balance, insert_posting, lock_account};
use super::{NameError, normalize_name};
use crate::entities::{accounts, transactions};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account not found.
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    /// Name is blank or too long.
    #[error("Invalid account name: {0}")]
    InvalidName(#[from] NameError),

    /// Opening balance below zero.
    #[error("Opening balance cannot be negative, got {0}")]
    NegativeOpeningBalance(i64),

    /// Cannot delete an account that has ledger transactions.
    #[error("Cannot delete account {0}: it has ledger transactions")]
    HasTransactions(AccountId),

    /// Opening balance posting failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(_) => Self::NotFound(err.to_string()),
            AccountError::InvalidName(_) | AccountError::NegativeOpeningBalance(_) => {
                Self::Validation(err.to_string())
            }
            AccountError::HasTransactions(_) => Self::Conflict(err.to_string()),
            AccountError::Ledger(e) => e.into(),
            AccountError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    /// Display name.
    pub name: String,
    /// Initial funds, recorded as a top-up transaction when positive.
    pub opening_balance: i64,
}

/// Account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account, posting the opening balance in the same unit.
    pub async fn create(&self, input: CreateAccount) -> Result<accounts::Model, AccountError> {
        let name = normalize_name(&input.name)?;
        if input.opening_balance < 0 {
            return Err(AccountError::NegativeOpeningBalance(input.opening_balance));
        }

        let txn = self.db.begin().await?;

        let account = accounts::ActiveModel {
            name: Set(name),
            balance: Set(0),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let account = if input.opening_balance > 0 {
            let account_id = AccountId::from_i64(account.account_id);
            let command = TopUpCommand {
                account_id,
                amount: input.opening_balance,
                transaction_date: None,
                idempotency_key: None,
            };
            let posting = LedgerService::plan_top_up(&command, Utc::now())?;
            adjust_balance(&txn, account_id, posting.amount).await?;
            insert_posting(&txn, &posting, None, None).await?;
            lock_account(&txn, account_id).await?
        } else {
            account
        };

        txn.commit().await?;

        info!(
            account_id = account.account_id,
            opening_balance = input.opening_balance,
            "Account created"
        );
        Ok(account)
    }

    /// Finds an account by ID.
    pub async fn find_by_id(
        &self,
        account_id: AccountId,
    ) -> Result<Option<accounts::Model>, AccountError> {
        Ok(accounts::Entity::find_by_id(account_id.into_inner())
            .one(&self.db)
            .await?)
    }

    /// Gets an account by ID, failing with `NotFound` if it does not exist.
    pub async fn get(&self, account_id: AccountId) -> Result<accounts::Model, AccountError> {
        self.find_by_id(account_id)
            .await?
            .ok_or(AccountError::NotFound(account_id))
    }

    /// Lists all accounts ordered by ID.
    pub async fn list(&self) -> Result<Vec<accounts::Model>, AccountError> {
        Ok(accounts::Entity::find()
            .order_by_asc(accounts::Column::AccountId)
            .all(&self.db)
            .await?)
    }

    /// Renames an account. The balance column is left untouched.
    pub async fn rename(
        &self,
        account_id: AccountId,
        name: &str,
    ) -> Result<accounts::Model, AccountError> {
        let name = normalize_name(name)?;
        let account = self.get(account_id).await?;

        let mut active: accounts::ActiveModel = account.into();
        active.name = Set(name);
        Ok(active.update(&self.db).await?)
    }

    /// Deletes an account that has no transactions referencing it.
    pub async fn delete(&self, account_id: AccountId) -> Result<(), AccountError> {
        let id = account_id.into_inner();
        let references = transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(transactions::Column::AccountId.eq(id))
                    .add(transactions::Column::FromAccountId.eq(id))
                    .add(transactions::Column::ToAccountId.eq(id)),
            )
            .count(&self.db)
            .await?;
        if references > 0 {
            return Err(AccountError::HasTransactions(account_id));
        }

        let result = accounts::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                // A transaction was inserted after the reference check.
                Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                    AccountError::HasTransactions(account_id)
                }
                _ => AccountError::Database(e),
            })?;

        if result.rows_affected == 0 {
            return Err(AccountError::NotFound(account_id));
        }

        info!(account_id = id, "Account deleted");
        Ok(())
    }
}
