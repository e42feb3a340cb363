//! Ledger repository: the atomic units of work behind top-up, transfer and
//! manual entries, plus the balance, history and audit queries.
//!
//! Every mutation runs in one `READ COMMITTED` database transaction that
//! locks the affected account rows (`SELECT ... FOR UPDATE`) before reading a
//! balance, so check-then-debit is indivisible. Balances are changed with
//! relative updates (`balance = balance + delta`). An uncommitted
//! `DatabaseTransaction` rolls back when dropped, which covers early returns,
//! panics and cancelled request futures alike.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, IsolationLevel, QueryFilter, QueryOrder, QuerySelect,
    RuntimeErr, Set, TransactionTrait, sea_query::Expr,
};
use tracing::{debug, info, warn};

use saku_core::ledger::{
    EntryCommand, IdempotencyKey, LedgerAudit, LedgerError, LedgerService, Posting, PostingKind,
    RecordedPosting, RetryPolicy, TopUpCommand, TransferCommand, TransferPlan,
};
use saku_shared::LedgerConfig;
use saku_shared::types::{AccountId, CategoryId, PageRequest, TransactionId};

use crate::entities::{accounts, transaction_categories, transactions};

/// PostgreSQL `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// PostgreSQL `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";
/// PostgreSQL `lock_not_available`, raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Result of a single-row mutation (top-up or manual entry).
#[derive(Debug, Clone)]
pub struct PostingReceipt {
    /// The recorded transaction row.
    pub transaction: transactions::Model,
    /// Account balance after the mutation.
    pub balance: i64,
    /// True if an earlier request with the same idempotency key was returned.
    pub replayed: bool,
}

/// Result of a transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    /// Row on the source account (negative amount).
    pub debit: transactions::Model,
    /// Row on the target account (positive amount).
    pub credit: transactions::Model,
    /// Source balance after the transfer.
    pub source_balance: i64,
    /// True if an earlier request with the same idempotency key was returned.
    pub replayed: bool,
}

/// Repository for balance-affecting operations and ledger queries.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    retry: RetryPolicy,
    lock_timeout: Duration,
}

impl LedgerRepository {
    /// Creates a new ledger repository with default retry and lock settings.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self::from_config(db, &LedgerConfig::default())
    }

    /// Creates a ledger repository tuned by the `ledger` configuration section.
    #[must_use]
    pub fn from_config(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self {
            db,
            retry: RetryPolicy::from_config(config),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the per-unit `lock_timeout`.
    #[must_use]
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Credits an account and records the matching transaction row.
    ///
    /// # Errors
    ///
    /// - `NonPositiveAmount` / `InvalidIdempotencyKey` before any storage access
    /// - `AccountNotFound` if the account does not exist
    /// - `IdempotencyConflict` if the key was used for a different request
    /// - `LockContention` / `Storage` once retries are exhausted
    pub async fn top_up(&self, command: TopUpCommand) -> Result<PostingReceipt, LedgerError> {
        let posting = LedgerService::plan_top_up(&command, Utc::now())?;
        let receipt = self.post_single("top_up", &posting, command.idempotency_key.as_ref()).await?;

        info!(
            account_id = %command.account_id,
            amount = command.amount,
            transaction_id = receipt.transaction.transaction_id,
            replayed = receipt.replayed,
            "Top-up applied"
        );
        Ok(receipt)
    }

    /// Records a manual, optionally categorized, credit or debit.
    ///
    /// # Errors
    ///
    /// As [`Self::top_up`], plus `ZeroAmount`, `CategoryNotFound` and
    /// `InsufficientFunds` for debits larger than the balance.
    pub async fn record_entry(&self, command: EntryCommand) -> Result<PostingReceipt, LedgerError> {
        let posting = LedgerService::plan_entry(&command, Utc::now())?;
        let receipt = self
            .post_single("record_entry", &posting, command.idempotency_key.as_ref())
            .await?;

        info!(
            account_id = %command.account_id,
            amount = command.amount,
            category_id = ?command.category_id,
            transaction_id = receipt.transaction.transaction_id,
            replayed = receipt.replayed,
            "Ledger entry recorded"
        );
        Ok(receipt)
    }

    /// Moves money between two accounts in one unit of work.
    ///
    /// # Errors
    ///
    /// - `NonPositiveAmount` / `SelfTransfer` / `InvalidIdempotencyKey` before any storage access
    /// - `AccountNotFound` if either account does not exist
    /// - `InsufficientFunds` if the locked source balance is below the amount
    /// - `IdempotencyConflict` if the key was used for a different request
    /// - `LockContention` / `Storage` once retries are exhausted
    pub async fn transfer(&self, command: TransferCommand) -> Result<TransferReceipt, LedgerError> {
        let plan = LedgerService::plan_transfer(&command, Utc::now())?;
        let plan = &plan;
        let key = command.idempotency_key.as_ref();

        let receipt = self
            .with_retry("transfer", move || self.transfer_once(plan, key))
            .await?;

        info!(
            source_account_id = %command.source_account_id,
            target_account_id = %command.target_account_id,
            amount = command.amount,
            debit_id = receipt.debit.transaction_id,
            credit_id = receipt.credit.transaction_id,
            replayed = receipt.replayed,
            "Transfer applied"
        );
        Ok(receipt)
    }

    async fn post_single(
        &self,
        operation: &'static str,
        posting: &Posting,
        key: Option<&IdempotencyKey>,
    ) -> Result<PostingReceipt, LedgerError> {
        self.with_retry(operation, move || self.post_single_once(posting, key))
            .await
    }

    async fn post_single_once(
        &self,
        posting: &Posting,
        key: Option<&IdempotencyKey>,
    ) -> Result<PostingReceipt, LedgerError> {
        let txn = self.begin_unit(IsolationLevel::ReadCommitted, None).await?;
        let account = lock_account(&txn, posting.account_id).await?;

        if let Some(key) = key {
            if let Some(existing) = find_by_idempotency_key(&txn, posting.account_id, key).await? {
                if !posting.same_effect(&recorded_posting(&existing)) {
                    return Err(LedgerError::IdempotencyConflict(key.to_string()));
                }
                txn.commit().await.map_err(classify_db_error)?;
                return Ok(PostingReceipt {
                    transaction: existing,
                    balance: account.balance,
                    replayed: true,
                });
            }
        }

        if let Some(category_id) = posting.category_id {
            lock_category(&txn, category_id).await?;
        }

        let balance =
            LedgerService::apply_delta(posting.account_id, account.balance, posting.amount)?;
        adjust_balance(&txn, posting.account_id, posting.amount).await?;
        let transaction = insert_posting(&txn, posting, None, key).await?;

        txn.commit().await.map_err(classify_db_error)?;

        Ok(PostingReceipt {
            transaction,
            balance,
            replayed: false,
        })
    }

    async fn transfer_once(
        &self,
        plan: &TransferPlan,
        key: Option<&IdempotencyKey>,
    ) -> Result<TransferReceipt, LedgerError> {
        let txn = self.begin_unit(IsolationLevel::ReadCommitted, None).await?;

        let [first, second] = LedgerService::lock_order(plan.source(), plan.target());
        let first_row = lock_account(&txn, first).await?;
        let second_row = lock_account(&txn, second).await?;
        let (source, target) = if first == plan.source() {
            (first_row, second_row)
        } else {
            (second_row, first_row)
        };

        if let Some(key) = key {
            if let Some(debit) = find_by_idempotency_key(&txn, plan.source(), key).await? {
                if !plan.debit.same_effect(&recorded_posting(&debit)) {
                    return Err(LedgerError::IdempotencyConflict(key.to_string()));
                }
                let credit = match debit.related_transaction_id {
                    Some(id) => transactions::Entity::find_by_id(id)
                        .one(&txn)
                        .await
                        .map_err(classify_db_error)?,
                    None => None,
                }
                .ok_or_else(|| LedgerError::IdempotencyConflict(key.to_string()))?;

                txn.commit().await.map_err(classify_db_error)?;
                return Ok(TransferReceipt {
                    debit,
                    credit,
                    source_balance: source.balance,
                    replayed: true,
                });
            }
        }

        LedgerService::check_funds(plan.source(), source.balance, plan.amount())?;
        let source_balance =
            LedgerService::apply_delta(plan.source(), source.balance, plan.debit.amount)?;
        LedgerService::apply_delta(plan.target(), target.balance, plan.credit.amount)?;

        adjust_balance(&txn, plan.source(), plan.debit.amount).await?;
        adjust_balance(&txn, plan.target(), plan.credit.amount).await?;

        let credit = insert_posting(&txn, &plan.credit, None, None).await?;
        let debit = insert_posting(
            &txn,
            &plan.debit,
            Some(TransactionId::from_i64(credit.transaction_id)),
            key,
        )
        .await?;

        txn.commit().await.map_err(classify_db_error)?;

        Ok(TransferReceipt {
            debit,
            credit,
            source_balance,
            replayed: false,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns the stored balance of an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn balance(&self, account_id: AccountId) -> Result<i64, LedgerError> {
        accounts::Entity::find_by_id(account_id.into_inner())
            .one(&self.db)
            .await
            .map_err(classify_db_error)?
            .map(|account| account.balance)
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Returns the most recent transactions of an account, newest first.
    ///
    /// Ordered by `transaction_date DESC, transaction_id DESC`. An account
    /// without transactions yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPage` for an out-of-range page and `AccountNotFound` if
    /// the account does not exist.
    pub async fn history(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<Vec<transactions::Model>, LedgerError> {
        let page = LedgerService::validate_page(page)?;

        let exists = accounts::Entity::find_by_id(account_id.into_inner())
            .one(&self.db)
            .await
            .map_err(classify_db_error)?
            .is_some();
        if !exists {
            return Err(LedgerError::AccountNotFound(account_id));
        }

        let rows = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id.into_inner()))
            .order_by_desc(transactions::Column::TransactionDate)
            .order_by_desc(transactions::Column::TransactionId)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(classify_db_error)?;

        debug!(account_id = %account_id, rows = rows.len(), "Loaded transaction history");
        Ok(rows)
    }

    /// Compares the stored balance with the sum of the account's transactions.
    ///
    /// Both values are read from one `REPEATABLE READ` snapshot.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn audit(&self, account_id: AccountId) -> Result<LedgerAudit, LedgerError> {
        let txn = self
            .begin_unit(IsolationLevel::RepeatableRead, Some(AccessMode::ReadOnly))
            .await?;

        let account = accounts::Entity::find_by_id(account_id.into_inner())
            .one(&txn)
            .await
            .map_err(classify_db_error)?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        let ledger_total = ledger_total(&txn, account_id).await?;

        txn.commit().await.map_err(classify_db_error)?;

        let audit = LedgerService::reconcile(account_id, account.balance, ledger_total);
        if !audit.is_consistent() {
            warn!(
                account_id = %account_id,
                stored_balance = audit.stored_balance,
                ledger_total = audit.ledger_total,
                "Ledger audit found a balance discrepancy"
            );
        }
        Ok(audit)
    }

    // ========================================================================
    // Unit-of-work plumbing
    // ========================================================================

    async fn begin_unit(
        &self,
        isolation: IsolationLevel,
        access: Option<AccessMode>,
    ) -> Result<DatabaseTransaction, LedgerError> {
        let txn = self
            .db
            .begin_with_config(Some(isolation), access)
            .await
            .map_err(classify_db_error)?;

        // SET LOCAL lasts until this transaction ends.
        txn.execute_unprepared(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .await
        .map_err(classify_db_error)?;

        Ok(txn)
    }

    /// Runs `unit` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut unit: F,
    ) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt = 0;
        loop {
            match unit().await {
                Err(err) if self.retry.should_retry(&err, attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        ?delay,
                        error = %err,
                        "Lock contention, retrying unit of work"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

// ============================================================================
// Statements shared by the units of work (also used for opening balances)
// ============================================================================

/// Locks an account row for the rest of the transaction.
pub(crate) async fn lock_account<C: ConnectionTrait>(
    conn: &C,
    account_id: AccountId,
) -> Result<accounts::Model, LedgerError> {
    accounts::Entity::find_by_id(account_id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(classify_db_error)?
        .ok_or(LedgerError::AccountNotFound(account_id))
}

/// Holds a share lock on a category so it cannot be deleted mid-unit.
async fn lock_category<C: ConnectionTrait>(
    conn: &C,
    category_id: CategoryId,
) -> Result<(), LedgerError> {
    transaction_categories::Entity::find_by_id(category_id.into_inner())
        .lock_shared()
        .one(conn)
        .await
        .map_err(classify_db_error)?
        .map(|_| ())
        .ok_or(LedgerError::CategoryNotFound(category_id))
}

/// `UPDATE accounts SET balance = balance + delta`.
pub(crate) async fn adjust_balance<C: ConnectionTrait>(
    conn: &C,
    account_id: AccountId,
    delta: i64,
) -> Result<(), LedgerError> {
    let result = accounts::Entity::update_many()
        .col_expr(
            accounts::Column::Balance,
            Expr::col(accounts::Column::Balance).add(delta),
        )
        .filter(accounts::Column::AccountId.eq(account_id.into_inner()))
        .exec(conn)
        .await
        .map_err(classify_db_error)?;

    if result.rows_affected == 0 {
        return Err(LedgerError::AccountNotFound(account_id));
    }
    Ok(())
}

/// Appends one transaction row.
pub(crate) async fn insert_posting<C: ConnectionTrait>(
    conn: &C,
    posting: &Posting,
    related: Option<TransactionId>,
    key: Option<&IdempotencyKey>,
) -> Result<transactions::Model, LedgerError> {
    transactions::ActiveModel {
        account_id: Set(posting.account_id.into_inner()),
        transaction_category_id: Set(posting.category_id.map(CategoryId::into_inner)),
        from_account_id: Set(posting.from_account_id.map(AccountId::into_inner)),
        to_account_id: Set(posting.to_account_id.map(AccountId::into_inner)),
        related_transaction_id: Set(related.map(TransactionId::into_inner)),
        kind: Set(posting.kind.as_str().to_string()),
        amount: Set(posting.amount),
        transaction_date: Set(posting.transaction_date.into()),
        idempotency_key: Set(key.map(|k| k.as_str().to_string())),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(classify_db_error)
}

async fn find_by_idempotency_key<C: ConnectionTrait>(
    conn: &C,
    account_id: AccountId,
    key: &IdempotencyKey,
) -> Result<Option<transactions::Model>, LedgerError> {
    transactions::Entity::find()
        .filter(transactions::Column::AccountId.eq(account_id.into_inner()))
        .filter(transactions::Column::IdempotencyKey.eq(key.as_str()))
        .one(conn)
        .await
        .map_err(classify_db_error)
}

async fn ledger_total<C: ConnectionTrait>(
    conn: &C,
    account_id: AccountId,
) -> Result<i64, LedgerError> {
    // SUM(bigint) is numeric in PostgreSQL.
    let total: Option<i64> = transactions::Entity::find()
        .select_only()
        .column_as(Expr::cust("COALESCE(SUM(amount), 0)::BIGINT"), "total")
        .filter(transactions::Column::AccountId.eq(account_id.into_inner()))
        .into_tuple()
        .one(conn)
        .await
        .map_err(classify_db_error)?;

    Ok(total.unwrap_or(0))
}

fn recorded_posting(model: &transactions::Model) -> RecordedPosting {
    RecordedPosting {
        kind: PostingKind::parse(&model.kind),
        account_id: AccountId::from_i64(model.account_id),
        amount: model.amount,
        category_id: model.transaction_category_id.map(CategoryId::from_i64),
        from_account_id: model.from_account_id.map(AccountId::from_i64),
        to_account_id: model.to_account_id.map(AccountId::from_i64),
    }
}

// ============================================================================
// Error classification
// ============================================================================

/// Extracts the PostgreSQL SQLSTATE code from a database error, if any.
fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(e) => sqlx_sqlstate(e),
        RuntimeErr::Internal(_) => None,
    }
}

fn sqlx_sqlstate(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(sqlx::error::DatabaseError::code)
        .map(std::borrow::Cow::into_owned)
}

/// Maps a database error to `LockContention` (retryable) or `Storage`.
pub(crate) fn classify_db_error(err: DbErr) -> LedgerError {
    match sqlstate(&err).as_deref() {
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE) => {
            LedgerError::LockContention(err.to_string())
        }
        _ => LedgerError::Storage(err.to_string()),
    }
}
