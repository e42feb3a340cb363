//! Ledger service: the pure rules behind top-up, transfer and manual entries.
//!
//! The service never touches storage. The database layer calls it inside a
//! unit of work, after it has locked the rows involved, so every balance
//! passed in here was read under lock.

use chrono::{DateTime, Utc};

use saku_shared::types::{AccountId, PageRequest, pagination::MAX_PAGE_LIMIT};

use super::error::LedgerError;
use super::types::{
    EntryCommand, LedgerAudit, Posting, PostingKind, TopUpCommand, TransferCommand, TransferPlan,
};

/// Ledger service for mutation planning and funds checks.
pub struct LedgerService;

impl LedgerService {
    /// Plans the single credit posting of a top-up.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NonPositiveAmount` if `amount <= 0`.
    pub fn plan_top_up(command: &TopUpCommand, now: DateTime<Utc>) -> Result<Posting, LedgerError> {
        if command.amount <= 0 {
            return Err(LedgerError::NonPositiveAmount(command.amount));
        }

        Ok(Posting {
            kind: PostingKind::TopUp,
            account_id: command.account_id,
            amount: command.amount,
            category_id: None,
            from_account_id: None,
            to_account_id: None,
            transaction_date: command.transaction_date.unwrap_or(now),
        })
    }

    /// Plans the posting of a manual, optionally categorized entry.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ZeroAmount` if `amount == 0`.
    pub fn plan_entry(command: &EntryCommand, now: DateTime<Utc>) -> Result<Posting, LedgerError> {
        if command.amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        // Negating i64::MIN is not representable as a debit amount.
        if command.amount == i64::MIN {
            return Err(LedgerError::BalanceOverflow(command.account_id));
        }

        Ok(Posting {
            kind: PostingKind::Entry,
            account_id: command.account_id,
            amount: command.amount,
            category_id: command.category_id,
            from_account_id: None,
            to_account_id: None,
            transaction_date: command.transaction_date.unwrap_or(now),
        })
    }

    /// Plans the debit and credit postings of a transfer.
    ///
    /// Both postings share one booking date.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NonPositiveAmount` if `amount <= 0`, or
    /// `LedgerError::SelfTransfer` if source and target are the same account.
    pub fn plan_transfer(
        command: &TransferCommand,
        now: DateTime<Utc>,
    ) -> Result<TransferPlan, LedgerError> {
        if command.amount <= 0 {
            return Err(LedgerError::NonPositiveAmount(command.amount));
        }
        if command.source_account_id == command.target_account_id {
            return Err(LedgerError::SelfTransfer(command.source_account_id));
        }

        Ok(TransferPlan {
            debit: Posting {
                kind: PostingKind::Transfer,
                account_id: command.source_account_id,
                amount: -command.amount,
                category_id: None,
                from_account_id: None,
                to_account_id: Some(command.target_account_id),
                transaction_date: now,
            },
            credit: Posting {
                kind: PostingKind::Transfer,
                account_id: command.target_account_id,
                amount: command.amount,
                category_id: None,
                from_account_id: Some(command.source_account_id),
                to_account_id: None,
                transaction_date: now,
            },
        })
    }

    /// Checks that `balance` covers a debit of `amount`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InsufficientFunds` if `balance < amount`.
    pub fn check_funds(
        account_id: AccountId,
        balance: i64,
        amount: i64,
    ) -> Result<(), LedgerError> {
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account_id,
                balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Computes the balance after applying `delta`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::BalanceOverflow` on arithmetic overflow and
    /// `LedgerError::InsufficientFunds` if the result would be negative.
    pub fn apply_delta(account_id: AccountId, balance: i64, delta: i64) -> Result<i64, LedgerError> {
        if delta < 0 {
            let debit = delta
                .checked_neg()
                .ok_or(LedgerError::BalanceOverflow(account_id))?;
            Self::check_funds(account_id, balance, debit)?;
        }
        balance
            .checked_add(delta)
            .ok_or(LedgerError::BalanceOverflow(account_id))
    }

    /// Returns two account IDs in the order their rows must be locked.
    ///
    /// Every unit of work that locks two accounts uses ascending ID order, so
    /// opposite transfers between the same pair wait on each other instead of
    /// deadlocking.
    #[must_use]
    pub fn lock_order(a: AccountId, b: AccountId) -> [AccountId; 2] {
        if a <= b { [a, b] } else { [b, a] }
    }

    /// Validates a history page request.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidPage` if the page is out of range.
    pub fn validate_page(page: PageRequest) -> Result<PageRequest, LedgerError> {
        if page.is_valid() {
            Ok(page)
        } else {
            Err(LedgerError::InvalidPage {
                page: page.page,
                limit: page.limit,
                max: MAX_PAGE_LIMIT,
            })
        }
    }

    /// Compares a stored balance with the sum of the account's transaction rows.
    #[must_use]
    pub const fn reconcile(
        account_id: AccountId,
        stored_balance: i64,
        ledger_total: i64,
    ) -> LedgerAudit {
        LedgerAudit {
            account_id,
            stored_balance,
            ledger_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn id(n: i64) -> AccountId {
        AccountId::from_i64(n)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap()
    }

    fn top_up(amount: i64) -> TopUpCommand {
        TopUpCommand {
            account_id: id(1),
            amount,
            transaction_date: None,
            idempotency_key: None,
        }
    }

    fn transfer(source: i64, target: i64, amount: i64) -> TransferCommand {
        TransferCommand {
            source_account_id: id(source),
            target_account_id: id(target),
            amount,
            idempotency_key: None,
        }
    }

    #[test]
    fn test_top_up_credits_account() {
        let posting = LedgerService::plan_top_up(&top_up(50), now()).unwrap();
        assert_eq!(posting.kind, PostingKind::TopUp);
        assert_eq!(posting.account_id, id(1));
        assert_eq!(posting.amount, 50);
        assert_eq!(posting.transaction_date, now());
        assert!(!posting.is_debit());
        assert_eq!(posting.from_account_id, None);
        assert_eq!(posting.to_account_id, None);
    }

    #[test]
    fn test_top_up_uses_supplied_date() {
        let date = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let command = TopUpCommand {
            transaction_date: Some(date),
            ..top_up(10)
        };
        let posting = LedgerService::plan_top_up(&command, now()).unwrap();
        assert_eq!(posting.transaction_date, date);
    }

    #[test]
    fn test_top_up_rejects_non_positive_amount() {
        assert!(matches!(
            LedgerService::plan_top_up(&top_up(0), now()),
            Err(LedgerError::NonPositiveAmount(0))
        ));
        assert!(matches!(
            LedgerService::plan_top_up(&top_up(-5), now()),
            Err(LedgerError::NonPositiveAmount(-5))
        ));
    }

    #[test]
    fn test_transfer_plan_has_mirrored_postings() {
        let plan = LedgerService::plan_transfer(&transfer(1, 2, 100), now()).unwrap();

        assert_eq!(plan.source(), id(1));
        assert_eq!(plan.target(), id(2));
        assert_eq!(plan.amount(), 100);
        assert_eq!(plan.debit.amount, -100);
        assert_eq!(plan.debit.to_account_id, Some(id(2)));
        assert_eq!(plan.credit.amount, 100);
        assert_eq!(plan.credit.from_account_id, Some(id(1)));
        assert_eq!(plan.debit.transaction_date, plan.credit.transaction_date);
        assert_eq!(plan.debit.amount + plan.credit.amount, 0);
        assert_eq!(plan.debit.kind, PostingKind::Transfer);
        assert_eq!(plan.credit.kind, PostingKind::Transfer);
    }

    #[test]
    fn test_transfer_rejects_self_transfer() {
        assert!(matches!(
            LedgerService::plan_transfer(&transfer(1, 1, 10), now()),
            Err(LedgerError::SelfTransfer(a)) if a == id(1)
        ));
    }

    #[test]
    fn test_transfer_rejects_non_positive_amount() {
        assert!(matches!(
            LedgerService::plan_transfer(&transfer(1, 2, 0), now()),
            Err(LedgerError::NonPositiveAmount(0))
        ));
    }

    #[test]
    fn test_entry_allows_debits_and_rejects_zero() {
        let command = EntryCommand {
            account_id: id(4),
            amount: -30,
            category_id: Some(saku_shared::types::CategoryId::from_i64(2)),
            transaction_date: None,
            idempotency_key: None,
        };
        let posting = LedgerService::plan_entry(&command, now()).unwrap();
        assert!(posting.is_debit());
        assert_eq!(posting.kind, PostingKind::Entry);
        assert_eq!(posting.category_id, command.category_id);

        let zero = EntryCommand { amount: 0, ..command.clone() };
        assert!(matches!(
            LedgerService::plan_entry(&zero, now()),
            Err(LedgerError::ZeroAmount)
        ));

        let min = EntryCommand { amount: i64::MIN, ..command };
        assert!(matches!(
            LedgerService::plan_entry(&min, now()),
            Err(LedgerError::BalanceOverflow(_))
        ));
    }

    #[test]
    fn test_check_funds() {
        assert!(LedgerService::check_funds(id(1), 100, 100).is_ok());
        assert!(LedgerService::check_funds(id(1), 100, 60).is_ok());
        assert!(matches!(
            LedgerService::check_funds(id(1), 50, 100),
            Err(LedgerError::InsufficientFunds {
                balance: 50,
                requested: 100,
                ..
            })
        ));
    }

    #[test]
    fn test_apply_delta() {
        assert_eq!(LedgerService::apply_delta(id(1), 100, 50).unwrap(), 150);
        assert_eq!(LedgerService::apply_delta(id(1), 100, -100).unwrap(), 0);
        assert!(matches!(
            LedgerService::apply_delta(id(1), 50, -100),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            LedgerService::apply_delta(id(1), i64::MAX, 1),
            Err(LedgerError::BalanceOverflow(_))
        ));
    }

    #[test]
    fn test_lock_order_is_ascending() {
        assert_eq!(LedgerService::lock_order(id(2), id(1)), [id(1), id(2)]);
        assert_eq!(LedgerService::lock_order(id(1), id(2)), [id(1), id(2)]);
    }

    #[test]
    fn test_validate_page() {
        assert!(LedgerService::validate_page(PageRequest::default()).is_ok());
        assert!(matches!(
            LedgerService::validate_page(PageRequest::new(1, 0)),
            Err(LedgerError::InvalidPage { limit: 0, .. })
        ));
        assert!(LedgerService::validate_page(PageRequest::new(0, 10)).is_err());
        assert!(LedgerService::validate_page(PageRequest::new(1, 101)).is_err());
    }

    #[test]
    fn test_reconcile() {
        let audit = LedgerService::reconcile(id(1), 40, 40);
        assert!(audit.is_consistent());
    }
}
