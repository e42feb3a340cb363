//! Property-based tests for LedgerService.
//!
//! A small in-memory ledger applies random operation sequences through the
//! service exactly the way the database layer does: plan, check under
//! "lock", apply deltas, append postings.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use saku_shared::types::AccountId;

use super::error::LedgerError;
use super::service::LedgerService;
use super::types::{Posting, TopUpCommand, TransferCommand};

const ACCOUNTS: i64 = 4;

#[derive(Debug, Clone)]
enum Op {
    TopUp { account: i64, amount: i64 },
    Transfer { source: i64, target: i64, amount: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1..=ACCOUNTS, -50i64..1_000).prop_map(|(account, amount)| Op::TopUp { account, amount }),
        (1..=ACCOUNTS, 1..=ACCOUNTS, -50i64..1_500)
            .prop_map(|(source, target, amount)| Op::Transfer { source, target, amount }),
    ]
}

#[derive(Default)]
struct Ledger {
    balances: HashMap<AccountId, i64>,
    postings: Vec<Posting>,
}

impl Ledger {
    fn balance(&self, id: AccountId) -> i64 {
        self.balances.get(&id).copied().unwrap_or(0)
    }

    fn sum_of_postings(&self, id: AccountId) -> i64 {
        self.postings
            .iter()
            .filter(|p| p.account_id == id)
            .map(|p| p.amount)
            .sum()
    }

    /// All-or-nothing application, mirroring one unit of work.
    fn apply(&mut self, op: &Op) -> Result<(), LedgerError> {
        let now = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let postings = match *op {
            Op::TopUp { account, amount } => vec![LedgerService::plan_top_up(
                &TopUpCommand {
                    account_id: AccountId::from_i64(account),
                    amount,
                    transaction_date: None,
                    idempotency_key: None,
                },
                now,
            )?],
            Op::Transfer {
                source,
                target,
                amount,
            } => {
                let plan = LedgerService::plan_transfer(
                    &TransferCommand {
                        source_account_id: AccountId::from_i64(source),
                        target_account_id: AccountId::from_i64(target),
                        amount,
                        idempotency_key: None,
                    },
                    now,
                )?;
                LedgerService::check_funds(plan.source(), self.balance(plan.source()), amount)?;
                vec![plan.debit, plan.credit]
            }
        };

        let mut staged = Vec::with_capacity(postings.len());
        for posting in &postings {
            let next = LedgerService::apply_delta(
                posting.account_id,
                self.balance(posting.account_id),
                posting.amount,
            )?;
            staged.push((posting.account_id, next));
        }
        for (id, next) in staged {
            self.balances.insert(id, next);
        }
        self.postings.extend(postings);
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// No operation sequence can drive a balance below zero.
    #[test]
    fn prop_balances_never_negative(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = Ledger::default();
        for op in &ops {
            let _ = ledger.apply(op);
            for id in 1..=ACCOUNTS {
                prop_assert!(ledger.balance(AccountId::from_i64(id)) >= 0);
            }
        }
    }

    /// Every balance equals the sum of its postings after any sequence.
    #[test]
    fn prop_balance_equals_sum_of_postings(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = Ledger::default();
        for op in &ops {
            let _ = ledger.apply(op);
        }
        for id in 1..=ACCOUNTS {
            let id = AccountId::from_i64(id);
            prop_assert_eq!(ledger.balance(id), ledger.sum_of_postings(id));
        }
    }

    /// Transfers conserve money; only top-ups change the total.
    #[test]
    fn prop_transfers_conserve_total(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = Ledger::default();
        let mut topped_up = 0i64;
        for op in &ops {
            if ledger.apply(op).is_ok() {
                if let Op::TopUp { amount, .. } = op {
                    topped_up += amount;
                }
            }
        }
        let total: i64 = (1..=ACCOUNTS).map(|id| ledger.balance(AccountId::from_i64(id))).sum();
        prop_assert_eq!(total, topped_up);
    }

    /// A failed operation leaves balances and postings untouched.
    #[test]
    fn prop_failed_operation_changes_nothing(
        ops in prop::collection::vec(op_strategy(), 1..40),
        next in op_strategy(),
    ) {
        let mut ledger = Ledger::default();
        for op in &ops {
            let _ = ledger.apply(op);
        }
        let balances_before = ledger.balances.clone();
        let postings_before = ledger.postings.len();

        if ledger.apply(&next).is_err() {
            prop_assert_eq!(&ledger.balances, &balances_before);
            prop_assert_eq!(ledger.postings.len(), postings_before);
        }
    }

    /// Competing transfers from one source: exactly floor(balance / amount) succeed.
    #[test]
    fn prop_competing_transfers_stop_at_zero(
        balance in 0i64..1_000,
        amount in 1i64..200,
        attempts in 1usize..30,
    ) {
        let mut ledger = Ledger::default();
        if balance > 0 {
            ledger.apply(&Op::TopUp { account: 1, amount: balance }).unwrap();
        }

        let mut succeeded = 0i64;
        for i in 0..attempts {
            let target = 2 + i64::try_from(i).unwrap() % (ACCOUNTS - 1);
            match ledger.apply(&Op::Transfer { source: 1, target, amount }) {
                Ok(()) => succeeded += 1,
                Err(e) => prop_assert!(matches!(e, LedgerError::InsufficientFunds { .. }), "unexpected error: {:?}", e),
            }
        }

        let expected = (balance / amount).min(i64::try_from(attempts).unwrap());
        prop_assert_eq!(succeeded, expected);
        prop_assert_eq!(ledger.balance(AccountId::from_i64(1)), balance - expected * amount);
    }
}
