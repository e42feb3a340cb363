//! Integration tests for account and category lifecycle operations.

#[macro_use]
mod common;

use saku_core::ledger::{LedgerError, TopUpCommand};
use saku_db::repositories::{
    AccountError, AccountRepository, CategoryError, CategoryRepository, CreateAccount,
    LedgerRepository,
};
use saku_shared::types::{AccountId, CategoryId};

use common::{create_account, transaction_count};

#[tokio::test]
async fn test_opening_balance_is_backed_by_a_transaction() {
    let db = require_db!();
    let a = create_account(&db, 250).await;
    let ledger = LedgerRepository::new(db.clone());

    assert_eq!(ledger.balance(a).await.unwrap(), 250);
    assert_eq!(transaction_count(&db, a).await, 1);
    assert!(ledger.audit(a).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_zero_opening_balance_records_nothing() {
    let db = require_db!();
    let a = create_account(&db, 0).await;

    assert_eq!(transaction_count(&db, a).await, 0);
}

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    let db = require_db!();
    let repo = AccountRepository::new(db.clone());

    let blank = repo
        .create(CreateAccount {
            name: "   ".into(),
            opening_balance: 0,
        })
        .await;
    assert!(matches!(blank, Err(AccountError::InvalidName(_))));

    let negative = repo
        .create(CreateAccount {
            name: "Overdrawn".into(),
            opening_balance: -5,
        })
        .await;
    assert!(matches!(negative, Err(AccountError::NegativeOpeningBalance(-5))));
}

#[tokio::test]
async fn test_rename_keeps_balance() {
    let db = require_db!();
    let repo = AccountRepository::new(db.clone());
    let a = create_account(&db, 40).await;

    let renamed = repo.rename(a, "  Holiday fund ").await.unwrap();

    assert_eq!(renamed.name, "Holiday fund");
    assert_eq!(renamed.balance, 40);
    assert!(matches!(
        repo.rename(AccountId::from_i64(i64::MAX), "x").await,
        Err(AccountError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_refuses_accounts_with_transactions() {
    let db = require_db!();
    let repo = AccountRepository::new(db.clone());
    let funded = create_account(&db, 10).await;
    let empty = create_account(&db, 0).await;

    assert!(matches!(
        repo.delete(funded).await,
        Err(AccountError::HasTransactions(id)) if id == funded
    ));

    repo.delete(empty).await.unwrap();
    assert!(repo.find_by_id(empty).await.unwrap().is_none());
    assert!(matches!(
        repo.delete(empty).await,
        Err(AccountError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_deleted_account_cannot_be_topped_up() {
    let db = require_db!();
    let repo = AccountRepository::new(db.clone());
    let a = create_account(&db, 0).await;
    repo.delete(a).await.unwrap();

    let result = LedgerRepository::new(db.clone())
        .top_up(TopUpCommand {
            account_id: a,
            amount: 1,
            transaction_date: None,
            idempotency_key: None,
        })
        .await;
    assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
}

#[tokio::test]
async fn test_category_lifecycle() {
    let db = require_db!();
    let repo = CategoryRepository::new(db.clone());

    let category = repo.create("Utilities").await.unwrap();
    let id = CategoryId::from_i64(category.transaction_category_id);
    assert_eq!(repo.get(id).await.unwrap().name, "Utilities");

    let renamed = repo.rename(id, "Bills").await.unwrap();
    assert_eq!(renamed.name, "Bills");
    assert!(repo.list().await.unwrap().iter().any(|c| c.name == "Bills"));

    repo.delete(id).await.unwrap();
    assert!(matches!(repo.get(id).await, Err(CategoryError::NotFound(_))));
    assert!(matches!(
        repo.create("").await,
        Err(CategoryError::InvalidName(_))
    ));
}
