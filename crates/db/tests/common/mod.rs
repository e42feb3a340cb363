//! Shared helpers for database integration tests.
//!
//! Tests run against the PostgreSQL instance named by `DATABASE_URL` and are
//! skipped when it is unset. Every test creates its own accounts, so tests
//! can share one database and run in parallel.

#![allow(dead_code)]

use std::env;

use fake::{Fake, faker::name::en::Name};
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use tokio::sync::OnceCell;

use saku_db::entities::transactions;
use saku_db::migration::{Migrator, MigratorTrait};
use saku_db::repositories::{AccountRepository, CreateAccount};
use saku_shared::types::AccountId;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Returns a connection to the test database, running migrations once.
pub async fn test_db() -> Option<DatabaseConnection> {
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    MIGRATED
        .get_or_init(|| async {
            let db = Database::connect(&url)
                .await
                .expect("Failed to connect to database");
            Migrator::up(&db, None)
                .await
                .expect("Failed to run migrations");
        })
        .await;

    Some(
        Database::connect(&url)
            .await
            .expect("Failed to connect to database"),
    )
}

/// Yields the test database connection or returns from the test.
macro_rules! require_db {
    () => {
        match common::test_db().await {
            Some(db) => db,
            None => return,
        }
    };
}

/// Creates an account with a random name and the given opening balance.
pub async fn create_account(db: &DatabaseConnection, opening_balance: i64) -> AccountId {
    let name: String = Name().fake();
    let account = AccountRepository::new(db.clone())
        .create(CreateAccount {
            name,
            opening_balance,
        })
        .await
        .expect("Failed to create account");
    AccountId::from_i64(account.account_id)
}

/// Counts the transaction rows owned by an account.
pub async fn transaction_count(db: &DatabaseConnection, account_id: AccountId) -> u64 {
    transactions::Entity::find()
        .filter(transactions::Column::AccountId.eq(account_id.into_inner()))
        .count(db)
        .await
        .expect("Failed to count transactions")
}
