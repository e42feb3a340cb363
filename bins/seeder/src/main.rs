//! Database seeder for Saku development and testing.
//!
//! Seeds demo accounts with opening balances, a few transaction categories
//! and some history, then prints a development JWT per account so the
//! protected routes can be exercised with curl.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;

use saku_core::ledger::{EntryCommand, TransferCommand};
use saku_db::repositories::{
    AccountRepository, CategoryRepository, CreateAccount, LedgerRepository,
};
use saku_shared::types::{AccountId, CategoryId};
use saku_shared::{AppConfig, JwtService};

/// Demo accounts and their opening balances in minor units.
const DEMO_ACCOUNTS: [(&str, i64); 3] = [("Alice", 100_000), ("Bob", 25_000), ("Carol", 0)];

const DEMO_CATEGORIES: [&str; 3] = ["Groceries", "Rent", "Salary"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    println!("Connecting to database...");
    let db = saku_db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    let accounts = AccountRepository::new(db.clone());
    let categories = CategoryRepository::new(db.clone());
    let ledger = LedgerRepository::from_config(db, &config.ledger);

    let existing = accounts.list().await?;
    let account_ids: Vec<AccountId> = if existing.is_empty() {
        println!("Seeding accounts...");
        let mut ids = Vec::with_capacity(DEMO_ACCOUNTS.len());
        for (name, opening_balance) in DEMO_ACCOUNTS {
            let account = accounts
                .create(CreateAccount {
                    name: name.to_string(),
                    opening_balance,
                })
                .await?;
            println!("  {name}: account {} (balance {opening_balance})", account.account_id);
            ids.push(AccountId::from_i64(account.account_id));
        }

        println!("Seeding transaction categories...");
        let mut category_ids = Vec::with_capacity(DEMO_CATEGORIES.len());
        for name in DEMO_CATEGORIES {
            let category = categories.create(name).await?;
            category_ids.push(CategoryId::from_i64(category.transaction_category_id));
        }

        println!("Seeding history...");
        seed_history(&ledger, &ids, &category_ids).await?;
        ids
    } else {
        println!("  Accounts already exist, skipping...");
        existing
            .iter()
            .map(|account| AccountId::from_i64(account.account_id))
            .collect()
    };

    println!("Development tokens:");
    let jwt = JwtService::new(config.jwt.jwt_config());
    for account_id in account_ids {
        let token = jwt.generate_access_token(account_id)?;
        println!("  account {account_id}: {token}");
    }

    println!("Seeding complete!");
    Ok(())
}

async fn seed_history(
    ledger: &LedgerRepository,
    accounts: &[AccountId],
    categories: &[CategoryId],
) -> anyhow::Result<()> {
    let [alice, bob, carol] = accounts else {
        anyhow::bail!("expected {} demo accounts", DEMO_ACCOUNTS.len());
    };
    let [groceries, _rent, salary] = categories else {
        anyhow::bail!("expected {} demo categories", DEMO_CATEGORIES.len());
    };

    ledger
        .record_entry(EntryCommand {
            account_id: *bob,
            amount: 300_000,
            category_id: Some(*salary),
            transaction_date: None,
            idempotency_key: None,
        })
        .await?;
    ledger
        .record_entry(EntryCommand {
            account_id: *alice,
            amount: -4_250,
            category_id: Some(*groceries),
            transaction_date: None,
            idempotency_key: None,
        })
        .await?;

    for (source, target, amount) in [(*alice, *carol, 10_000), (*bob, *carol, 5_000)] {
        ledger
            .transfer(TransferCommand {
                source_account_id: source,
                target_account_id: target,
                amount,
                idempotency_key: None,
            })
            .await?;
    }
    Ok(())
}
