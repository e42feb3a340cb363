//! Initial ledger schema: accounts, transaction categories and transactions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(LEDGER_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS transactions CASCADE;
             DROP TABLE IF EXISTS transaction_categories CASCADE;
             DROP TABLE IF EXISTS accounts CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const LEDGER_SQL: &str = r"
-- ============================================================
-- ACCOUNTS
-- balance is denormalized: it always equals SUM(transactions.amount)
-- ============================================================
CREATE TABLE accounts (
    account_id BIGSERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    balance BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_account_name_not_blank CHECK (length(btrim(name)) > 0),
    CONSTRAINT chk_account_balance_non_negative CHECK (balance >= 0)
);

-- ============================================================
-- TRANSACTION CATEGORIES
-- ============================================================
CREATE TABLE transaction_categories (
    transaction_category_id BIGSERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_category_name_not_blank CHECK (length(btrim(name)) > 0)
);

-- ============================================================
-- TRANSACTIONS (append-only ledger lines)
-- ============================================================
CREATE TABLE transactions (
    transaction_id BIGSERIAL PRIMARY KEY,
    account_id BIGINT NOT NULL REFERENCES accounts(account_id) ON DELETE RESTRICT,
    transaction_category_id BIGINT REFERENCES transaction_categories(transaction_category_id) ON DELETE RESTRICT,
    from_account_id BIGINT REFERENCES accounts(account_id) ON DELETE RESTRICT,
    to_account_id BIGINT REFERENCES accounts(account_id) ON DELETE RESTRICT,
    related_transaction_id BIGINT REFERENCES transactions(transaction_id) ON DELETE RESTRICT,
    kind VARCHAR(16) NOT NULL,
    amount BIGINT NOT NULL,
    transaction_date TIMESTAMPTZ NOT NULL DEFAULT now(),
    idempotency_key VARCHAR(128),
    CONSTRAINT chk_transaction_amount_non_zero CHECK (amount <> 0),
    CONSTRAINT chk_transaction_kind CHECK (kind IN ('top_up', 'transfer', 'entry'))
);

-- History: newest first per account
CREATE INDEX idx_transactions_account_recent
    ON transactions(account_id, transaction_date DESC, transaction_id DESC);

-- Replay protection per account
CREATE UNIQUE INDEX idx_transactions_idempotency
    ON transactions(account_id, idempotency_key)
    WHERE idempotency_key IS NOT NULL;

CREATE INDEX idx_transactions_category
    ON transactions(transaction_category_id)
    WHERE transaction_category_id IS NOT NULL;
";
