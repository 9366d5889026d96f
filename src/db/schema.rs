//! PostgreSQL schema
//!
//! Idempotent: every statement is `IF NOT EXISTS`, so it runs on each startup.
//! Constraint names must match [`crate::store::constraints`].

use anyhow::{Context, Result};
use sqlx::PgPool;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            BIGSERIAL PRIMARY KEY,
    name          VARCHAR(100) NOT NULL,
    email         VARCHAR(255) NOT NULL,
    age           INTEGER,
    phone_number  VARCHAR(32),
    password_hash VARCHAR(255) NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT users_email_key UNIQUE (email)
)
"#;

const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id             BIGSERIAL PRIMARY KEY,
    user_id        BIGINT NOT NULL REFERENCES users(id),
    account_number VARCHAR(7) NOT NULL,
    currency       CHAR(3) NOT NULL,
    balance        BIGINT NOT NULL DEFAULT 0,
    spending_limit BIGINT,
    status         BOOLEAN NOT NULL DEFAULT TRUE,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT accounts_account_number_key UNIQUE (account_number),
    CONSTRAINT accounts_balance_non_negative CHECK (balance >= 0)
)
"#;

const CREATE_TRANSFERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transfers (
    id            BIGSERIAL PRIMARY KEY,
    amount        BIGINT NOT NULL CHECK (amount > 0),
    sender        VARCHAR(7) NOT NULL,
    receiver      VARCHAR(7) NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    transfer_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id               BIGSERIAL PRIMARY KEY,
    account_id       BIGINT NOT NULL REFERENCES accounts(id),
    amount           BIGINT NOT NULL CHECK (amount > 0),
    type             VARCHAR(16) NOT NULL,
    transaction_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    description      TEXT NOT NULL DEFAULT '',
    transfer_id      BIGINT REFERENCES transfers(id)
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_accounts_user_id ON accounts (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions (account_id, transaction_date DESC)",
    "CREATE INDEX IF NOT EXISTS idx_transfers_sender ON transfers (sender, transfer_time DESC)",
    "CREATE INDEX IF NOT EXISTS idx_transfers_receiver ON transfers (receiver, transfer_time DESC)",
];

/// Create tables and indexes if missing
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing PostgreSQL schema...");

    for (name, ddl) in [
        ("users", CREATE_USERS_TABLE),
        ("accounts", CREATE_ACCOUNTS_TABLE),
        ("transfers", CREATE_TRANSFERS_TABLE),
        ("transactions", CREATE_TRANSACTIONS_TABLE),
    ] {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {} table", name))?;
    }

    for ddl in CREATE_INDEXES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create index: {}", ddl))?;
    }

    tracing::info!("PostgreSQL schema ready");
    Ok(())
}
