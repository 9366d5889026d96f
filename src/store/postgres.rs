//! PostgreSQL store
//!
//! Tables are created by [`crate::db::schema::init_schema`]. Atomic units are
//! sqlx transactions; row locks are `SELECT ... FOR UPDATE`, one row at a time
//! in ascending id order so two units touching the same pair of accounts can
//! never wait on each other in a cycle.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};

use super::{AtomicUnit, BankStore, StoreError};
use crate::account::models::{Account, NewAccount, NewUser, User};
use crate::core_types::{AccountId, AccountNumber, MinorUnits, UserId};
use crate::ledger::{NewTransaction, NewTransfer, Transaction, Transfer};

const ACCOUNT_COLUMNS: &str =
    "id, user_id, account_number, currency, balance, spending_limit, status, created_at";
const USER_COLUMNS: &str = "id, name, email, age, phone_number, password_hash, created_at";
const TRANSACTION_COLUMNS: &str =
    "id, account_id, amount, type, transaction_date, description, transfer_id";
const TRANSFER_COLUMNS: &str = "id, amount, sender, receiver, description, transfer_time";

/// PostgreSQL-backed [`BankStore`]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BankStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (name, email, age, phone_number, password_hash)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.age)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;

        user_from_row(&row)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO accounts (user_id, account_number, currency, balance, spending_limit, status)
             VALUES ($1, $2, $3, 0, $4, TRUE)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account.user_id)
        .bind(account.account_number.as_str())
        .bind(&account.currency)
        .bind(account.limit)
        .fetch_one(&self.pool)
        .await?;

        account_from_row(&row)
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn account_number_exists(&self, number: &AccountNumber) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE account_number = $1)",
        )
        .bind(number.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn active_accounts_by_number(
        &self,
        number: &AccountNumber,
    ) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE account_number = $1 AND status = TRUE
             ORDER BY id"
        ))
        .bind(number.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(account_from_row).collect()
    }

    async fn accounts_by_owner(&self, owner: UserId) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(account_from_row).collect()
    }

    async fn set_account_active(
        &self,
        id: AccountId,
        active: bool,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE accounts SET status = $1 WHERE id = $2 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn transactions_by_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE account_id = $1
             ORDER BY transaction_date DESC, id DESC"
        ))
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    async fn transfers_by_account_number(
        &self,
        number: &AccountNumber,
    ) -> Result<Vec<Transfer>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers
             WHERE sender = $1 OR receiver = $1
             ORDER BY transfer_time DESC, id DESC"
        ))
        .bind(number.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transfer_from_row).collect()
    }

    async fn begin(&self) -> Result<Box<dyn AtomicUnit>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx, locked: false }))
    }
}

/// sqlx transaction; dropping it without commit rolls back
struct PgUnit {
    tx: sqlx::Transaction<'static, Postgres>,
    locked: bool,
}

#[async_trait]
impl AtomicUnit for PgUnit {
    async fn lock_accounts(&mut self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError> {
        if self.locked {
            return Err(StoreError::Integrity(
                "lock_accounts called twice in one unit".to_string(),
            ));
        }
        self.locked = true;

        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut accounts = Vec::with_capacity(ordered.len());
        for id in ordered {
            let row = sqlx::query(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
            ))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

            if let Some(row) = row {
                accounts.push(account_from_row(&row)?);
            }
        }
        Ok(accounts)
    }

    async fn adjust_balance(
        &mut self,
        id: AccountId,
        delta: MinorUnits,
    ) -> Result<MinorUnits, StoreError> {
        let balance: Option<i64> = sqlx::query_scalar(
            "UPDATE accounts SET balance = balance + $1 WHERE id = $2 RETURNING balance",
        )
        .bind(delta)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        balance.ok_or_else(|| StoreError::Integrity(format!("account {} vanished", id)))
    }

    async fn insert_transfer(&mut self, transfer: NewTransfer) -> Result<Transfer, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO transfers (amount, sender, receiver, description, transfer_time)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TRANSFER_COLUMNS}"
        ))
        .bind(transfer.amount)
        .bind(transfer.sender.as_str())
        .bind(transfer.receiver.as_str())
        .bind(&transfer.description)
        .bind(transfer.transfer_time)
        .fetch_one(&mut *self.tx)
        .await?;

        transfer_from_row(&row)
    }

    async fn insert_transaction(
        &mut self,
        transaction: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO transactions (account_id, amount, type, transaction_date, description, transfer_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(transaction.account_id)
        .bind(transaction.amount)
        .bind(transaction.kind.as_str())
        .bind(transaction.transaction_date)
        .bind(&transaction.description)
        .bind(transaction.transfer_id)
        .fetch_one(&mut *self.tx)
        .await?;

        transaction_from_row(&row)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(|e| {
        tracing::error!("Failed to read column '{}': {}", name, e);
        StoreError::Database(e)
    })
}

fn account_number(raw: String) -> Result<AccountNumber, StoreError> {
    raw.parse()
        .map_err(|e| StoreError::Integrity(format!("stored account number: {}", e)))
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: column(row, "id")?,
        name: column(row, "name")?,
        email: column(row, "email")?,
        age: column(row, "age")?,
        phone_number: column(row, "phone_number")?,
        password_hash: column(row, "password_hash")?,
        created_at: column(row, "created_at")?,
    })
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    Ok(Account {
        id: column(row, "id")?,
        user_id: column(row, "user_id")?,
        account_number: account_number(column(row, "account_number")?)?,
        currency: column(row, "currency")?,
        balance: column(row, "balance")?,
        limit: column(row, "spending_limit")?,
        active: column(row, "status")?,
        created_at: column(row, "created_at")?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, StoreError> {
    let kind: String = column(row, "type")?;
    Ok(Transaction {
        id: column(row, "id")?,
        account_id: column(row, "account_id")?,
        amount: column(row, "amount")?,
        kind: kind.parse().map_err(StoreError::Integrity)?,
        transaction_date: column(row, "transaction_date")?,
        description: column(row, "description")?,
        transfer_id: column(row, "transfer_id")?,
    })
}

fn transfer_from_row(row: &PgRow) -> Result<Transfer, StoreError> {
    Ok(Transfer {
        id: column(row, "id")?,
        amount: column(row, "amount")?,
        sender: account_number(column(row, "sender")?)?,
        receiver: account_number(column(row, "receiver")?)?,
        description: column(row, "description")?,
        transfer_time: column(row, "transfer_time")?,
    })
}
