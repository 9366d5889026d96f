//! Storage layer
//!
//! One trait pair fronts every persistent table:
//!
//! - [`BankStore`]: point lookups, listings and single-row inserts
//! - [`AtomicUnit`]: a transaction scope for multi-row writes
//!
//! Two engines implement it: [`PgStore`] (PostgreSQL via sqlx) and
//! [`MemoryStore`] (in-process, row locks on tokio mutexes). The engine is
//! picked at startup and injected everywhere as `Arc<dyn BankStore>`.
//!
//! # Atomic unit contract
//!
//! 1. `lock_accounts` takes exclusive row locks in ascending id order and
//!    returns the rows as they are under the lock
//! 2. writes are invisible to other units until `commit`
//! 3. `rollback`, or dropping the unit without `commit`, discards every write

pub mod memory;
pub mod postgres;

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::account::models::{Account, NewAccount, NewUser, User};
use crate::core_types::{AccountId, AccountNumber, MinorUnits, UserId};
use crate::ledger::{NewTransaction, NewTransfer, Transaction, Transfer};

/// Constraint names shared by both engines
pub mod constraints {
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const ACCOUNTS_NUMBER: &str = "accounts_account_number_key";
    pub const ACCOUNTS_BALANCE: &str = "accounts_balance_non_negative";
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint violated; carries the constraint name
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("data integrity violation: {0}")]
    Integrity(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Conflict(c) if c == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::Conflict(constraint);
            }
            if db_err.is_check_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::Integrity(constraint);
            }
        }
        StoreError::Database(e)
    }
}

/// Persistent tables: users, accounts, transactions, transfers
#[async_trait]
pub trait BankStore: Send + Sync {
    /// Engine name for logging
    fn name(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), StoreError>;

    // === Users ===

    /// Fails with `Conflict(users_email_key)` on a duplicate email
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// All users ordered by id
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    // === Accounts ===

    /// Inserts with balance 0 and active status. Fails with
    /// `Conflict(accounts_account_number_key)` if the number is taken.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Whether any account, active or not, uses this number
    async fn account_number_exists(&self, number: &AccountNumber) -> Result<bool, StoreError>;

    /// Active accounts carrying this number. At most one in a healthy store;
    /// the list is returned so callers can detect a broken invariant.
    async fn active_accounts_by_number(
        &self,
        number: &AccountNumber,
    ) -> Result<Vec<Account>, StoreError>;

    /// Accounts of one owner ordered by id
    async fn accounts_by_owner(&self, owner: UserId) -> Result<Vec<Account>, StoreError>;

    /// Returns the updated row, `None` if the id does not exist
    async fn set_account_active(
        &self,
        id: AccountId,
        active: bool,
    ) -> Result<Option<Account>, StoreError>;

    // === Ledger ===

    /// Entries of one account, date descending then id descending
    async fn transactions_by_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Transfers where the number is sender or receiver, newest first
    async fn transfers_by_account_number(
        &self,
        number: &AccountNumber,
    ) -> Result<Vec<Transfer>, StoreError>;

    // === Atomic unit ===

    async fn begin(&self) -> Result<Box<dyn AtomicUnit>, StoreError>;
}

/// Transaction scope for multi-row writes
#[async_trait]
pub trait AtomicUnit: Send {
    /// Lock rows in ascending id order and return them (sorted by id).
    /// Unknown ids are skipped. Call at most once per unit.
    async fn lock_accounts(&mut self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError>;

    /// Add `delta` to a locked account's balance and return the new balance.
    /// A result below zero is an integrity error.
    async fn adjust_balance(
        &mut self,
        id: AccountId,
        delta: MinorUnits,
    ) -> Result<MinorUnits, StoreError>;

    async fn insert_transfer(&mut self, transfer: NewTransfer) -> Result<Transfer, StoreError>;

    async fn insert_transaction(
        &mut self,
        transaction: NewTransaction,
    ) -> Result<Transaction, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
