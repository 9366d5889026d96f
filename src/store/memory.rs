//! In-process store
//!
//! Stands in for PostgreSQL in local runs (`storage.backend: memory`) and in
//! tests. Each account row carries its own `tokio::sync::Mutex`, which plays
//! the role of the row lock: an [`AtomicUnit`] holds the guards of the rows it
//! locked until it commits or is dropped. Writes are staged inside the unit
//! and applied at commit, so an abandoned unit leaves nothing behind.
//!
//! Plain reads never touch the row lock. They clone the last committed
//! version of the row, the way PostgreSQL readers see the committed tuple
//! while another transaction holds `FOR UPDATE` on it.
//!
//! [`FailPoint`]s let tests make one store operation fail on demand.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use super::{AtomicUnit, BankStore, StoreError, constraints};
use crate::account::models::{Account, NewAccount, NewUser, User};
use crate::core_types::{AccountId, AccountNumber, MinorUnits, UserId};
use crate::ledger::{NewTransaction, NewTransfer, Transaction, Transfer};

/// Store operation that can be made to fail once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    AdjustBalance,
    InsertTransfer,
    InsertTransaction,
    Commit,
}

struct Row {
    /// Held by a unit from `lock_accounts` until commit or drop
    lock: Arc<RowLock<()>>,
    committed: RwLock<Account>,
}

impl Row {
    fn new(account: Account) -> Self {
        Self {
            lock: Arc::new(RowLock::new(())),
            committed: RwLock::new(account),
        }
    }

    fn snapshot(&self) -> Account {
        self.committed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn update(&self, apply: impl FnOnce(&mut Account)) -> Account {
        let mut account = self.committed.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut *account);
        account.clone()
    }
}

#[derive(Default)]
struct AccountTable {
    rows: BTreeMap<AccountId, Arc<Row>>,
    by_number: BTreeMap<AccountNumber, AccountId>,
}

#[derive(Default)]
struct Inner {
    users: RwLock<BTreeMap<UserId, User>>,
    accounts: RwLock<AccountTable>,
    transactions: Mutex<Vec<Transaction>>,
    transfers: Mutex<Vec<Transfer>>,
    user_seq: AtomicI64,
    account_seq: AtomicI64,
    transaction_seq: AtomicI64,
    transfer_seq: AtomicI64,
    faults: Mutex<Vec<FailPoint>>,
}

impl Inner {
    /// Consume an armed fault for `point`, if any
    fn trip(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pos) = faults.iter().position(|p| *p == point) {
            faults.remove(pos);
            tracing::debug!(?point, "memory store: injected failure");
            return Err(StoreError::Unavailable(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }

    fn row(&self, id: AccountId) -> Option<Arc<Row>> {
        self.accounts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .rows
            .get(&id)
            .cloned()
    }
}

fn next(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

/// In-memory [`BankStore`]; cheap to clone, clones share state
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call at `point` fail with `StoreError::Unavailable`
    pub fn inject_fault(&self, point: FailPoint) {
        self.inner
            .faults
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(point);
    }

    /// Number of rows in `transfers`
    pub fn transfer_count(&self) -> usize {
        self.inner
            .transfers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Number of rows in `transactions`
    pub fn transaction_count(&self) -> usize {
        self.inner
            .transactions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl BankStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.inner.users.write().unwrap_or_else(|e| e.into_inner());
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(constraints::USERS_EMAIL.to_string()));
        }
        let record = User {
            id: next(&self.inner.user_seq),
            name: user.name,
            email: user.email,
            age: user.age,
            phone_number: user.phone_number,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let users = self.inner.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.inner.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = self.inner.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users.values().cloned().collect())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut table = self.inner.accounts.write().unwrap_or_else(|e| e.into_inner());
        if table.by_number.contains_key(&account.account_number) {
            return Err(StoreError::Conflict(constraints::ACCOUNTS_NUMBER.to_string()));
        }
        let record = Account {
            id: next(&self.inner.account_seq),
            user_id: account.user_id,
            account_number: account.account_number,
            currency: account.currency,
            balance: 0,
            limit: account.limit,
            active: true,
            created_at: Utc::now(),
        };
        table
            .by_number
            .insert(record.account_number.clone(), record.id);
        table
            .rows
            .insert(record.id, Arc::new(Row::new(record.clone())));
        Ok(record)
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.row(id).map(|row| row.snapshot()))
    }

    async fn account_number_exists(&self, number: &AccountNumber) -> Result<bool, StoreError> {
        let table = self.inner.accounts.read().unwrap_or_else(|e| e.into_inner());
        Ok(table.by_number.contains_key(number))
    }

    async fn active_accounts_by_number(
        &self,
        number: &AccountNumber,
    ) -> Result<Vec<Account>, StoreError> {
        let id = {
            let table = self.inner.accounts.read().unwrap_or_else(|e| e.into_inner());
            table.by_number.get(number).copied()
        };
        let Some(id) = id else {
            return Ok(Vec::new());
        };
        let account = self.account_by_id(id).await?;
        Ok(account.into_iter().filter(|a| a.active).collect())
    }

    async fn accounts_by_owner(&self, owner: UserId) -> Result<Vec<Account>, StoreError> {
        let table = self.inner.accounts.read().unwrap_or_else(|e| e.into_inner());
        Ok(table
            .rows
            .values()
            .map(|row| row.snapshot())
            .filter(|account| account.user_id == owner)
            .collect())
    }

    async fn set_account_active(
        &self,
        id: AccountId,
        active: bool,
    ) -> Result<Option<Account>, StoreError> {
        match self.inner.row(id) {
            Some(row) => {
                // Writers queue behind a unit holding the row, like UPDATE
                let _guard = row.lock.lock().await;
                Ok(Some(row.update(|account| account.active = active)))
            }
            None => Ok(None),
        }
    }

    async fn transactions_by_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        let log = self
            .inner
            .transactions
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<Transaction> = log
            .iter()
            .filter(|t| t.account_id == account)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    async fn transfers_by_account_number(
        &self,
        number: &AccountNumber,
    ) -> Result<Vec<Transfer>, StoreError> {
        let log = self.inner.transfers.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<Transfer> = log
            .iter()
            .filter(|t| &t.sender == number || &t.receiver == number)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.transfer_time.cmp(&a.transfer_time).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn begin(&self) -> Result<Box<dyn AtomicUnit>, StoreError> {
        self.inner.trip(FailPoint::Begin)?;
        Ok(Box::new(MemoryUnit {
            inner: self.inner.clone(),
            locked: BTreeMap::new(),
            lock_taken: false,
            balances: BTreeMap::new(),
            transfers: Vec::new(),
            transactions: Vec::new(),
        }))
    }
}

/// Staged writes plus the row guards that make them exclusive
struct MemoryUnit {
    inner: Arc<Inner>,
    locked: BTreeMap<AccountId, (Arc<Row>, OwnedMutexGuard<()>)>,
    lock_taken: bool,
    /// New balance per locked account, applied at commit
    balances: BTreeMap<AccountId, MinorUnits>,
    transfers: Vec<Transfer>,
    transactions: Vec<Transaction>,
}

#[async_trait]
impl AtomicUnit for MemoryUnit {
    async fn lock_accounts(&mut self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError> {
        if self.lock_taken {
            return Err(StoreError::Integrity(
                "lock_accounts called twice in one unit".to_string(),
            ));
        }
        self.lock_taken = true;

        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut accounts = Vec::with_capacity(ordered.len());
        for id in ordered {
            let Some(row) = self.inner.row(id) else {
                continue;
            };
            let guard = row.lock.clone().lock_owned().await;
            // Committed state cannot change while the guard is held
            accounts.push(row.snapshot());
            self.locked.insert(id, (row, guard));
            // Let other units run between row locks
            tokio::task::yield_now().await;
        }
        Ok(accounts)
    }

    async fn adjust_balance(
        &mut self,
        id: AccountId,
        delta: MinorUnits,
    ) -> Result<MinorUnits, StoreError> {
        self.inner.trip(FailPoint::AdjustBalance)?;
        let (row, _) = self
            .locked
            .get(&id)
            .ok_or_else(|| StoreError::Integrity(format!("account {} not locked", id)))?;
        let current = match self.balances.get(&id) {
            Some(staged) => *staged,
            None => row.snapshot().balance,
        };
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::Integrity(format!("balance overflow on account {}", id)))?;
        if updated < 0 {
            return Err(StoreError::Integrity(constraints::ACCOUNTS_BALANCE.to_string()));
        }
        self.balances.insert(id, updated);
        Ok(updated)
    }

    async fn insert_transfer(&mut self, transfer: NewTransfer) -> Result<Transfer, StoreError> {
        self.inner.trip(FailPoint::InsertTransfer)?;
        let record = Transfer {
            id: next(&self.inner.transfer_seq),
            amount: transfer.amount,
            sender: transfer.sender,
            receiver: transfer.receiver,
            description: transfer.description,
            transfer_time: transfer.transfer_time,
        };
        self.transfers.push(record.clone());
        Ok(record)
    }

    async fn insert_transaction(
        &mut self,
        transaction: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        self.inner.trip(FailPoint::InsertTransaction)?;
        if !self.locked.contains_key(&transaction.account_id)
            && self.inner.row(transaction.account_id).is_none()
        {
            return Err(StoreError::Integrity(format!(
                "transaction references unknown account {}",
                transaction.account_id
            )));
        }
        let record = Transaction {
            id: next(&self.inner.transaction_seq),
            account_id: transaction.account_id,
            amount: transaction.amount,
            kind: transaction.kind,
            transaction_date: transaction.transaction_date,
            description: transaction.description,
            transfer_id: transaction.transfer_id,
        };
        self.transactions.push(record.clone());
        Ok(record)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.inner.trip(FailPoint::Commit)?;

        // Logs first, so by the time a new balance is visible its ledger
        // rows are too.
        self.inner
            .transfers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .append(&mut self.transfers);
        self.inner
            .transactions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .append(&mut self.transactions);

        for (id, balance) in std::mem::take(&mut self.balances) {
            if let Some((row, _)) = self.locked.get(&id) {
                row.update(|account| account.balance = balance);
            }
        }
        // guards released on drop
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionKind;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "test".to_string(),
            email: email.to_string(),
            age: None,
            phone_number: None,
            password_hash: "hash".to_string(),
        }
    }

    async fn seed(store: &MemoryStore, number: &str, balance: i64) -> Account {
        let owner = store
            .insert_user(new_user(&format!("{}@example.com", number)))
            .await
            .unwrap();
        let account = store
            .insert_account(NewAccount {
                user_id: owner.id,
                account_number: number.parse().unwrap(),
                currency: "MNT".to_string(),
                limit: None,
            })
            .await
            .unwrap();
        let mut unit = store.begin().await.unwrap();
        unit.lock_accounts(&[account.id]).await.unwrap();
        unit.adjust_balance(account.id, balance).await.unwrap();
        unit.commit().await.unwrap();
        store.account_by_id(account.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_conflict() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@example.com")).await.unwrap();
        let err = store.insert_user(new_user("a@example.com")).await.unwrap_err();
        assert!(err.is_conflict_on(constraints::USERS_EMAIL));
    }

    #[tokio::test]
    async fn test_duplicate_account_number_conflict() {
        let store = MemoryStore::new();
        seed(&store, "1111111", 0).await;
        let err = store
            .insert_account(NewAccount {
                user_id: 1,
                account_number: "1111111".parse().unwrap(),
                currency: "MNT".to_string(),
                limit: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_conflict_on(constraints::ACCOUNTS_NUMBER));
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let store = MemoryStore::new();
        let a = seed(&store, "1111111", 100).await;

        let mut unit = store.begin().await.unwrap();
        let locked = unit.lock_accounts(&[a.id]).await.unwrap();
        assert_eq!(locked[0].balance, 100);
        assert_eq!(unit.adjust_balance(a.id, -30).await.unwrap(), 70);
        assert_eq!(unit.adjust_balance(a.id, -20).await.unwrap(), 50);
        unit.insert_transaction(NewTransaction {
            account_id: a.id,
            amount: 50,
            kind: TransactionKind::TransferOut,
            transaction_date: Utc::now(),
            description: "x".to_string(),
            transfer_id: None,
        })
        .await
        .unwrap();
        unit.commit().await.unwrap();

        assert_eq!(store.account_by_id(a.id).await.unwrap().unwrap().balance, 50);
        assert_eq!(store.transactions_by_account(a.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_unit_discards_writes() {
        let store = MemoryStore::new();
        let a = seed(&store, "1111111", 100).await;

        {
            let mut unit = store.begin().await.unwrap();
            unit.lock_accounts(&[a.id]).await.unwrap();
            unit.adjust_balance(a.id, -100).await.unwrap();
        }

        assert_eq!(store.account_by_id(a.id).await.unwrap().unwrap().balance, 100);
        // Row lock was released by the drop
        let mut unit = store.begin().await.unwrap();
        assert_eq!(unit.lock_accounts(&[a.id]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_negative_balance_is_integrity_error() {
        let store = MemoryStore::new();
        let a = seed(&store, "1111111", 10).await;

        let mut unit = store.begin().await.unwrap();
        unit.lock_accounts(&[a.id]).await.unwrap();
        let err = unit.adjust_balance(a.id, -11).await.unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)));
    }

    #[tokio::test]
    async fn test_adjust_requires_lock() {
        let store = MemoryStore::new();
        let a = seed(&store, "1111111", 10).await;

        let mut unit = store.begin().await.unwrap();
        let err = unit.adjust_balance(a.id, 5).await.unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)));
    }

    #[tokio::test]
    async fn test_lock_order_is_ascending_and_skips_unknown() {
        let store = MemoryStore::new();
        let a = seed(&store, "1111111", 0).await;
        let b = seed(&store, "2222222", 0).await;

        let mut unit = store.begin().await.unwrap();
        let locked = unit.lock_accounts(&[b.id, 999, a.id, b.id]).await.unwrap();
        let ids: Vec<_> = locked.iter().map(|acc| acc.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_fault_is_one_shot() {
        let store = MemoryStore::new();
        store.inject_fault(FailPoint::Begin);
        assert!(matches!(store.begin().await, Err(StoreError::Unavailable(_))));
        assert!(store.begin().await.is_ok());
    }

    #[tokio::test]
    async fn test_reads_do_not_wait_on_locked_rows() {
        use std::time::Duration;
        use tokio::time::timeout;

        let store = MemoryStore::new();
        let a = seed(&store, "1111111", 100).await;
        let b = seed(&store, "2222222", 0).await;

        let mut unit = store.begin().await.unwrap();
        unit.lock_accounts(&[b.id]).await.unwrap();
        unit.adjust_balance(b.id, 40).await.unwrap();

        let wait = Duration::from_millis(500);
        let owned = timeout(wait, store.accounts_by_owner(a.user_id))
            .await
            .expect("owner listing waited on another owner's row");
        assert_eq!(owned.unwrap().len(), 1);

        // The locked row itself reads as its last committed version
        let seen = timeout(wait, store.active_accounts_by_number(&b.account_number))
            .await
            .expect("number lookup waited on a locked row")
            .unwrap();
        assert_eq!(seen[0].balance, 0);
        let seen = timeout(wait, store.account_by_id(b.id))
            .await
            .expect("id lookup waited on a locked row")
            .unwrap()
            .unwrap();
        assert_eq!(seen.balance, 0);

        unit.commit().await.unwrap();
        assert_eq!(store.account_by_id(b.id).await.unwrap().unwrap().balance, 40);
    }

    #[tokio::test]
    async fn test_status_change_waits_for_unit() {
        use std::time::Duration;
        use tokio::time::timeout;

        let store = MemoryStore::new();
        let a = seed(&store, "1111111", 0).await;

        let mut unit = store.begin().await.unwrap();
        unit.lock_accounts(&[a.id]).await.unwrap();
        let blocked = timeout(Duration::from_millis(50), store.set_account_active(a.id, false)).await;
        assert!(blocked.is_err());

        unit.rollback().await.unwrap();
        let updated = store.set_account_active(a.id, false).await.unwrap().unwrap();
        assert!(!updated.active);
    }

    #[tokio::test]
    async fn test_inactive_accounts_hidden_from_number_lookup() {
        let store = MemoryStore::new();
        let a = seed(&store, "1111111", 0).await;
        let number = a.account_number.clone();

        assert_eq!(store.active_accounts_by_number(&number).await.unwrap().len(), 1);
        store.set_account_active(a.id, false).await.unwrap();
        assert!(store.active_accounts_by_number(&number).await.unwrap().is_empty());
        assert!(store.account_number_exists(&number).await.unwrap());
    }
}
