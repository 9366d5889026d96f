//! Account lifecycle
//!
//! Creation with account number issuance, owner-scoped lookups, status
//! changes, ledger history and the development-only deposit.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use super::error::AccountError;
use super::models::{Account, NewAccount};
use crate::config::AccountsConfig;
use crate::core_types::{AccountId, AccountNumber, MinorUnits, UserId};
use crate::ledger::{NewTransaction, Transaction, TransactionKind};
use crate::money::{self, AmountInput};
use crate::store::{AtomicUnit, BankStore, StoreError, constraints};

/// Source of candidate account numbers
pub trait AccountNumberGenerator: Send + Sync {
    /// Next candidate; values outside `1_000_000..=9_999_999` count as a
    /// failed attempt
    fn draw(&self) -> u32;
}

/// Uniform draws over the 7-digit range
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomAccountNumbers;

impl AccountNumberGenerator for RandomAccountNumbers {
    fn draw(&self) -> u32 {
        rand::thread_rng().gen_range(1_000_000..=9_999_999)
    }
}

pub struct AccountService {
    store: Arc<dyn BankStore>,
    numbers: Arc<dyn AccountNumberGenerator>,
    config: AccountsConfig,
}

impl AccountService {
    pub fn new(store: Arc<dyn BankStore>, config: AccountsConfig) -> Self {
        Self::with_generator(store, config, Arc::new(RandomAccountNumbers))
    }

    pub fn with_generator(
        store: Arc<dyn BankStore>,
        config: AccountsConfig,
        numbers: Arc<dyn AccountNumberGenerator>,
    ) -> Self {
        Self {
            store,
            numbers,
            config,
        }
    }

    /// Open a new account with balance 0.
    ///
    /// A drawn number already in use (pre-check or unique constraint) is
    /// redrawn, at most `accounts.number_attempts` draws in total.
    pub async fn create_account(
        &self,
        owner: UserId,
        currency: Option<&str>,
        limit: Option<MinorUnits>,
    ) -> Result<Account, AccountError> {
        let requested = currency.unwrap_or(&self.config.default_currency);
        let currency = money::normalize_currency(requested)
            .ok_or_else(|| AccountError::InvalidCurrency(requested.to_string()))?;
        if limit.is_some_and(|l| l < 0) {
            return Err(AccountError::InvalidLimit);
        }

        let attempts = self.config.number_attempts.max(1);
        for attempt in 1..=attempts {
            let draw = self.numbers.draw();
            let Some(number) = AccountNumber::from_draw(draw) else {
                tracing::warn!(draw, attempt, "Account number draw out of range");
                continue;
            };

            if self.store.account_number_exists(&number).await? {
                tracing::debug!(%number, attempt, "Account number taken, redrawing");
                continue;
            }

            let new_account = NewAccount {
                user_id: owner,
                account_number: number.clone(),
                currency: currency.clone(),
                limit,
            };
            match self.store.insert_account(new_account).await {
                Ok(account) => {
                    tracing::info!(
                        user_id = owner,
                        account_id = account.id,
                        account_number = %account.account_number,
                        currency = %account.currency,
                        "Account created"
                    );
                    return Ok(account);
                }
                Err(e) if e.is_conflict_on(constraints::ACCOUNTS_NUMBER) => {
                    // Lost a race with a concurrent insert of the same number
                    tracing::debug!(%number, attempt, "Account number conflict on insert");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(user_id = owner, attempts, "Account number space exhausted");
        Err(AccountError::NumberSpaceExhausted(attempts))
    }

    /// Accounts of `owner`, ordered by id
    pub async fn list_accounts(&self, owner: UserId) -> Result<Vec<Account>, AccountError> {
        Ok(self.store.accounts_by_owner(owner).await?)
    }

    /// One account of `owner`. Accounts of other users are `NotFound`.
    pub async fn get_account(&self, owner: UserId, id: AccountId) -> Result<Account, AccountError> {
        match self.store.account_by_id(id).await? {
            Some(account) if account.user_id == owner => Ok(account),
            _ => Err(AccountError::NotFound),
        }
    }

    pub async fn set_active(
        &self,
        owner: UserId,
        id: AccountId,
        active: bool,
    ) -> Result<Account, AccountError> {
        self.get_account(owner, id).await?;
        let account = self
            .store
            .set_account_active(id, active)
            .await?
            .ok_or(AccountError::NotFound)?;
        tracing::info!(user_id = owner, account_id = id, active, "Account status changed");
        Ok(account)
    }

    /// Ledger entries of an owned account, newest first
    pub async fn transactions(
        &self,
        owner: UserId,
        id: AccountId,
    ) -> Result<Vec<Transaction>, AccountError> {
        let account = self.get_account(owner, id).await?;
        Ok(self.store.transactions_by_account(account.id).await?)
    }

    /// Credit an active account from outside the system.
    ///
    /// Development helper behind the `mock-api` feature. The balance change
    /// and its `deposit` ledger entry commit together.
    pub async fn deposit(
        &self,
        number: &AccountNumber,
        amount: &AmountInput,
        description: &str,
    ) -> Result<Account, AccountError> {
        let amount = amount.to_minor_units()?;

        let target = match self.store.active_accounts_by_number(number).await?.as_slice() {
            [] => return Err(AccountError::NotFound),
            [account] => account.clone(),
            many => {
                tracing::error!(account_number = %number, count = many.len(), "Duplicate active account number");
                return Err(StoreError::Integrity(format!(
                    "{} active accounts with number {}",
                    many.len(),
                    number
                ))
                .into());
            }
        };

        let mut unit = self.store.begin().await?;
        match apply_deposit(unit.as_mut(), target.id, amount, description).await {
            Ok(account) => {
                unit.commit().await?;
                tracing::info!(account_id = account.id, amount, balance = account.balance, "Deposit applied");
                Ok(account)
            }
            Err(e) => {
                if let Err(rb) = unit.rollback().await {
                    tracing::warn!(error = %rb, "Deposit rollback failed");
                }
                Err(e)
            }
        }
    }
}

async fn apply_deposit(
    unit: &mut dyn AtomicUnit,
    id: AccountId,
    amount: MinorUnits,
    description: &str,
) -> Result<Account, AccountError> {
    let mut account = unit
        .lock_accounts(&[id])
        .await?
        .into_iter()
        .find(|a| a.id == id && a.active)
        .ok_or(AccountError::NotFound)?;

    account.balance = unit.adjust_balance(id, amount).await?;
    unit.insert_transaction(NewTransaction {
        account_id: id,
        amount,
        kind: TransactionKind::Deposit,
        transaction_date: Utc::now(),
        description: description.to_string(),
        transfer_id: None,
    })
    .await?;
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::models::NewUser;
    use crate::money::MoneyError;
    use crate::store::{FailPoint, MemoryStore};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed list of draws, then repeats the last one
    struct ScriptedDraws(Mutex<VecDeque<u32>>);

    impl ScriptedDraws {
        fn new(draws: &[u32]) -> Arc<Self> {
            Arc::new(Self(Mutex::new(draws.iter().copied().collect())))
        }
    }

    impl AccountNumberGenerator for ScriptedDraws {
        fn draw(&self) -> u32 {
            let mut q = self.0.lock().unwrap();
            if q.len() > 1 {
                q.pop_front().unwrap()
            } else {
                *q.front().unwrap()
            }
        }
    }

    async fn setup(draws: &[u32]) -> (MemoryStore, AccountService, UserId) {
        let store = MemoryStore::new();
        let user = store
            .insert_user(NewUser {
                name: "Saraa".to_string(),
                email: "saraa@example.com".to_string(),
                age: Some(28),
                phone_number: None,
                password_hash: "x".to_string(),
            })
            .await
            .unwrap();
        let service = AccountService::with_generator(
            Arc::new(store.clone()),
            AccountsConfig::default(),
            ScriptedDraws::new(draws),
        );
        (store, service, user.id)
    }

    #[tokio::test]
    async fn test_create_account_defaults() {
        let (_, service, owner) = setup(&[4_821_937]).await;
        let account = service.create_account(owner, None, None).await.unwrap();
        assert_eq!(account.account_number.as_str(), "4821937");
        assert_eq!(account.currency, "MNT");
        assert_eq!(account.balance, 0);
        assert!(account.active);
        assert_eq!(account.limit, None);
    }

    #[tokio::test]
    async fn test_create_account_normalizes_currency() {
        let (_, service, owner) = setup(&[1_234_567]).await;
        let account = service
            .create_account(owner, Some("usd"), Some(50_000))
            .await
            .unwrap();
        assert_eq!(account.currency, "USD");
        assert_eq!(account.limit, Some(50_000));
    }

    #[tokio::test]
    async fn test_create_account_rejects_bad_input() {
        let (_, service, owner) = setup(&[1_234_567]).await;
        assert!(matches!(
            service.create_account(owner, Some("dollars"), None).await,
            Err(AccountError::InvalidCurrency(_))
        ));
        assert!(matches!(
            service.create_account(owner, None, Some(-1)).await,
            Err(AccountError::InvalidLimit)
        ));
    }

    #[tokio::test]
    async fn test_taken_number_is_redrawn() {
        let (_, service, owner) = setup(&[1_111_111, 1_111_111, 2_222_222]).await;
        let first = service.create_account(owner, None, None).await.unwrap();
        let second = service.create_account(owner, None, None).await.unwrap();
        assert_eq!(first.account_number.as_str(), "1111111");
        assert_eq!(second.account_number.as_str(), "2222222");
    }

    #[tokio::test]
    async fn test_number_space_exhausted_after_attempts() {
        let (_, service, owner) = setup(&[1_111_111]).await;
        service.create_account(owner, None, None).await.unwrap();
        let err = service.create_account(owner, None, None).await.unwrap_err();
        assert!(matches!(err, AccountError::NumberSpaceExhausted(5)));
        assert_eq!(err.http_status(), 409);
    }

    #[tokio::test]
    async fn test_out_of_range_draw_counts_as_attempt() {
        let (_, service, owner) = setup(&[42, 7_654_321]).await;
        let account = service.create_account(owner, None, None).await.unwrap();
        assert_eq!(account.account_number.as_str(), "7654321");
    }

    #[tokio::test]
    async fn test_other_owner_sees_not_found() {
        let (_, service, owner) = setup(&[1_234_567]).await;
        let account = service.create_account(owner, None, None).await.unwrap();

        assert!(service.get_account(owner, account.id).await.is_ok());
        assert!(matches!(
            service.get_account(owner + 1, account.id).await,
            Err(AccountError::NotFound)
        ));
        assert!(matches!(
            service.set_active(owner + 1, account.id, false).await,
            Err(AccountError::NotFound)
        ));
        assert!(matches!(
            service.transactions(owner + 1, account.id).await,
            Err(AccountError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_set_active_round_trip() {
        let (_, service, owner) = setup(&[1_234_567]).await;
        let account = service.create_account(owner, None, None).await.unwrap();

        let closed = service.set_active(owner, account.id, false).await.unwrap();
        assert!(!closed.active);
        let reopened = service.set_active(owner, account.id, true).await.unwrap();
        assert!(reopened.active);
    }

    #[tokio::test]
    async fn test_deposit_writes_ledger_entry() {
        let (_, service, owner) = setup(&[1_234_567]).await;
        let account = service.create_account(owner, None, None).await.unwrap();

        let updated = service
            .deposit(&account.account_number, &AmountInput::from(10_000), "salary")
            .await
            .unwrap();
        assert_eq!(updated.balance, 10_000);

        let entries = service.transactions(owner, account.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, TransactionKind::Deposit);
        assert_eq!(entries[0].amount, 10_000);
    }

    #[tokio::test]
    async fn test_deposit_rejects_bad_amount_and_inactive_account() {
        let (_, service, owner) = setup(&[1_234_567]).await;
        let account = service.create_account(owner, None, None).await.unwrap();

        assert!(matches!(
            service
                .deposit(&account.account_number, &AmountInput::from("0"), "")
                .await,
            Err(AccountError::InvalidAmount(MoneyError::NotPositive))
        ));

        service.set_active(owner, account.id, false).await.unwrap();
        assert!(matches!(
            service
                .deposit(&account.account_number, &AmountInput::from(100), "")
                .await,
            Err(AccountError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_failed_deposit_leaves_no_trace() {
        let (store, service, owner) = setup(&[1_234_567]).await;
        let account = service.create_account(owner, None, None).await.unwrap();

        store.inject_fault(FailPoint::InsertTransaction);
        let err = service
            .deposit(&account.account_number, &AmountInput::from(500), "")
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 500);

        let reloaded = service.get_account(owner, account.id).await.unwrap();
        assert_eq!(reloaded.balance, 0);
        assert!(service.transactions(owner, account.id).await.unwrap().is_empty());
    }
}
