//! Transfer Engine
//!
//! Moves funds between two accounts in one atomic unit:
//!
//! ```text
//! validate amount -> resolve sender -> resolve receiver -> pair checks
//!     -> begin unit -> lock rows (ascending id) -> limit / funds checks
//!     -> debit, credit, transfer row, 2 transaction rows -> commit
//! ```
//!
//! Everything up to `begin` is a plain read. Status and balance are read
//! again under the row locks, so a concurrent debit or deactivation between
//! the lookup and the lock is never missed. Any failure after `begin` rolls
//! the unit back; nothing is retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::error::TransferError;
use super::types::{TransferIntent, TransferReceipt};
use crate::account::models::Account;
use crate::config::TransferConfig;
use crate::core_types::{AccountId, AccountNumber, AccountNumberInput, MinorUnits, UserId};
use crate::ledger::{NewTransaction, NewTransfer, Transfer, TransactionKind};
use crate::money;
use crate::store::{AtomicUnit, BankStore, StoreError};

pub struct TransferEngine {
    store: Arc<dyn BankStore>,
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn BankStore>, config: TransferConfig) -> Self {
        Self { store, config }
    }

    /// Execute one transfer on behalf of `caller`.
    ///
    /// # Errors
    /// Checked in this order: `InvalidAmount`, `SenderAccountRequired`,
    /// `NoActiveSenderAccount`, `ReceiverNotFound`, `InvalidTransfer`, then
    /// under lock `LimitExceeded` and `InsufficientFunds`. `Storage` can
    /// occur at any step.
    pub async fn execute_transfer(
        &self,
        caller: UserId,
        intent: &TransferIntent,
    ) -> Result<TransferReceipt, TransferError> {
        let amount = intent.amount.to_minor_units()?;
        let sender = self
            .resolve_sender(caller, intent.sender_account.as_ref())
            .await?;
        let receiver = self.resolve_receiver(&intent.receiver_account).await?;

        if sender.id == receiver.id {
            return Err(TransferError::InvalidTransfer(
                "sender and receiver are the same account".to_string(),
            ));
        }
        if sender.currency != receiver.currency {
            return Err(TransferError::InvalidTransfer(format!(
                "currency mismatch: {} -> {}",
                sender.currency, receiver.currency
            )));
        }

        let now = Utc::now();
        let mut unit = self.store.begin().await?;
        let outcome =
            match apply_transfer(unit.as_mut(), &sender, &receiver, amount, &intent.description, now)
                .await
            {
                // A failed commit discards the unit's writes on its own
                Ok(receipt) => unit.commit().await.map(|()| receipt).map_err(TransferError::from),
                Err(e) => {
                    if let Err(rb) = unit.rollback().await {
                        tracing::warn!(error = %rb, "Transfer rollback failed");
                    }
                    Err(e)
                }
            };

        match &outcome {
            Ok(receipt) => tracing::info!(
                transfer_id = receipt.transfer_id,
                user_id = caller,
                sender = %receipt.sender_account,
                receiver = %receipt.receiver_account,
                amount,
                "Transfer committed"
            ),
            Err(TransferError::Storage(se)) => {
                tracing::error!(user_id = caller, error = %se, "Transfer aborted by storage error")
            }
            Err(other) => tracing::info!(user_id = caller, reason = other.code(), "Transfer rejected"),
        }
        outcome
    }

    /// Transfers where `account` is either side, newest first
    pub async fn transfers_for_account(
        &self,
        account: &Account,
    ) -> Result<Vec<Transfer>, TransferError> {
        Ok(self
            .store
            .transfers_by_account_number(&account.account_number)
            .await?)
    }

    async fn resolve_sender(
        &self,
        caller: UserId,
        requested: Option<&AccountNumberInput>,
    ) -> Result<Account, TransferError> {
        match requested {
            Some(raw) => {
                let number = raw.parse().ok_or(TransferError::NoActiveSenderAccount)?;
                match self.single_active(&number).await? {
                    Some(account) if account.user_id == caller => Ok(account),
                    _ => Err(TransferError::NoActiveSenderAccount),
                }
            }
            None if self.config.require_sender_account => Err(TransferError::SenderAccountRequired),
            None => self
                .store
                .accounts_by_owner(caller)
                .await?
                .into_iter()
                .find(|a| a.active)
                .ok_or(TransferError::NoActiveSenderAccount),
        }
    }

    async fn resolve_receiver(&self, raw: &AccountNumberInput) -> Result<Account, TransferError> {
        let number = raw.parse().ok_or(TransferError::ReceiverNotFound)?;
        self.single_active(&number)
            .await?
            .ok_or(TransferError::ReceiverNotFound)
    }

    /// The active account carrying `number`. Several matches mean the
    /// uniqueness invariant is broken and are reported as a storage fault.
    async fn single_active(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError> {
        let mut matches = self.store.active_accounts_by_number(number).await?;
        if matches.len() > 1 {
            tracing::error!(account_number = %number, count = matches.len(), "Duplicate active account number");
            return Err(StoreError::Integrity(format!(
                "{} active accounts with number {}",
                matches.len(),
                number
            )));
        }
        Ok(matches.pop())
    }
}

async fn apply_transfer(
    unit: &mut dyn AtomicUnit,
    sender: &Account,
    receiver: &Account,
    amount: MinorUnits,
    description: &str,
    now: DateTime<Utc>,
) -> Result<TransferReceipt, TransferError> {
    let locked = unit.lock_accounts(&[sender.id, receiver.id]).await?;
    let fresh = |id: AccountId| locked.iter().find(|a| a.id == id && a.active);
    let sender_now = fresh(sender.id).ok_or(TransferError::NoActiveSenderAccount)?;
    fresh(receiver.id).ok_or(TransferError::ReceiverNotFound)?;

    if !sender_now.within_limit(amount) {
        return Err(TransferError::LimitExceeded);
    }
    if sender_now.balance < amount {
        return Err(TransferError::InsufficientFunds);
    }

    let sender_balance = unit.adjust_balance(sender.id, -amount).await?;
    unit.adjust_balance(receiver.id, amount).await?;

    let transfer = unit
        .insert_transfer(NewTransfer {
            amount,
            sender: sender.account_number.clone(),
            receiver: receiver.account_number.clone(),
            description: description.to_string(),
            transfer_time: now,
        })
        .await?;

    for (account_id, kind) in [
        (sender.id, TransactionKind::TransferOut),
        (receiver.id, TransactionKind::TransferIn),
    ] {
        unit.insert_transaction(NewTransaction {
            account_id,
            amount,
            kind,
            transaction_date: now,
            description: description.to_string(),
            transfer_id: Some(transfer.id),
        })
        .await?;
    }

    Ok(TransferReceipt {
        transfer_id: transfer.id,
        amount,
        amount_display: money::format_for_currency(amount, &sender.currency),
        currency: sender.currency.clone(),
        sender_account: transfer.sender,
        receiver_account: transfer.receiver,
        description: transfer.description,
        transfer_time: transfer.transfer_time,
        sender_balance,
    })
}
