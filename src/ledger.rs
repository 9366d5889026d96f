//! Ledger - transaction and transfer records
//!
//! Both logs are append-only. Rows are created by the transfer engine (or the
//! mock deposit path) inside an atomic unit and are never updated or deleted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::core_types::{AccountId, AccountNumber, MinorUnits, TransactionId, TransferId};

/// Kind of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Sender side of a transfer
    TransferOut,
    /// Receiver side of a transfer
    TransferIn,
    /// External credit (mock deposit endpoint)
    Deposit,
}

impl TransactionKind {
    /// Stored value of the `transactions.type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::TransferOut => "transfer_out",
            TransactionKind::TransferIn => "transfer_in",
            TransactionKind::Deposit => "deposit",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer_out" => Ok(TransactionKind::TransferOut),
            "transfer_in" => Ok(TransactionKind::TransferIn),
            "deposit" => Ok(TransactionKind::Deposit),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// One balance-affecting event on one account.
///
/// `amount` is the positive magnitude; the kind carries the direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub amount: MinorUnits,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub transaction_date: DateTime<Utc>,
    pub description: String,
    pub transfer_id: Option<TransferId>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: MinorUnits,
    pub kind: TransactionKind,
    pub transaction_date: DateTime<Utc>,
    pub description: String,
    pub transfer_id: Option<TransferId>,
}

/// One completed movement of funds between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Transfer {
    pub id: TransferId,
    pub amount: MinorUnits,
    #[schema(value_type = String)]
    pub sender: AccountNumber,
    #[schema(value_type = String)]
    pub receiver: AccountNumber,
    pub description: String,
    pub transfer_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub amount: MinorUnits,
    pub sender: AccountNumber,
    pub receiver: AccountNumber,
    pub description: String,
    pub transfer_time: DateTime<Utc>,
}
