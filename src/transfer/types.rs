//! Transfer request and result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::{AccountNumber, AccountNumberInput, MinorUnits, TransferId};
use crate::money::AmountInput;

/// What the caller asks for. Fields are kept as sent; the engine validates
/// them in order.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TransferIntent {
    /// Minor units, JSON number or string
    #[schema(value_type = String, example = "4000")]
    pub amount: AmountInput,
    /// Caller's sending account; see `transfer.require_sender_account`
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "4821937")]
    pub sender_account: Option<AccountNumberInput>,
    #[schema(value_type = String, example = "7310562")]
    pub receiver_account: AccountNumberInput,
    #[serde(default)]
    pub description: String,
}

/// Result of a committed transfer
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferReceipt {
    pub transfer_id: TransferId,
    pub amount: MinorUnits,
    #[schema(example = "40.00")]
    pub amount_display: String,
    pub currency: String,
    #[schema(value_type = String)]
    pub sender_account: AccountNumber,
    #[schema(value_type = String)]
    pub receiver_account: AccountNumber,
    pub description: String,
    pub transfer_time: DateTime<Utc>,
    /// Sender balance right after the debit
    pub sender_balance: MinorUnits,
}
