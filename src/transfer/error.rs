//! Transfer Error Types
//!
//! Variants are listed in the order the engine checks for them.

use thiserror::Error;

use crate::money::MoneyError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum TransferError {
    // === Validation Errors ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    #[error("sender_account is required")]
    SenderAccountRequired,

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    // === Account Errors ===
    #[error("No active sender account")]
    NoActiveSenderAccount,

    #[error("Receiver account not found")]
    ReceiverNotFound,

    // === Business Rule Errors ===
    #[error("Transfer exceeds the sender's spending limit")]
    LimitExceeded,

    #[error("Insufficient funds")]
    InsufficientFunds,

    // === System Errors ===
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount(_) => "INVALID_AMOUNT",
            TransferError::SenderAccountRequired => "SENDER_ACCOUNT_REQUIRED",
            TransferError::InvalidTransfer(_) => "INVALID_TRANSFER",
            TransferError::NoActiveSenderAccount => "NO_ACTIVE_SENDER_ACCOUNT",
            TransferError::ReceiverNotFound => "RECEIVER_NOT_FOUND",
            TransferError::LimitExceeded => "LIMIT_EXCEEDED",
            TransferError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            TransferError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount(_)
            | TransferError::SenderAccountRequired
            | TransferError::InvalidTransfer(_) => 400,
            TransferError::NoActiveSenderAccount | TransferError::ReceiverNotFound => 404,
            TransferError::LimitExceeded | TransferError::InsufficientFunds => 409,
            TransferError::Storage(_) => 500,
        }
    }
}
