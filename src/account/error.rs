//! Account Error Types

use thiserror::Error;

use crate::money::MoneyError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AccountError {
    // === Validation Errors ===
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Spending limit must not be negative")]
    InvalidLimit,

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    // === Lookup Errors ===
    #[error("Account not found")]
    NotFound,

    #[error("No free account number after {0} attempts")]
    NumberSpaceExhausted(u32),

    // === System Errors ===
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl AccountError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            AccountError::InvalidCurrency(_) => "INVALID_CURRENCY",
            AccountError::InvalidLimit => "INVALID_LIMIT",
            AccountError::InvalidAmount(_) => "INVALID_AMOUNT",
            AccountError::NotFound => "ACCOUNT_NOT_FOUND",
            AccountError::NumberSpaceExhausted(_) => "ACCOUNT_NUMBER_EXHAUSTED",
            AccountError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            AccountError::InvalidCurrency(_)
            | AccountError::InvalidLimit
            | AccountError::InvalidAmount(_) => 400,
            AccountError::NotFound => 404,
            AccountError::NumberSpaceExhausted(_) => 409,
            AccountError::Storage(_) => 500,
        }
    }
}
