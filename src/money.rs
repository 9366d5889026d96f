//! Money Conversion Module
//!
//! Unified conversion between the internal `i64` minor-unit representation
//! and client-facing strings. All conversions MUST go through this module.
//!
//! ## Internal Representation
//! - Balances, limits and transfer amounts are `i64` minor units
//!   (1 USD = 100, 1 MNT = 100, 1 JPY = 1)
//! - Floating point never touches a balance
//! - Display decimals come from [`currency_decimals`]
//!
//! ## Usage
//! ```rust
//! use minibank::money::{AmountInput, format_amount};
//!
//! let amount = AmountInput::from("4000").to_minor_units().unwrap();
//! assert_eq!(amount, 4000);
//! assert_eq!(format_amount(amount, 2), "40.00");
//! ```

use std::fmt;

use rust_decimal::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::core_types::MinorUnits;

// ============================================================================
// Error Types
// ============================================================================

/// Money conversion errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Amount must be positive")]
    NotPositive,

    #[error("Amount must be a whole number of minor units")]
    Fractional,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// AmountInput: raw client amount, validated by the transfer engine
// ============================================================================

/// Amount exactly as the client sent it.
///
/// Accepts a JSON string or a JSON number and keeps the text. Nothing is
/// rejected during deserialization so that amount validation happens in the
/// engine, in its documented order, with its typed error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountInput(String);

impl AmountInput {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a strictly positive number of minor units.
    pub fn to_minor_units(&self) -> Result<MinorUnits, MoneyError> {
        parse_minor_units(&self.0)
    }
}

impl From<i64> for AmountInput {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

impl From<&str> for AmountInput {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl fmt::Display for AmountInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AmountInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => AmountInput(s),
            Raw::Number(n) => AmountInput(n.to_string()),
        })
    }
}

impl Serialize for AmountInput {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

// ============================================================================
// Parse: Client → Internal
// ============================================================================

/// Convert a client amount string to minor units.
///
/// # Errors
/// * `InvalidFormat` - not a decimal number (includes `NaN`, `inf`, exponents)
/// * `Fractional` - a fraction of a minor unit (`40.5`)
/// * `NotPositive` - zero or negative
/// * `Overflow` - does not fit `i64`
pub fn parse_minor_units(raw: &str) -> Result<MinorUnits, MoneyError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    // Decimal::from_str rejects NaN/inf; exponents are refused explicitly so
    // "1e3" cannot silently mean 1000.
    if raw.contains(['e', 'E']) {
        return Err(MoneyError::InvalidFormat(
            "scientific notation not allowed".into(),
        ));
    }

    let decimal = Decimal::from_str(raw).map_err(|e| {
        if e.to_string().contains("too large") || e.to_string().contains("overflow") {
            MoneyError::Overflow
        } else {
            MoneyError::InvalidFormat(raw.to_string())
        }
    })?;

    parse_decimal(decimal)
}

/// Convert a Decimal to minor units (must be integral and positive).
pub fn parse_decimal(decimal: Decimal) -> Result<MinorUnits, MoneyError> {
    if decimal.is_sign_negative() || decimal.is_zero() {
        return Err(MoneyError::NotPositive);
    }

    if !decimal.fract().is_zero() {
        return Err(MoneyError::Fractional);
    }

    decimal.to_i64().ok_or(MoneyError::Overflow)
}

// ============================================================================
// Format: Internal → Client
// ============================================================================

/// Decimal places of a currency's minor unit. Unknown codes use 2.
pub fn currency_decimals(currency: &str) -> u32 {
    match currency {
        "JPY" | "KRW" | "VND" | "CLP" | "ISK" => 0,
        "KWD" | "BHD" | "OMR" | "JOD" | "TND" => 3,
        _ => 2,
    }
}

/// Format signed minor units as a display string with `decimals` places.
pub fn format_amount(value: MinorUnits, decimals: u32) -> String {
    let d = Decimal::from_i128_with_scale(value as i128, decimals);
    format!("{:.prec$}", d, prec = decimals as usize)
}

/// Format minor units using the currency's own decimal places.
pub fn format_for_currency(value: MinorUnits, currency: &str) -> String {
    format_amount(value, currency_decimals(currency))
}

/// Validate and normalize an ISO-4217 style currency code.
pub fn normalize_currency(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}
