//! Core types used throughout the system
//!
//! Storage keys are plain aliases over the PostgreSQL `BIGINT` columns.
//! The account number is the externally shared business key and gets its
//! own newtype so it can never be confused with an internal id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// User ID - primary key of `users`.
pub type UserId = i64;

/// Account ID - internal storage key of `accounts`.
///
/// Never shown to other users; transfers address accounts by
/// [`AccountNumber`] instead. Also the lock order for the transfer engine:
/// rows are always locked by ascending `AccountId`.
pub type AccountId = i64;

/// Transfer ID - primary key of `transfers`.
pub type TransferId = i64;

/// Transaction (ledger entry) ID - primary key of `transactions`.
pub type TransactionId = i64;

/// Amount in minor currency units (cents, möngö, ...).
pub type MinorUnits = i64;

/// Number of digits in a generated account number.
pub const ACCOUNT_NUMBER_DIGITS: usize = 7;

/// Human-facing account number (business key).
///
/// Always exactly [`ACCOUNT_NUMBER_DIGITS`] ASCII digits without a leading zero.
/// Serialized as a JSON string; clients may also send it as a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Build from a numeric draw in `1_000_000..=9_999_999`.
    pub fn from_draw(n: u32) -> Option<Self> {
        if (1_000_000..=9_999_999).contains(&n) {
            Some(Self(n.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("account number must be {ACCOUNT_NUMBER_DIGITS} digits: {0:?}")]
pub struct InvalidAccountNumber(pub String);

impl FromStr for AccountNumber {
    type Err = InvalidAccountNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let valid = s.len() == ACCOUNT_NUMBER_DIGITS
            && s.bytes().all(|b| b.is_ascii_digit())
            && !s.starts_with('0');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidAccountNumber(s.to_string()))
        }
    }
}

impl<'de> Deserialize<'de> for AccountNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        };
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account number exactly as a client sent it.
///
/// Transfer requests carry this instead of [`AccountNumber`] so that a
/// malformed number is reported as an unknown account by the engine rather
/// than rejected while decoding the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNumberInput(String);

impl AccountNumberInput {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `None` if the text is not a well-formed account number
    pub fn parse(&self) -> Option<AccountNumber> {
        self.0.parse().ok()
    }
}

impl From<&str> for AccountNumberInput {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<AccountNumber> for AccountNumberInput {
    fn from(v: AccountNumber) -> Self {
        Self(v.0)
    }
}

impl fmt::Display for AccountNumberInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccountNumberInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Number(n) => Self(n.to_string()),
        })
    }
}

impl Serialize for AccountNumberInput {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
