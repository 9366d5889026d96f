//! Data models for users and bank accounts

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::core_types::{AccountId, AccountNumber, MinorUnits, UserId};
use crate::money;

/// Registered user. `password_hash` is an argon2 PHC string and never
/// leaves the service layer.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `users`
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub phone_number: Option<String>,
    pub password_hash: String,
}

/// User profile as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            age: u.age,
            phone_number: u.phone_number,
            created_at: u.created_at,
        }
    }
}

/// Bank account row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub account_number: AccountNumber,
    pub currency: String,
    pub balance: MinorUnits,
    /// Per-transfer spending cap, `None` = uncapped
    pub limit: Option<MinorUnits>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Whether a single debit of `amount` is within the spending limit
    pub fn within_limit(&self, amount: MinorUnits) -> bool {
        self.limit.is_none_or(|cap| amount <= cap)
    }
}

/// Insert payload for `accounts`. Balance always starts at zero.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_id: UserId,
    pub account_number: AccountNumber,
    pub currency: String,
    pub limit: Option<MinorUnits>,
}

/// Account as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountView {
    pub id: AccountId,
    #[schema(value_type = String, example = "4821937")]
    pub account_number: AccountNumber,
    #[schema(example = "MNT")]
    pub currency: String,
    /// Balance in minor units
    pub balance: MinorUnits,
    /// Balance formatted with the currency's decimals
    #[schema(example = "100.00")]
    pub balance_display: String,
    pub limit: Option<MinorUnits>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(a: Account) -> Self {
        Self {
            balance_display: money::format_for_currency(a.balance, &a.currency),
            id: a.id,
            account_number: a.account_number,
            currency: a.currency,
            balance: a.balance,
            limit: a.limit,
            active: a.active,
            created_at: a.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(limit: Option<MinorUnits>) -> Account {
        Account {
            id: 1,
            user_id: 7,
            account_number: "1234567".parse().unwrap(),
            currency: "MNT".to_string(),
            balance: 12_345,
            limit,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_within_limit() {
        assert!(account(None).within_limit(i64::MAX));
        assert!(account(Some(100)).within_limit(100));
        assert!(!account(Some(100)).within_limit(101));
    }

    #[test]
    fn test_account_view_formats_balance() {
        let view = AccountView::from(account(None));
        assert_eq!(view.balance_display, "123.45");
        assert_eq!(view.account_number.as_str(), "1234567");
    }

    #[test]
    fn test_profile_drops_password_hash() {
        let user = User {
            id: 3,
            name: "Bold".to_string(),
            email: "bold@example.com".to_string(),
            age: Some(30),
            phone_number: Some("99119911".to_string()),
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&UserProfile::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("bold@example.com"));
    }
}
