//! Account management module
//!
//! Users and bank accounts: models, the account lifecycle service and its
//! error type. Storage lives behind [`crate::store::BankStore`].

pub mod error;
pub mod models;
pub mod service;

// Re-export commonly used types
pub use error::AccountError;
pub use models::{Account, AccountView, NewAccount, NewUser, User, UserProfile};
pub use service::{AccountNumberGenerator, AccountService, RandomAccountNumbers};
