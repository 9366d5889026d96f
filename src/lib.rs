//! minibank - users, accounts and peer-to-peer transfers over HTTP
//!
//! # Modules
//!
//! - [`core_types`] - Ids and the account number newtype
//! - [`money`] - Amount parsing and display (integer minor units)
//! - [`ledger`] - Transaction and transfer records
//! - [`store`] - Storage traits with PostgreSQL and in-memory engines
//! - [`account`] - Users, accounts and the account lifecycle
//! - [`transfer`] - Transfer engine
//! - [`user_auth`] - Signup, login, JWT middleware
//! - [`gateway`] - HTTP router, handlers, OpenAPI

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod db;
pub mod logging;
pub mod money;

// Domain
pub mod account;
pub mod ledger;
pub mod store;
pub mod transfer;

// HTTP surface
pub mod gateway;
pub mod user_auth;

// Convenient re-exports at crate root
pub use account::{Account, AccountError, AccountService};
pub use core_types::{AccountId, AccountNumber, MinorUnits, UserId};
pub use store::{BankStore, MemoryStore, PgStore, StoreError};
pub use transfer::{TransferEngine, TransferError, TransferIntent, TransferReceipt};
