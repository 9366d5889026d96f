//! Peer-to-peer transfers
//!
//! # Safety Invariants
//!
//! 1. **Conservation**: sender + receiver balance sum is unchanged by any
//!    transfer, successful or not
//! 2. **All or nothing**: both balance updates, the transfer row and both
//!    transaction rows commit together or not at all
//! 3. **No overdraft**: the funds check and the debit happen under the same
//!    row lock
//! 4. **No deadlock**: rows are locked in ascending account id order

pub mod engine;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use engine::TransferEngine;
pub use error::TransferError;
pub use types::{TransferIntent, TransferReceipt};
