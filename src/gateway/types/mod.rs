//! Response envelope shared by every handler
//!
//! Success and failure bodies both use `{code, msg, data}`; see [`response`].

pub mod response;

pub use response::{ApiError, ApiResponse, ApiResult, created, error_codes, ok};
