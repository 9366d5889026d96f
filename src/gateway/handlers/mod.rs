//! HTTP handlers
//!
//! Handlers stay thin: decode, call one service, wrap the result in
//! [`ApiResponse`](super::types::ApiResponse).

pub mod account;
pub mod health;
#[cfg(feature = "mock-api")]
pub mod mock;
pub mod transfer;

pub use account::{
    create_account, get_account, list_account_transactions, list_account_transfers,
    list_accounts, set_account_status,
};
pub use health::health_check;
#[cfg(feature = "mock-api")]
pub use mock::mock_deposit;
pub use transfer::create_transfer;

use axum::Json;
use axum::extract::rejection::JsonRejection;

use super::types::ApiError;

/// Unwrap a JSON body, turning decode failures into an enveloped 400
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
    }
}
