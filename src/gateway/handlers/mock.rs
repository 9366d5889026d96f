//! Development-only endpoints (`mock-api` feature)

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, ok};
use super::json_body;
use crate::account::AccountView;
use crate::core_types::AccountNumber;
use crate::money::AmountInput;

/// Mock deposit request
#[derive(Debug, Deserialize, ToSchema)]
pub struct MockDepositRequest {
    #[schema(value_type = String, example = "4821937")]
    pub account_number: AccountNumber,
    /// Minor units
    #[schema(value_type = String, example = "100000")]
    pub amount: AmountInput,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_description() -> String {
    "mock deposit".to_string()
}

/// Credit an account without a sender
#[utoipa::path(
    post,
    path = "/internal/mock/deposit",
    request_body = MockDepositRequest,
    responses(
        (status = 200, description = "Deposit applied", body = ApiResponse<AccountView>),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Account not found")
    ),
    tag = "Internal"
)]
pub async fn mock_deposit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MockDepositRequest>, JsonRejection>,
) -> ApiResult<AccountView> {
    let req = json_body(payload)?;
    let account = state
        .accounts
        .deposit(&req.account_number, &req.amount, &req.description)
        .await?;
    ok(account.into())
}
