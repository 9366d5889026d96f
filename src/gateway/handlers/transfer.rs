//! Transfer handler (JWT)

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, created};
use super::json_body;
use crate::transfer::{TransferIntent, TransferReceipt};
use crate::user_auth::AuthUser;

/// Send money to another account
///
/// POST /transfers
#[utoipa::path(
    post,
    path = "/transfers",
    request_body = TransferIntent,
    responses(
        (status = 201, description = "Transfer committed", body = ApiResponse<TransferReceipt>),
        (status = 400, description = "Invalid amount, missing sender account or invalid pair"),
        (status = 404, description = "No active sender account or receiver not found"),
        (status = 409, description = "Insufficient funds or spending limit exceeded"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    payload: Result<Json<TransferIntent>, JsonRejection>,
) -> ApiResult<TransferReceipt> {
    let intent = json_body(payload)?;
    tracing::debug!(
        user_id,
        amount = %intent.amount,
        receiver = %intent.receiver_account,
        "Transfer request"
    );
    let receipt = state.transfers.execute_transfer(user_id, &intent).await?;
    created(receipt)
}
