//! Account handlers (JWT)

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, created, ok};
use super::json_body;
use crate::account::AccountView;
use crate::core_types::{AccountId, MinorUnits};
use crate::ledger::{Transaction, Transfer};
use crate::user_auth::AuthUser;

/// Create account request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    /// ISO currency code, defaults to `accounts.default_currency`
    #[schema(example = "MNT")]
    pub currency: Option<String>,
    /// Per-transfer spending limit in minor units
    #[schema(example = 500000)]
    pub limit: Option<MinorUnits>,
}

/// Account status change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AccountStatusRequest {
    pub active: bool,
}

/// List the caller's accounts
#[utoipa::path(
    get,
    path = "/accounts",
    responses(
        (status = 200, description = "Accounts ordered by id", body = ApiResponse<Vec<AccountView>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<Vec<AccountView>> {
    let accounts = state.accounts.list_accounts(user_id).await?;
    ok(accounts.into_iter().map(AccountView::from).collect())
}

/// Open a new account
#[utoipa::path(
    post,
    path = "/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<AccountView>),
        (status = 400, description = "Invalid currency or limit"),
        (status = 409, description = "No free account number"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult<AccountView> {
    // An empty body means "all defaults"
    let req = match payload {
        Err(JsonRejection::MissingJsonContentType(_)) => CreateAccountRequest::default(),
        other => json_body(other)?,
    };
    let account = state
        .accounts
        .create_account(user_id, req.currency.as_deref(), req.limit)
        .await?;
    created(account.into())
}

/// Get one of the caller's accounts
#[utoipa::path(
    get,
    path = "/accounts/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = ApiResponse<AccountView>),
        (status = 404, description = "Account not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<AccountId>,
) -> ApiResult<AccountView> {
    let account = state.accounts.get_account(user_id, id).await?;
    ok(account.into())
}

/// Activate or deactivate an account
#[utoipa::path(
    put,
    path = "/accounts/{id}/status",
    params(("id" = i64, Path, description = "Account id")),
    request_body = AccountStatusRequest,
    responses(
        (status = 200, description = "Updated account", body = ApiResponse<AccountView>),
        (status = 404, description = "Account not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn set_account_status(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<AccountId>,
    payload: Result<Json<AccountStatusRequest>, JsonRejection>,
) -> ApiResult<AccountView> {
    let req = json_body(payload)?;
    let account = state.accounts.set_active(user_id, id, req.active).await?;
    ok(account.into())
}

/// Ledger entries of one account, newest first
#[utoipa::path(
    get,
    path = "/accounts/{id}/transactions",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Transactions, date descending", body = ApiResponse<Vec<Transaction>>),
        (status = 404, description = "Account not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn list_account_transactions(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<AccountId>,
) -> ApiResult<Vec<Transaction>> {
    ok(state.accounts.transactions(user_id, id).await?)
}

/// Transfers sent or received by one account, newest first
#[utoipa::path(
    get,
    path = "/accounts/{id}/transfers",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Transfers, newest first", body = ApiResponse<Vec<Transfer>>),
        (status = 404, description = "Account not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn list_account_transfers(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<AccountId>,
) -> ApiResult<Vec<Transfer>> {
    let account = state.accounts.get_account(user_id, id).await?;
    ok(state.transfers.transfers_for_account(&account).await?)
}
