use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::middleware::AuthUser;
use super::service::{AuthResponse, LoginRequest, SignupRequest};
use crate::account::UserProfile;
use crate::core_types::UserId;
use crate::gateway::handlers::json_body;
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResponse, ApiResult, created, ok};

/// Register a new user
///
/// POST /signup
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid input or user already exists"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let req = json_body(payload)?;
    let profile = state.user_auth.signup(req).await.inspect_err(|e| {
        tracing::warn!(reason = e.code(), "Signup rejected");
    })?;
    created(profile)
}

/// Login user
///
/// POST /login
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid password"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let req = json_body(payload)?;
    let resp = state.user_auth.login(req).await.inspect_err(|e| {
        tracing::warn!(reason = e.code(), "Login failed");
    })?;
    ok(resp)
}

/// Profile of the caller
///
/// GET /user
#[utoipa::path(
    get,
    path = "/user",
    responses(
        (status = 200, description = "Profile", body = ApiResponse<UserProfile>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<UserProfile> {
    ok(state.user_auth.profile(user_id).await?)
}

/// List users
///
/// GET /users
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Public profiles ordered by id", body = ApiResponse<Vec<UserProfile>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Vec<UserProfile>> {
    ok(state.user_auth.list_users().await?)
}

/// Get a user by id
///
/// GET /users/{id}
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Public profile", body = ApiResponse<UserProfile>),
        (status = 404, description = "User not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
) -> ApiResult<UserProfile> {
    ok(state.user_auth.profile(id).await?)
}
