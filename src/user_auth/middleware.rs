use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::core_types::UserId;
use crate::gateway::{
    state::AppState,
    types::{ApiError, error_codes},
};

/// Authenticated caller, inserted into request extensions by
/// [`jwt_auth_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::UNAUTHORIZED,
                error_codes::MISSING_AUTH,
                "Access denied, token missing",
            )
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::new(
            StatusCode::UNAUTHORIZED,
            error_codes::AUTH_FAILED,
            "Invalid token format",
        )
    })?;

    // 2. Verify token; `sub` must carry a user id
    let user_id = state
        .user_auth
        .verify_token(token)
        .and_then(|claims| claims.user_id())
        .map_err(|_| {
            ApiError::new(
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "Invalid or expired token",
            )
        })?;

    // 3. Inject User ID
    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}
