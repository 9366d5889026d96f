//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError`: Error half of every handler result
//! - `error_codes`: Standard error code constants

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::account::AccountError;
use crate::transfer::TransferError;
use crate::user_auth::UserAuthError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Result type of every JSON handler
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// `200 OK` with data
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// `201 Created` with data
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

// ============================================================================
// Error Response
// ============================================================================

/// HTTP error with an envelope body.
///
/// Server-side failures never echo their cause to the client: the detail is
/// logged and the body carries a generic message.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    /// Log `detail` and produce a generic 500
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "Request failed with internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            "Internal server error",
        )
    }

    /// Map a domain error: 5xx go through [`ApiError::internal`], the rest
    /// keep their message
    fn from_domain(status: u16, code: i32, err: &impl std::fmt::Display) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            Self::internal(err)
        } else {
            Self::new(status, code, err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.code, self.msg))).into_response()
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let code = match &e {
            TransferError::InvalidAmount(_) => error_codes::INVALID_AMOUNT,
            TransferError::SenderAccountRequired => error_codes::SENDER_ACCOUNT_REQUIRED,
            TransferError::InvalidTransfer(_) => error_codes::INVALID_TRANSFER,
            TransferError::NoActiveSenderAccount => error_codes::SENDER_NOT_FOUND,
            TransferError::ReceiverNotFound => error_codes::RECEIVER_NOT_FOUND,
            TransferError::LimitExceeded => error_codes::LIMIT_EXCEEDED,
            TransferError::InsufficientFunds => error_codes::INSUFFICIENT_FUNDS,
            TransferError::Storage(_) => error_codes::INTERNAL_ERROR,
        };
        Self::from_domain(e.http_status(), code, &e)
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        let code = match &e {
            AccountError::InvalidCurrency(_) | AccountError::InvalidLimit => {
                error_codes::INVALID_PARAMETER
            }
            AccountError::InvalidAmount(_) => error_codes::INVALID_AMOUNT,
            AccountError::NotFound => error_codes::ACCOUNT_NOT_FOUND,
            AccountError::NumberSpaceExhausted(_) => error_codes::ACCOUNT_NUMBER_EXHAUSTED,
            AccountError::Storage(_) => error_codes::INTERNAL_ERROR,
        };
        Self::from_domain(e.http_status(), code, &e)
    }
}

impl From<UserAuthError> for ApiError {
    fn from(e: UserAuthError) -> Self {
        let code = match &e {
            UserAuthError::InvalidInput(_) => error_codes::INVALID_PARAMETER,
            UserAuthError::EmailTaken => error_codes::EMAIL_TAKEN,
            UserAuthError::UserNotFound => error_codes::USER_NOT_FOUND,
            UserAuthError::InvalidPassword => error_codes::INVALID_PASSWORD,
            UserAuthError::InvalidToken => error_codes::AUTH_FAILED,
            UserAuthError::Hashing(_) | UserAuthError::Token(_) | UserAuthError::Storage(_) => {
                error_codes::INTERNAL_ERROR
            }
        };
        Self::from_domain(e.http_status(), code, &e)
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INVALID_AMOUNT: i32 = 1002;
    pub const INSUFFICIENT_FUNDS: i32 = 1003;
    pub const LIMIT_EXCEEDED: i32 = 1004;
    pub const INVALID_TRANSFER: i32 = 1005;
    pub const SENDER_ACCOUNT_REQUIRED: i32 = 1006;
    pub const EMAIL_TAKEN: i32 = 1007;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const INVALID_PASSWORD: i32 = 2003;

    // Resource errors (4xxx)
    pub const USER_NOT_FOUND: i32 = 4001;
    pub const ACCOUNT_NOT_FOUND: i32 = 4002;
    pub const SENDER_NOT_FOUND: i32 = 4003;
    pub const RECEIVER_NOT_FOUND: i32 = 4004;
    pub const ACCOUNT_NUMBER_EXHAUSTED: i32 = 4091;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}
