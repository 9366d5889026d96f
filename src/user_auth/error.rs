use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum UserAuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User already exists")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token generation failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl UserAuthError {
    pub fn code(&self) -> &'static str {
        match self {
            UserAuthError::InvalidInput(_) => "INVALID_INPUT",
            UserAuthError::EmailTaken => "EMAIL_TAKEN",
            UserAuthError::UserNotFound => "USER_NOT_FOUND",
            UserAuthError::InvalidPassword => "INVALID_PASSWORD",
            UserAuthError::InvalidToken => "INVALID_TOKEN",
            UserAuthError::Hashing(_) => "HASHING_ERROR",
            UserAuthError::Token(_) => "TOKEN_ERROR",
            UserAuthError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            UserAuthError::InvalidInput(_) | UserAuthError::EmailTaken => 400,
            UserAuthError::UserNotFound => 404,
            UserAuthError::InvalidPassword | UserAuthError::InvalidToken => 401,
            UserAuthError::Hashing(_) | UserAuthError::Token(_) | UserAuthError::Storage(_) => 500,
        }
    }
}
