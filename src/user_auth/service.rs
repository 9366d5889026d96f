use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::error::UserAuthError;
use crate::account::models::{NewUser, UserProfile};
use crate::config::AuthConfig;
use crate::core_types::UserId;
use crate::store::{BankStore, constraints};

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user_id as string)
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId, UserAuthError> {
        self.sub.parse().map_err(|_| UserAuthError::InvalidToken)
    }
}

/// User Signup Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Bold")]
    pub name: String,
    #[validate(email)]
    #[schema(example = "bold@example.com")]
    pub email: String,
    #[validate(range(min = 0, max = 150))]
    #[schema(example = 30)]
    pub age: Option<i32>,
    #[validate(length(min = 8, max = 128))]
    #[schema(example = "password123")]
    pub password: String,
    #[validate(length(max = 32))]
    #[schema(example = "99119911")]
    pub phone_number: Option<String>,
}

/// User Login Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "bold@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// Auth Response (JWT)
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    /// Token expiry, UTC unix seconds
    pub expires_at: i64,
}

pub struct UserAuthService {
    store: Arc<dyn BankStore>,
    jwt_secret: String,
    token_ttl: Duration,
}

impl UserAuthService {
    pub fn new(store: Arc<dyn BankStore>, config: &AuthConfig) -> Self {
        Self {
            store,
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: Duration::seconds(config.token_ttl_secs),
        }
    }

    /// Register a new user
    pub async fn signup(&self, req: SignupRequest) -> Result<UserProfile, UserAuthError> {
        req.validate()
            .map_err(|e| UserAuthError::InvalidInput(e.to_string()))?;

        let email = req.email.trim().to_lowercase();
        if self.store.user_by_email(&email).await?.is_some() {
            return Err(UserAuthError::EmailTaken);
        }

        // 1. Hash password
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| UserAuthError::Hashing(e.to_string()))?
            .to_string();

        // 2. Insert; a concurrent signup with the same email hits the constraint
        let user = self
            .store
            .insert_user(NewUser {
                name: req.name.trim().to_string(),
                email,
                age: req.age,
                phone_number: req.phone_number,
                password_hash,
            })
            .await
            .map_err(|e| {
                if e.is_conflict_on(constraints::USERS_EMAIL) {
                    UserAuthError::EmailTaken
                } else {
                    e.into()
                }
            })?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user.into())
    }

    /// Login user and issue JWT
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, UserAuthError> {
        // 1. Find user by email
        let email = req.email.trim().to_lowercase();
        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(UserAuthError::UserNotFound)?;

        // 2. Verify password
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| UserAuthError::Hashing(format!("stored hash unreadable: {}", e)))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| UserAuthError::InvalidPassword)?;

        // 3. Generate JWT
        let (token, expires_at) = self.issue_token(user.id)?;
        tracing::info!(user_id = user.id, "User logged in");

        Ok(AuthResponse {
            token,
            user_id: user.id,
            name: user.name,
            email: user.email,
            expires_at,
        })
    }

    /// Sign a token for `user_id`; returns the token and its expiry
    pub fn issue_token(&self, user_id: UserId) -> Result<(String, i64), UserAuthError> {
        let now = Utc::now();
        let expiration = (now + self.token_ttl).timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;
        Ok((token, expiration))
    }

    /// Verify JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, UserAuthError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| UserAuthError::InvalidToken)?;
        Ok(token_data.claims)
    }

    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile, UserAuthError> {
        self.store
            .user_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or(UserAuthError::UserNotFound)
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, UserAuthError> {
        Ok(self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(UserProfile::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> UserAuthService {
        UserAuthService::new(Arc::new(MemoryStore::new()), &AuthConfig::default())
    }

    fn signup_req(email: &str) -> SignupRequest {
        SignupRequest {
            name: "Bold".to_string(),
            email: email.to_string(),
            age: Some(30),
            password: "password123".to_string(),
            phone_number: Some("99119911".to_string()),
        }
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let svc = service();
        let profile = svc.signup(signup_req("Bold@Example.com")).await.unwrap();
        assert_eq!(profile.email, "bold@example.com");

        let auth = svc
            .login(LoginRequest {
                email: "bold@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(auth.user_id, profile.id);

        let claims = svc.verify_token(&auth.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), profile.id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let svc = service();
        svc.signup(signup_req("a@example.com")).await.unwrap();
        let err = svc.signup(signup_req("a@example.com")).await.unwrap_err();
        assert!(matches!(err, UserAuthError::EmailTaken));
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let svc = service();
        let mut req = signup_req("not-an-email");
        assert!(matches!(svc.signup(req).await, Err(UserAuthError::InvalidInput(_))));

        req = signup_req("b@example.com");
        req.password = "short".to_string();
        assert!(matches!(svc.signup(req).await, Err(UserAuthError::InvalidInput(_))));

        req = signup_req("c@example.com");
        req.age = Some(-1);
        assert!(matches!(svc.signup(req).await, Err(UserAuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_login_failures() {
        let svc = service();
        svc.signup(signup_req("a@example.com")).await.unwrap();

        let err = svc
            .login(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 404);

        let err = svc
            .login(LoginRequest {
                email: "a@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UserAuthError::InvalidPassword));
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn test_token_rejected_with_other_secret() {
        let svc = service();
        let (token, _) = svc.issue_token(7).unwrap();

        let other = UserAuthService::new(
            Arc::new(MemoryStore::new()),
            &AuthConfig {
                jwt_secret: "another-secret".to_string(),
                token_ttl_secs: 3600,
            },
        );
        assert!(matches!(other.verify_token(&token), Err(UserAuthError::InvalidToken)));
        assert!(matches!(svc.verify_token("garbage"), Err(UserAuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = UserAuthService::new(
            Arc::new(MemoryStore::new()),
            &AuthConfig {
                jwt_secret: "secret".to_string(),
                token_ttl_secs: -3600,
            },
        );
        let (token, _) = svc.issue_token(7).unwrap();
        assert!(matches!(svc.verify_token(&token), Err(UserAuthError::InvalidToken)));
    }
}
