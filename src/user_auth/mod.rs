//! User signup, login and bearer-token authentication

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod service;

pub use error::UserAuthError;
pub use middleware::{AuthUser, jwt_auth_middleware};
pub use service::{AuthResponse, Claims, LoginRequest, SignupRequest, UserAuthService};
