//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::account::{AccountView, UserProfile};
use crate::gateway::handlers::account::{AccountStatusRequest, CreateAccountRequest};
use crate::gateway::handlers::health::HealthResponse;
use crate::ledger::{Transaction, TransactionKind, Transfer};
use crate::transfer::{TransferIntent, TransferReceipt};
use crate::user_auth::{AuthResponse, LoginRequest, SignupRequest};

/// JWT bearer security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /login, valid for auth.token_ttl_secs"))
                        .build(),
                ),
            );
        }
    }
}

/// Development endpoints, merged in when `mock-api` is enabled
#[cfg(feature = "mock-api")]
#[derive(OpenApi)]
#[openapi(
    paths(crate::gateway::handlers::mock::mock_deposit),
    components(schemas(crate::gateway::handlers::mock::MockDepositRequest)),
    tags((name = "Internal", description = "Development-only endpoints"))
)]
struct MockApiDoc;

struct MockAddon;

impl Modify for MockAddon {
    #[cfg(feature = "mock-api")]
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.merge(MockApiDoc::openapi());
    }

    #[cfg(not(feature = "mock-api"))]
    fn modify(&self, _openapi: &mut utoipa::openapi::OpenApi) {}
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Minibank API",
        version = "1.0.0",
        description = "Users, accounts and peer-to-peer transfers.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        // Public endpoints
        crate::gateway::handlers::health::health_check,
        crate::user_auth::handlers::signup,
        crate::user_auth::handlers::login,
        // Bearer endpoints
        crate::user_auth::handlers::current_user,
        crate::user_auth::handlers::list_users,
        crate::user_auth::handlers::get_user,
        crate::gateway::handlers::account::list_accounts,
        crate::gateway::handlers::account::create_account,
        crate::gateway::handlers::account::get_account,
        crate::gateway::handlers::account::set_account_status,
        crate::gateway::handlers::account::list_account_transactions,
        crate::gateway::handlers::account::list_account_transfers,
        crate::gateway::handlers::transfer::create_transfer,
    ),
    components(
        schemas(
            HealthResponse,
            SignupRequest,
            LoginRequest,
            AuthResponse,
            UserProfile,
            CreateAccountRequest,
            AccountStatusRequest,
            AccountView,
            Transaction,
            TransactionKind,
            Transfer,
            TransferIntent,
            TransferReceipt,
        )
    ),
    modifiers(&SecurityAddon, &MockAddon),
    tags(
        (name = "Auth", description = "Signup and login (no auth required)"),
        (name = "User", description = "User profiles (auth required)"),
        (name = "Account", description = "Accounts and their history (auth required)"),
        (name = "Transfer", description = "Peer-to-peer transfers (auth required)"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Minibank API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("Minibank API"));
        assert!(json.contains("bearer_auth"));
    }

    #[test]
    fn test_endpoints_registered() {
        let paths = ApiDoc::openapi().paths.paths;
        for path in [
            "/health",
            "/signup",
            "/login",
            "/user",
            "/users",
            "/users/{id}",
            "/accounts",
            "/accounts/{id}",
            "/accounts/{id}/status",
            "/accounts/{id}/transactions",
            "/accounts/{id}/transfers",
            "/transfers",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }

    #[cfg(feature = "mock-api")]
    #[test]
    fn test_mock_endpoint_documented_with_feature() {
        let paths = ApiDoc::openapi().paths.paths;
        assert!(paths.contains_key("/internal/mock/deposit"));
    }
}
