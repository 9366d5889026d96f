pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use crate::user_auth::{handlers as auth_handlers, middleware::jwt_auth_middleware};
use state::AppState;

/// Build the full router: public routes, bearer routes, docs
pub fn create_app(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/signup", post(auth_handlers::signup))
        .route("/login", post(auth_handlers::login));

    let private_routes = Router::new()
        .route("/user", get(auth_handlers::current_user))
        .route("/users", get(auth_handlers::list_users))
        .route("/users/{id}", get(auth_handlers::get_user))
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route("/accounts/{id}", get(handlers::get_account))
        .route("/accounts/{id}/status", put(handlers::set_account_status))
        .route(
            "/accounts/{id}/transactions",
            get(handlers::list_account_transactions),
        )
        .route(
            "/accounts/{id}/transfers",
            get(handlers::list_account_transfers),
        )
        .route("/transfers", post(handlers::create_transfer))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let app = Router::new().merge(public_routes).merge(private_routes);

    #[cfg(feature = "mock-api")]
    let app = app.nest(
        "/internal/mock",
        Router::new().route("/deposit", post(handlers::mock_deposit)),
    );

    app.with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Start HTTP Gateway server
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_app(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {}: {} (port {} may already be in use)",
            addr,
            e,
            config.port
        )
    })?;

    tracing::info!(%addr, storage = state.store.name(), "Gateway listening");
    tracing::info!("API Docs: http://{}/docs", addr);
    #[cfg(feature = "mock-api")]
    tracing::warn!("mock-api enabled: POST /internal/mock/deposit is open");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
