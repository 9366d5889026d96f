use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use minibank::config::AppConfig;
use minibank::gateway::{create_app, state::AppState};
use minibank::store::MemoryStore;

const CONFIG_YAML: &str = r#"
log_level: info
log_dir: logs
log_file: test.log
use_json: false
rotation: never
gateway:
  host: 127.0.0.1
  port: 0
storage:
  backend: memory
  postgres_url: ""
  max_connections: 1
  acquire_timeout_secs: 1
auth:
  jwt_secret: test-secret
  token_ttl_secs: 3600
"#;

fn app() -> Router {
    let config: AppConfig = serde_yaml::from_str(CONFIG_YAML).unwrap();
    let state = Arc::new(AppState::new(Arc::new(MemoryStore::new()), &config));
    create_app(state)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Sign up and log in, returning the bearer token
async fn register(app: &Router, name: &str) -> String {
    let email = format!("{}@example.com", name);
    let (status, _) = call(
        app,
        "POST",
        "/signup",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "age": 30,
            "password": "password123",
            "phone_number": "99119911"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        app,
        "POST",
        "/login",
        None,
        Some(json!({ "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

/// Open an account and return (id, account_number)
async fn open_account(app: &Router, token: &str) -> (i64, String) {
    let (status, body) = call(app, "POST", "/accounts", Some(token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    (
        body["data"]["id"].as_i64().unwrap(),
        body["data"]["account_number"].as_str().unwrap().to_string(),
    )
}

async fn deposit(app: &Router, number: &str, amount: i64) {
    let (status, _) = call(
        app,
        "POST",
        "/internal/mock/deposit",
        None,
        Some(json!({ "account_number": number, "amount": amount })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["storage"], "memory");
}

#[tokio::test]
async fn test_signup_duplicate_and_login_errors() {
    let app = app();
    register(&app, "saraa").await;

    let (status, body) = call(
        &app,
        "POST",
        "/signup",
        None,
        Some(json!({ "name": "x", "email": "saraa@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_ne!(body["code"], 0);

    let (status, _) = call(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "email": "saraa@example.com", "password": "nope-nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_required() {
    let app = app();
    let (status, _) = call(&app, "GET", "/accounts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/accounts", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_and_users() {
    let app = app();
    let token = register(&app, "bold").await;

    let (status, body) = call(&app, "GET", "/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "bold@example.com");
    assert!(body["data"].get("password_hash").is_none());

    let id = body["data"]["id"].as_i64().unwrap();
    let (status, _) = call(&app, "GET", &format!("/users/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "GET", "/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = call(&app, "GET", "/users/999", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_account_lifecycle() {
    let app = app();
    let token = register(&app, "bold").await;
    let other = register(&app, "tuya").await;

    let (status, body) = call(
        &app,
        "POST",
        "/accounts",
        Some(&token),
        Some(json!({ "currency": "usd", "limit": 5000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["currency"], "USD");
    assert_eq!(body["data"]["balance"], 0);
    assert_eq!(body["data"]["account_number"].as_str().unwrap().len(), 7);
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(&app, "GET", "/accounts", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Someone else's account looks absent
    let (status, _) = call(&app, "GET", &format!("/accounts/{}", id), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        "PUT",
        &format!("/accounts/{}/status", id),
        Some(&token),
        Some(json!({ "active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);

    let (status, _) = call(
        &app,
        "POST",
        "/accounts",
        Some(&token),
        Some(json!({ "limit": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transfer_flow() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let (a_id, a_number) = open_account(&app, &alice).await;
    let (b_id, b_number) = open_account(&app, &bob).await;
    deposit(&app, &a_number, 100).await;

    let (status, body) = call(
        &app,
        "POST",
        "/transfers",
        Some(&alice),
        Some(json!({
            "amount": 40,
            "sender_account": a_number,
            "receiver_account": b_number,
            "description": "lunch"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["sender_balance"], 60);

    let (_, body) = call(&app, "GET", &format!("/accounts/{}", b_id), Some(&bob), None).await;
    assert_eq!(body["data"]["balance"], 40);

    let (_, body) = call(
        &app,
        "GET",
        &format!("/accounts/{}/transactions", a_id),
        Some(&alice),
        None,
    )
    .await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["type"], "transfer_out");
    assert_eq!(entries[1]["type"], "deposit");

    let (_, body) = call(
        &app,
        "GET",
        &format!("/accounts/{}/transfers", b_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["sender"], a_number);
}

#[tokio::test]
async fn test_transfer_error_statuses() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let (_, a_number) = open_account(&app, &alice).await;
    let (_, b_number) = open_account(&app, &bob).await;
    deposit(&app, &a_number, 30).await;

    let cases = [
        (json!({ "amount": "abc", "sender_account": a_number, "receiver_account": b_number }), StatusCode::BAD_REQUEST),
        (json!({ "amount": 0, "sender_account": a_number, "receiver_account": b_number }), StatusCode::BAD_REQUEST),
        (json!({ "amount": 10, "receiver_account": b_number }), StatusCode::BAD_REQUEST),
        (json!({ "amount": 10, "sender_account": b_number, "receiver_account": a_number }), StatusCode::NOT_FOUND),
        (json!({ "amount": 10, "sender_account": a_number, "receiver_account": "12" }), StatusCode::NOT_FOUND),
        (json!({ "amount": 10, "sender_account": a_number, "receiver_account": a_number }), StatusCode::BAD_REQUEST),
        (json!({ "amount": 40, "sender_account": a_number, "receiver_account": b_number }), StatusCode::CONFLICT),
        (json!({ "sender_account": a_number }), StatusCode::BAD_REQUEST),
    ];

    for (body, expected) in cases {
        let (status, response) = call(&app, "POST", "/transfers", Some(&alice), Some(body.clone())).await;
        assert_eq!(status, expected, "{body}: {response}");
        assert_ne!(response["code"], 0);
    }
}
