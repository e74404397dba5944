// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;
use vidtube_accounts::config::Config;
use vidtube_accounts::db::{FirestoreDb, MemoryStore};
use vidtube_accounts::routes::create_router;
use vidtube_accounts::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by a fresh in-memory store.
/// Returns the router, the shared state and the store for seeding.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>, MemoryStore) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>, MemoryStore) {
    let store = MemoryStore::new();
    let shared = Arc::new(store.clone());
    let state = Arc::new(AppState::new(config, shared.clone(), shared));
    (create_router(state.clone()), state, store)
}

/// Create a test app whose database is offline; every store call fails.
#[allow(dead_code)]
pub fn create_offline_test_app() -> Router {
    let db = Arc::new(FirestoreDb::new_mock());
    let state = Arc::new(AppState::new(Config::test_default(), db.clone(), db));
    create_router(state)
}

/// Build a JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All `Set-Cookie` header values on a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// The `Set-Cookie` header for `name`.
#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// A registered and logged-in user.
#[allow(dead_code)]
pub struct TestSession {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Register `username` with password `hunter2!` and log in.
#[allow(dead_code)]
pub async fn register_and_login(app: &Router, username: &str) -> TestSession {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/register",
            serde_json::json!({
                "fullName": format!("{username} Tester"),
                "email": format!("{username}@example.com"),
                "password": "hunter2!",
                "username": username,
                "avatar": format!("https://cdn.example.com/{username}.png"),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 201, "registration failed");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            serde_json::json!({ "username": username, "password": "hunter2!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "login failed");

    let body = body_json(response).await;
    TestSession {
        user_id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
        access_token: body["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh_token: body["data"]["refreshToken"].as_str().unwrap().to_string(),
    }
}
