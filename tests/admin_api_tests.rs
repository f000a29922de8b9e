//! Integration tests for the Admin API endpoints.
//!
//! These tests require the `admin-api` feature to be enabled.

#![cfg(feature = "admin-api")]

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use guildkey::config::DatabaseConfig;
use guildkey::server::database::Database;
use guildkey::server::handlers::AppState;
use guildkey::server::routes::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper to create an in-memory store and app state.
async fn setup_test_app() -> AppState {
    let db = Database::connect(&DatabaseConfig::sqlite_in_memory())
        .await
        .expect("failed to create database");
    db.migrate().await.expect("failed to migrate");

    AppState::new(db)
}

/// Helper to make a JSON request to the app.
async fn json_request(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body_bytes = body
        .map(|v| serde_json::to_vec(&v).unwrap())
        .unwrap_or_default();

    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body_bytes))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

async fn create_key(state: &AppState, client_name: &str) -> Value {
    let (status, body) = json_request(
        build_router(state.clone()),
        "POST",
        "/api/v1/keys",
        Some(json!({ "client_name": client_name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn toggle(state: &AppState, id: i64) -> (StatusCode, Value) {
    json_request(
        build_router(state.clone()),
        "POST",
        &format!("/api/v1/keys/{id}/toggle"),
        None,
    )
    .await
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn create_key_returns_created() {
    let state = setup_test_app().await;

    let body = create_key(&state, "Acme").await;

    assert!(body["id"].as_i64().is_some());
    assert_eq!(body["key"].as_str().unwrap().len(), 36);
    assert_eq!(body["client_name"], "Acme");
    assert_eq!(body["is_active"], true);
    assert_eq!(body["is_bound"], false);
    assert!(body["bound_server_id"].is_null());
    assert!(body["created_at"].as_str().is_some());
}

#[tokio::test]
async fn create_key_trims_client_name() {
    let state = setup_test_app().await;

    let body = create_key(&state, "   Acme Guild  ").await;

    assert_eq!(body["client_name"], "Acme Guild");
}

#[tokio::test]
async fn create_key_defaults_blank_name_to_unnamed() {
    let state = setup_test_app().await;

    let body = create_key(&state, "   ").await;
    assert_eq!(body["client_name"], "Unnamed");

    let (status, body) = json_request(
        build_router(state.clone()),
        "POST",
        "/api/v1/keys",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["client_name"], "Unnamed");
}

#[tokio::test]
async fn create_key_without_body_uses_defaults() {
    let state = setup_test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/keys")
        .body(Body::empty())
        .unwrap();
    let response = build_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["client_name"], "Unnamed");
}

#[tokio::test]
async fn create_key_rejects_overlong_name() {
    let state = setup_test_app().await;

    let (status, body) = json_request(
        build_router(state),
        "POST",
        "/api/v1/keys",
        Some(json!({ "client_name": "x".repeat(201) })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

// =============================================================================
// Read
// =============================================================================

#[tokio::test]
async fn list_keys_newest_first() {
    let state = setup_test_app().await;
    let first = create_key(&state, "first").await;
    let second = create_key(&state, "second").await;

    let (status, body) =
        json_request(build_router(state), "GET", "/api/v1/keys", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let keys = body["keys"].as_array().unwrap();
    assert_eq!(keys[0]["id"], second["id"]);
    assert_eq!(keys[1]["id"], first["id"]);
}

#[tokio::test]
async fn list_keys_empty() {
    let state = setup_test_app().await;

    let (status, body) =
        json_request(build_router(state), "GET", "/api/v1/keys", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["keys"], json!([]));
}

#[tokio::test]
async fn get_key_shows_binding() {
    let state = setup_test_app().await;
    let created = create_key(&state, "Acme").await;
    let id = created["id"].as_i64().unwrap();

    state
        .db
        .bind_server(created["key"].as_str().unwrap(), "S1")
        .await
        .unwrap();

    let (status, body) = json_request(
        build_router(state),
        "GET",
        &format!("/api/v1/keys/{id}"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bound_server_id"], "S1");
    assert_eq!(body["is_bound"], true);
}

#[tokio::test]
async fn get_unknown_key_is_not_found() {
    let state = setup_test_app().await;

    let (status, body) =
        json_request(build_router(state), "GET", "/api/v1/keys/999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn non_numeric_id_is_bad_request() {
    let state = setup_test_app().await;

    let (status, _) =
        json_request(build_router(state), "GET", "/api/v1/keys/abc", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Toggle / Delete
// =============================================================================

#[tokio::test]
async fn toggle_flips_active_flag() {
    let state = setup_test_app().await;
    let created = create_key(&state, "Acme").await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = toggle(&state, id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, body) = toggle(&state, id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
async fn toggle_unknown_key_is_not_found() {
    let state = setup_test_app().await;

    let (status, body) = toggle(&state, 404).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn delete_requires_deactivation() {
    let state = setup_test_app().await;
    let created = create_key(&state, "Acme").await;
    let id = created["id"].as_i64().unwrap();
    let uri = format!("/api/v1/keys/{id}");

    let (status, body) = json_request(build_router(state.clone()), "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    toggle(&state, id).await;

    let (status, body) = json_request(build_router(state.clone()), "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, _) = json_request(build_router(state), "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_unknown_key_is_not_found() {
    let state = setup_test_app().await;

    let (status, body) =
        json_request(build_router(state), "DELETE", "/api/v1/keys/31337", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn deleted_key_no_longer_validates() {
    let state = setup_test_app().await;
    let created = create_key(&state, "Acme").await;
    let id = created["id"].as_i64().unwrap();
    let key = created["key"].as_str().unwrap().to_string();

    let (status, _) = json_request(
        build_router(state.clone()),
        "POST",
        "/validate_key",
        Some(json!({ "key": key, "server_id": "S1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    toggle(&state, id).await;
    json_request(
        build_router(state.clone()),
        "DELETE",
        &format!("/api/v1/keys/{id}"),
        None,
    )
    .await;

    let (status, body) = json_request(
        build_router(state),
        "POST",
        "/validate_key",
        Some(json!({ "key": key, "server_id": "S1" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INVALID_KEY");
}
