//! API integration tests
//!
//! The router is wired to the in-memory store, so the whole suite runs
//! without external services. Each test builds its own router; requests
//! share state through the cloned `Router` handles.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::Engine;
use serde_json::{json, Value};
use tower::ServiceExt;
use warden_api::create_router_for_testing;
use warden_core::config::AuthConfig;

// =============================================================================
// Helpers
// =============================================================================

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn basic_request(method: &str, uri: &str, email: &str, password: &str) -> Request<Body> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{email}:{password}"));

    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Basic {encoded}"))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}

async fn register(app: &Router, username: &str, email: &str, password: &str) -> String {
    let request = json_request(
        "POST",
        "/api/v1/register",
        None,
        Some(json!({ "username": username, "email": email, "password": password })),
    );

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn register_admin(app: &Router, username: &str, email: &str, password: &str) -> String {
    let request = json_request(
        "POST",
        "/api/v1/register",
        None,
        Some(json!({
            "username": username,
            "email": email,
            "password": password,
            "admin_password": AuthConfig::default().admin_secret,
        })),
    );

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::CREATED, "admin registration failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    let request = json_request(
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "email": email, "password": password })),
    );

    send(app, request).await
}

fn unauthorised_body() -> Value {
    json!({ "error": "Unauthorised", "message": "Invalid credentials." })
}

// =============================================================================
// Health and counters
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = create_router_for_testing();

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["uptime_seconds"].is_number());
    assert!(body["total_requests"].is_number());
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_returns_token() {
    let app = create_router_for_testing();

    let request = json_request(
        "POST",
        "/api/v1/register",
        None,
        Some(json!({ "username": "alice", "email": "alice@x.com", "password": "pw1" })),
    );

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_duplicate_email_is_ambiguous() {
    let app = create_router_for_testing();
    register(&app, "alice", "alice@x.com", "pw1").await;

    // Different username and password, same email
    let request = json_request(
        "POST",
        "/api/v1/register",
        None,
        Some(json!({ "username": "intruder", "email": "alice@x.com", "password": "other" })),
    );

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(body["message"], "Registration failed.");
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let app = create_router_for_testing();

    let request = json_request(
        "POST",
        "/api/v1/register",
        None,
        Some(json!({ "username": "alice", "email": "not-an-email", "password": "pw1" })),
    );

    let (status, _body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    let app = create_router_for_testing();
    register(&app, "alice", "alice@x.com", "pw1").await;

    let (status, body) = login(&app, "alice@x.com", "pw1").await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = create_router_for_testing();
    register(&app, "alice", "alice@x.com", "pw1").await;

    let (wrong_pw_status, wrong_pw_body) = login(&app, "alice@x.com", "wrong").await;
    let (no_user_status, no_user_body) = login(&app, "nobody@x.com", "pw1").await;

    // Wrong password and unknown account answer identically
    assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
    assert_eq!(no_user_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw_body, no_user_body);
    assert_eq!(wrong_pw_body, unauthorised_body());
}

// =============================================================================
// Request authentication schemes
// =============================================================================

#[tokio::test]
async fn test_me_requires_credentials() {
    let app = create_router_for_testing();

    let request = Request::builder()
        .uri("/api/v1/users/me")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorised_body());
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let app = create_router_for_testing();
    let token = register(&app, "alice", "alice@x.com", "pw1").await;

    let request = json_request("GET", "/api/v1/users/me", Some(&token), None);
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@x.com");
    assert!(body["last_login"].is_string());
    assert!(body.get("password_hash").is_none());
    assert!(body.get("role_name").is_none());
}

#[tokio::test]
async fn test_me_with_basic_credentials() {
    let app = create_router_for_testing();
    register(&app, "alice", "alice@x.com", "pw1").await;

    let request = basic_request("GET", "/api/v1/users/me", "alice@x.com", "pw1");
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn test_invalid_bearer_token_rejected() {
    let app = create_router_for_testing();
    register(&app, "alice", "alice@x.com", "pw1").await;

    let request = json_request("GET", "/api/v1/users/me", Some("not.a.token"), None);
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorised_body());
}

#[tokio::test]
async fn test_expired_token_rejected() {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};
    use warden_api::auth::TokenClaims;

    let app = create_router_for_testing();
    register(&app, "alice", "alice@x.com", "pw1").await;

    let config = AuthConfig::default();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    // Correctly signed, correct issuer, expired well past validation leeway
    let claims = TokenClaims {
        iss: config.issuer.clone(),
        sub: 1,
        email: "alice@x.com".to_string(),
        password_hash: "irrelevant".to_string(),
        iat: now - 7200,
        exp: now - 3600,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .unwrap();

    let request = json_request("GET", "/api/v1/users/me", Some(&token), None);
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorised_body());
}

// =============================================================================
// Revocation by credential change
// =============================================================================

#[tokio::test]
async fn test_password_change_revokes_outstanding_tokens() {
    let app = create_router_for_testing();

    // Register and sign in
    register(&app, "alice", "a@x.com", "pw1").await;
    let (status, body) = login(&app, "a@x.com", "pw1").await;
    assert_eq!(status, StatusCode::OK);
    let old_token = body["token"].as_str().unwrap().to_string();

    // Change own password through self-update
    let request = json_request(
        "PUT",
        "/api/v1/users/me",
        Some(&old_token),
        Some(json!({ "password": "pw2" })),
    );
    let (status, _body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The pre-change token is dead
    let request = json_request("GET", "/api/v1/users/me", Some(&old_token), None);
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorised_body());

    // The old password no longer signs in; the new one does
    let (status, _) = login(&app, "a@x.com", "pw1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = login(&app, "a@x.com", "pw2").await;
    assert_eq!(status, StatusCode::OK);

    // And the freshly issued token works
    let new_token = body["token"].as_str().unwrap().to_string();
    let request = json_request("GET", "/api/v1/users/me", Some(&new_token), None);
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Update scope and whitelists
// =============================================================================

#[tokio::test]
async fn test_update_with_no_updatable_fields_is_rejected() {
    let app = create_router_for_testing();
    let token = register(&app, "alice", "a@x.com", "pw1").await;

    for body in [json!({}), json!({ "username": "", "password": "" })] {
        let request = json_request("PUT", "/api/v1/users/me", Some(&token), Some(body));
        let (status, response) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Bad Request");
        let message = response["message"].as_str().unwrap();
        assert!(message.contains("username, password"), "message: {message}");
    }
}

#[tokio::test]
async fn test_self_update_cannot_change_role() {
    let app = create_router_for_testing();
    let user_token = register(&app, "alice", "a@x.com", "pw1").await;
    let admin_token = register_admin(&app, "root", "root@x.com", "adminpw").await;

    // Role alone: nothing in the whitelist was supplied
    let request = json_request(
        "PUT",
        "/api/v1/users/me",
        Some(&user_token),
        Some(json!({ "role": "admin" })),
    );
    let (status, _body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Role next to a whitelisted field: the update succeeds, the role is
    // silently untouched
    let request = json_request(
        "PUT",
        "/api/v1/users/me",
        Some(&user_token),
        Some(json!({ "username": "alice2", "role": "admin" })),
    );
    let (status, _body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let request = json_request("GET", "/api/v1/users/1", Some(&admin_token), None);
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice2");
    assert_eq!(body["role_name"], "user");
}

#[tokio::test]
async fn test_admin_update_can_change_role() {
    let app = create_router_for_testing();
    register(&app, "alice", "a@x.com", "pw1").await;
    let admin_token = register_admin(&app, "root", "root@x.com", "adminpw").await;

    let request = json_request(
        "PUT",
        "/api/v1/users/1",
        Some(&admin_token),
        Some(json!({ "role": "admin" })),
    );
    let (status, _body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let request = json_request("GET", "/api/v1/users/1", Some(&admin_token), None);
    let (_, body) = send(&app, request).await;
    assert_eq!(body["role_name"], "admin");
}

#[tokio::test]
async fn test_user_cannot_update_other_account() {
    let app = create_router_for_testing();
    register(&app, "alice", "a@x.com", "pw1").await;
    let bob_token = register(&app, "bob", "b@x.com", "pw2").await;

    let request = json_request(
        "PUT",
        "/api/v1/users/1",
        Some(&bob_token),
        Some(json!({ "username": "hacked" })),
    );
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorised_body());
}

#[tokio::test]
async fn test_admin_update_missing_account_is_404() {
    let app = create_router_for_testing();
    let admin_token = register_admin(&app, "root", "root@x.com", "adminpw").await;

    let request = json_request(
        "PUT",
        "/api/v1/users/999",
        Some(&admin_token),
        Some(json!({ "username": "ghost" })),
    );
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User does not exist.");
}

// =============================================================================
// Retrieval scope and projections
// =============================================================================

#[tokio::test]
async fn test_user_retrieving_other_account_gets_401_not_404() {
    let app = create_router_for_testing();
    register(&app, "alice", "a@x.com", "pw1").await;
    let bob_token = register(&app, "bob", "b@x.com", "pw2").await;

    // Existing id: scope check fires first
    let request = json_request("GET", "/api/v1/users/1", Some(&bob_token), None);
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorised_body());

    // Nonexistent id: identical answer, existence is not leaked
    let request = json_request("GET", "/api/v1/users/999", Some(&bob_token), None);
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorised_body());
}

#[tokio::test]
async fn test_admin_retrieve_expanded_projection() {
    let app = create_router_for_testing();
    register(&app, "alice", "a@x.com", "pw1").await;
    let admin_token = register_admin(&app, "root", "root@x.com", "adminpw").await;

    let request = json_request("GET", "/api/v1/users/1", Some(&admin_token), None);
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role_name"], "user");
    assert!(body["last_login"].is_string());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_admin_retrieve_missing_account_is_404() {
    let app = create_router_for_testing();
    let admin_token = register_admin(&app, "root", "root@x.com", "adminpw").await;

    let request = json_request("GET", "/api/v1/users/999", Some(&admin_token), None);
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn test_target_must_be_me_or_integer() {
    let app = create_router_for_testing();
    let token = register(&app, "alice", "a@x.com", "pw1").await;

    let request = json_request("GET", "/api/v1/users/someone", Some(&token), None);
    let (status, _body) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_projection_is_scoped_by_role() {
    let app = create_router_for_testing();
    let user_token = register(&app, "alice", "a@x.com", "pw1").await;
    let admin_token = register_admin(&app, "root", "root@x.com", "adminpw").await;

    // User role: reduced projection, no email, no role
    let request = json_request("GET", "/api/v1/users", Some(&user_token), None);
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    for item in items {
        assert!(item["id"].is_number());
        assert!(item["username"].is_string());
        assert!(item["last_login"].is_string());
        assert!(item.get("email").is_none());
        assert!(item.get("role_name").is_none());
    }

    // Admin role: expanded projection
    let request = json_request("GET", "/api/v1/users", Some(&admin_token), None);
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    for item in items {
        assert!(item["email"].is_string());
        assert!(item["role_name"].is_string());
        assert!(item.get("password_hash").is_none());
    }
}

// =============================================================================
// Deletion
// =============================================================================

#[tokio::test]
async fn test_self_delete_closes_the_account() {
    let app = create_router_for_testing();
    let token = register(&app, "alice", "a@x.com", "pw1").await;

    let request = json_request("DELETE", "/api/v1/users/me", Some(&token), None);
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "id": 1, "username": "alice" }]));

    // The account is gone for sign-in purposes
    let (status, _) = login(&app, "a@x.com", "pw1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // And the token died with it
    let request = json_request("GET", "/api/v1/users/me", Some(&token), None);
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_cannot_delete_by_id_or_in_bulk() {
    let app = create_router_for_testing();
    register(&app, "alice", "a@x.com", "pw1").await;
    let bob_token = register(&app, "bob", "b@x.com", "pw2").await;

    let request = json_request("DELETE", "/api/v1/users/1", Some(&bob_token), None);
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorised_body());

    let request = json_request(
        "DELETE",
        "/api/v1/users",
        Some(&bob_token),
        Some(json!({ "users": [{ "id": 1 }] })),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorised_body());
}

#[tokio::test]
async fn test_admin_single_delete() {
    let app = create_router_for_testing();
    register(&app, "alice", "a@x.com", "pw1").await;
    let admin_token = register_admin(&app, "root", "root@x.com", "adminpw").await;

    let request = json_request("DELETE", "/api/v1/users/1", Some(&admin_token), None);
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "id": 1, "username": "alice" }]));

    // Second attempt: the row is gone
    let request = json_request("DELETE", "/api/v1/users/1", Some(&admin_token), None);
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_bulk_delete_returns_removed_pairs() {
    let app = create_router_for_testing();

    // Five regular accounts, ids 1..=5
    for i in 1..=5 {
        register(&app, &format!("u{i}"), &format!("u{i}@x.com"), "pw").await;
    }
    let admin_token = register_admin(&app, "root", "root@x.com", "adminpw").await;

    let request = json_request(
        "DELETE",
        "/api/v1/users",
        Some(&admin_token),
        Some(json!({ "users": [{ "id": 1 }, { "id": 3 }] })),
    );
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "id": 1, "username": "u1" },
            { "id": 3, "username": "u3" },
        ])
    );

    // Deleted accounts can no longer sign in
    let (status, _) = login(&app, "u1@x.com", "pw").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&app, "u3@x.com", "pw").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The others are untouched
    let (status, _) = login(&app, "u2@x.com", "pw").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bulk_delete_with_unknown_ids_reports_only_removed_rows() {
    let app = create_router_for_testing();
    register(&app, "alice", "a@x.com", "pw1").await;
    let admin_token = register_admin(&app, "root", "root@x.com", "adminpw").await;

    let request = json_request(
        "DELETE",
        "/api/v1/users",
        Some(&admin_token),
        Some(json!({ "users": [{ "id": 1 }, { "id": 42 }] })),
    );
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "id": 1, "username": "alice" }]));
}

#[tokio::test]
async fn test_bulk_delete_validates_the_id_list_before_deleting() {
    let app = create_router_for_testing();
    register(&app, "alice", "a@x.com", "pw1").await;
    let admin_token = register_admin(&app, "root", "root@x.com", "adminpw").await;

    for body in [
        json!({ "users": [{ "id": "1" }] }),
        json!({ "users": "1,3" }),
        json!({ "ids": [1, 3] }),
        json!({ "users": [] }),
    ] {
        let request = json_request("DELETE", "/api/v1/users", Some(&admin_token), Some(body));
        let (status, response) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "got: {response}");
        assert_eq!(response["error"], "Bad Request");
    }

    // Nothing was deleted along the way
    let request = json_request("GET", "/api/v1/users", Some(&admin_token), None);
    let (_, body) = send(&app, request).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

// =============================================================================
// Full scenario
// =============================================================================

#[tokio::test]
async fn test_register_login_change_password_old_token_dies() {
    let app = create_router_for_testing();

    // Register A -> 201 with token
    let register_token = register(&app, "a", "a@x.com", "pw1").await;
    assert!(!register_token.is_empty());

    // Login A with pw1 -> 200 with a fresh token
    let (status, body) = login(&app, "a@x.com", "pw1").await;
    assert_eq!(status, StatusCode::OK);
    let login_token = body["token"].as_str().unwrap().to_string();

    // Change A's password to pw2 via self-update -> 204
    let request = json_request(
        "PUT",
        "/api/v1/users/me",
        Some(&login_token),
        Some(json!({ "password": "pw2" })),
    );
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Both pre-change tokens now answer 401 on a protected endpoint
    for stale in [&register_token, &login_token] {
        let request = json_request("GET", "/api/v1/users/me", Some(stale), None);
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, unauthorised_body());
    }
}
