//! In-process router tests for the paths that are decided before any query runs

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use library_server::{
    api,
    config::AppConfig,
    models::{Role, UserClaims},
    repository::Repository,
    AppState,
};

fn app() -> (Router, AppConfig) {
    let config = AppConfig::default();
    // Never connected: these requests are all answered before touching the database
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .expect("lazy pool");
    let state = AppState::new(config.clone(), Repository::new(pool));
    (api::router(state), config)
}

fn token(config: &AppConfig, role: Role) -> String {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: "42".to_string(),
        user_id: 42,
        email: "reader@example.org".to_string(),
        role,
        exp: now + 3600,
        iat: now,
    }
    .create_token(&config.auth.jwt_secret)
    .expect("token")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let (app, _) = app();
    let (status, body) = send(app, get("/api/v1/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn protected_route_requires_bearer_token() {
    let (app, _) = app();
    let (status, body) = send(app, get("/api/v1/auth/me")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");
    assert_eq!(body["code"], 2);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let (app, _) = app();
    let (status, _) = send(app, get_with_token("/api/v1/favorites", "not.a.jwt")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_other_secret_is_rejected() {
    let (app, config) = app();
    let mut other = config.clone();
    other.auth.jwt_secret = "some-other-secret".to_string();

    let (status, _) = send(app, get_with_token("/api/v1/stats", &token(&other, Role::Admin))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn members_cannot_reach_admin_routes() {
    for uri in ["/api/v1/stats", "/api/v1/members", "/api/v1/transactions"] {
        let (app, config) = app();
        let (status, body) = send(app, get_with_token(uri, &token(&config, Role::Member))).await;

        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body["error"], "NotAuthorized");
    }
}

#[tokio::test]
async fn unknown_sort_key_is_a_bad_request() {
    let (app, _) = app();
    let (status, body) = send(app, get("/api/v1/books?sort_by=isbn%3B%20DROP%20TABLE%20books")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("sort_by"), "{}", message);
}

#[tokio::test]
async fn unknown_sort_order_is_a_bad_request() {
    let (app, _) = app();
    let (status, body) = send(app, get("/api/v1/books?order=sideways")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn register_validates_body_before_storing() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "not-an-email", "password": "123", "name": "Ann" }).to_string(),
        ))
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn mistyped_json_field_gets_error_body() {
    let (app, _) = app();
    let request = post_json(
        "/api/v1/auth/register",
        &json!({ "email": "ann@example.org", "password": 123456, "name": "Ann" }).to_string(),
    );

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert_eq!(body["code"], 6);
    assert!(body["message"].as_str().unwrap_or_default().contains("password"));
}

#[tokio::test]
async fn broken_json_syntax_gets_error_body() {
    let (app, _) = app();
    let (status, body) = send(app, post_json("/api/v1/auth/login", "{\"email\": ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn missing_content_type_gets_error_body() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .body(Body::from(json!({ "email": "a@b.c", "password": "x" }).to_string()))
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn non_numeric_query_value_gets_error_body() {
    let (app, _) = app();
    let (status, body) = send(app, get("/api/v1/books?page=first")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn non_numeric_id_gets_error_body() {
    let (app, _) = app();
    let (status, body) = send(app, get("/api/v1/books/seven")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _) = app();
    let (status, body) = send(app, get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/borrow-requests/{id}"].is_object());
}
