//! API tests against a running server
//!
//! Start the server with a bootstrap administrator, then run:
//! `LIBRARY_BOOTSTRAP_ADMIN_EMAIL=... LIBRARY_BOOTSTRAP_ADMIN_PASSWORD=... cargo test -- --ignored`

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn admin_credentials() -> (String, String) {
    (
        std::env::var("LIBRARY_BOOTSTRAP_ADMIN_EMAIL").unwrap_or_else(|_| "admin@library.local".into()),
        std::env::var("LIBRARY_BOOTSTRAP_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into()),
    )
}

async fn login(client: &Client, email: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn admin_token(client: &Client) -> String {
    let (email, password) = admin_credentials();
    login(client, &email, &password).await
}

/// Register a throwaway member and return its token
async fn member_token(client: &Client) -> String {
    let email = format!("member-{}@example.org", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "email": email, "password": "reader-pass", "name": "Test Reader" }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn create_book(client: &Client, token: &str, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": "The Left Hand of Darkness",
            "author": "Ursula K. Le Guin",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No book id")
}

async fn available_copies(client: &Client, book_id: i64) -> i64 {
    let body: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to get book")
        .json()
        .await
        .expect("Failed to parse response");
    body["available_copies"].as_i64().expect("No available_copies")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();
    let (email, password) = admin_credentials();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["role"], "ADMIN");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();
    let (email, _) = admin_credentials();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_catalog_pagination_envelope() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books?per_page=5&sort_by=title&order=desc", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"].is_array());
    assert_eq!(body["pagination"]["per_page"], 5);
    assert!(body["pagination"]["total_pages"].is_i64());
}

#[tokio::test]
#[ignore]
async fn test_borrow_request_lifecycle() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    // Member asks for the only copy
    let response = client
        .post(format!("{}/borrow-requests", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let request: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(request["status"], "PENDING");
    let request_id = request["id"].as_i64().expect("No request id");

    // Second open request for the same book
    let response = client
        .post(format!("{}/borrow-requests", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Approve takes the copy off the shelf
    let response = client
        .patch(format!("{}/borrow-requests/{}", BASE_URL, request_id))
        .bearer_auth(&admin)
        .json(&json!({ "status": "APPROVED" }))
        .send()
        .await
        .expect("Failed to approve");
    assert_eq!(response.status(), StatusCode::OK);
    let approved: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(approved["status"], "APPROVED");
    assert!(approved["due_date"].is_string());
    assert_eq!(available_copies(&client, book_id).await, 0);

    // Approving twice is not a valid transition
    let response = client
        .patch(format!("{}/borrow-requests/{}", BASE_URL, request_id))
        .bearer_auth(&admin)
        .json(&json!({ "status": "APPROVED" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Member renews once
    let response = client
        .post(format!("{}/borrow-requests/{}/renew", BASE_URL, request_id))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to renew");
    assert_eq!(response.status(), StatusCode::OK);
    let renewed: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(renewed["renewal_count"], 1);

    // Return puts it back
    let response = client
        .patch(format!("{}/borrow-requests/{}", BASE_URL, request_id))
        .bearer_auth(&admin)
        .json(&json!({ "status": "RETURNED", "admin_response": "Good condition" }))
        .send()
        .await
        .expect("Failed to return");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(available_copies(&client, book_id).await, 1);

    // The circulation log holds issue, renewal and return
    let history: Value = client
        .get(format!("{}/transactions/mine?sort_by=transaction_date&order=asc", BASE_URL))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to list transactions")
        .json()
        .await
        .expect("Failed to parse response");
    let kinds: Vec<&str> = history["data"]
        .as_array()
        .expect("data array")
        .iter()
        .filter_map(|t| t["kind"].as_str())
        .collect();
    assert_eq!(kinds, vec!["ISSUE", "RENEWAL", "RETURN"]);
}

#[tokio::test]
#[ignore]
async fn test_favorites_are_idempotent() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client).await;
    let book_id = create_book(&client, &admin, 2).await;

    let url = format!("{}/favorites/{}", BASE_URL, book_id);
    let first = client.post(&url).bearer_auth(&member).send().await.expect("add");
    assert_eq!(first.status(), StatusCode::CREATED);
    let second = client.post(&url).bearer_auth(&member).send().await.expect("add again");
    assert_eq!(second.status(), StatusCode::OK);

    let removed = client.delete(&url).bearer_auth(&member).send().await.expect("remove");
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);
    let missing = client.delete(&url).bearer_auth(&member).send().await.expect("remove again");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_deactivated_member_loses_access() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let email = format!("inactive-{}@example.org", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let registered: Value = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "email": email, "password": "reader-pass", "name": "Soon Inactive" }))
        .send()
        .await
        .expect("Failed to register")
        .json()
        .await
        .expect("Failed to parse response");
    let member = registered["token"].as_str().expect("No token").to_string();
    let member_id = registered["user"]["id"].as_i64().expect("No user id");

    let response = client
        .put(format!("{}/members/{}", BASE_URL, member_id))
        .bearer_auth(&admin)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .expect("Failed to deactivate");
    assert_eq!(response.status(), StatusCode::OK);

    // The token was issued before deactivation
    let book_id = create_book(&client, &admin, 1).await;
    let response = client
        .post(format!("{}/borrow-requests", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
#[ignore]
async fn test_demoted_admin_loses_admin_routes() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let email = format!("staff-{}@example.org", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let created: Value = client
        .post(format!("{}/members", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({ "email": email, "password": "staff-pass", "name": "Staff", "role": "ADMIN" }))
        .send()
        .await
        .expect("Failed to create admin")
        .json()
        .await
        .expect("Failed to parse response");
    let staff_id = created["id"].as_i64().expect("No member id");
    let staff = login(&client, &email, "staff-pass").await;

    client
        .put(format!("{}/members/{}", BASE_URL, staff_id))
        .bearer_auth(&admin)
        .json(&json!({ "role": "member" }))
        .send()
        .await
        .expect("Failed to demote");

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
