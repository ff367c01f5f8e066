//! API handlers for the library REST endpoints

pub mod auth;
pub mod books;
pub mod borrow_requests;
pub mod categories;
mod extract;
pub mod favorites;
pub mod health;
pub mod members;
pub mod openapi;
pub mod stats;
pub mod transactions;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

pub use extract::{AppJson, AppPath, AppQuery};

/// Extractor for authenticated user from JWT token.
///
/// The account behind the token must still exist and be active; the role
/// comes from the stored account.
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = token_claims(parts, state)?;
        let claims = state.services.auth.session(claims).await?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Authenticated user holding the ADMIN role
pub struct AdminUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Member tokens are refused before the account lookup
        let claims = token_claims(parts, state)?;
        claims.require_admin()?;

        let claims = state.services.auth.session(claims).await?;
        claims.require_admin()?;
        Ok(AdminUser(claims))
    }
}

/// Caller identity on public endpoints. A missing header is anonymous,
/// a bad token is still rejected.
pub struct OptionalUser(pub Option<UserClaims>);

impl OptionalUser {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().map(UserClaims::is_admin).unwrap_or(false)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match parts.headers.get(AUTHORIZATION) {
            None => Ok(OptionalUser(None)),
            Some(value) => {
                let header = value.to_str().map_err(|_| {
                    AppError::Authentication("Invalid authorization header format".to_string())
                })?;
                let claims = bearer_claims(header, state)?;
                let claims = state.services.auth.session(claims).await?;
                Ok(OptionalUser(Some(claims)))
            }
        }
    }
}

fn token_claims(parts: &Parts, state: &AppState) -> Result<UserClaims, AppError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

    bearer_claims(auth_header, state)
}

fn bearer_claims(header: &str, state: &AppState) -> Result<UserClaims, AppError> {
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

    UserClaims::from_token(token.trim(), &state.config.auth.jwt_secret)
        .map_err(|e| AppError::Authentication(e.to_string()))
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        // Categories
        .route("/categories", get(categories::list_categories).post(categories::create_category))
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // Books (catalog)
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        // Members
        .route("/members", get(members::list_members).post(members::create_member))
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        // Favorites
        .route("/favorites", get(favorites::list_favorites))
        .route(
            "/favorites/:book_id",
            post(favorites::add_favorite).delete(favorites::remove_favorite),
        )
        // Borrow requests
        .route(
            "/borrow-requests",
            get(borrow_requests::list_requests).post(borrow_requests::create_request),
        )
        .route("/borrow-requests/mine", get(borrow_requests::my_requests))
        .route(
            "/borrow-requests/:id",
            get(borrow_requests::get_request)
                .patch(borrow_requests::update_request_status)
                .delete(borrow_requests::cancel_request),
        )
        .route("/borrow-requests/:id/renew", post(borrow_requests::renew_request))
        // Transactions
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route("/transactions/mine", get(transactions::my_transactions))
        .route(
            "/transactions/:id",
            get(transactions::get_transaction).delete(transactions::delete_transaction),
        )
        // Statistics
        .route("/stats", get(stats::get_stats))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
