//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    auth, books, borrow_requests, categories, favorites, health, members, stats, transactions,
};

/// Registers the `bearer_auth` scheme referenced by protected paths
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
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Library management REST API: catalog, members, favorites, borrow requests and circulation",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        auth::update_profile,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Members
        members::list_members,
        members::get_member,
        members::create_member,
        members::update_member,
        members::delete_member,
        // Favorites
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        // Borrow requests
        borrow_requests::create_request,
        borrow_requests::my_requests,
        borrow_requests::list_requests,
        borrow_requests::get_request,
        borrow_requests::update_request_status,
        borrow_requests::renew_request,
        borrow_requests::cancel_request,
        // Transactions
        transactions::list_transactions,
        transactions::my_transactions,
        transactions::get_transaction,
        transactions::create_transaction,
        transactions::delete_transaction,
        // Stats
        stats::get_stats,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::LoginRequest,
            crate::models::user::RegisterRequest,
            crate::models::user::AuthResponse,
            crate::models::user::UpdateProfile,
            // Categories
            crate::models::category::Category,
            crate::models::category::CreateCategory,
            crate::models::category::UpdateCategory,
            // Books
            crate::models::book::Book,
            crate::models::book::BookSummary,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Members
            crate::models::user::Role,
            crate::models::user::Member,
            crate::models::user::CreateMember,
            crate::models::user::UpdateMember,
            // Favorites
            crate::models::favorite::FavoriteBook,
            favorites::FavoriteStatus,
            // Borrow requests
            crate::models::borrow_request::BorrowStatus,
            crate::models::borrow_request::BorrowRequestDetails,
            crate::models::borrow_request::CreateBorrowRequest,
            crate::models::borrow_request::UpdateBorrowStatus,
            // Transactions
            crate::models::transaction::TransactionKind,
            crate::models::transaction::TransactionDetails,
            crate::models::transaction::CreateTransaction,
            // Pagination
            crate::models::pagination::PageInfo,
            crate::models::pagination::BookPage,
            crate::models::pagination::MemberPage,
            crate::models::pagination::FavoritePage,
            crate::models::pagination::BorrowRequestPage,
            crate::models::pagination::TransactionPage,
            // Stats
            crate::models::stats::LibraryStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and own profile"),
        (name = "categories", description = "Book categories"),
        (name = "books", description = "Catalog management"),
        (name = "members", description = "Member administration"),
        (name = "favorites", description = "Member favorites"),
        (name = "borrow-requests", description = "Borrow request workflow"),
        (name = "transactions", description = "Circulation log"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/books",
            "/books/{id}",
            "/borrow-requests/{id}/renew",
            "/favorites/{book_id}",
            "/transactions/mine",
            "/stats",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
