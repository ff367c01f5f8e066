//! Favorites endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        favorite::{FavoriteQuery, FavoriteSort},
        pagination::{FavoritePage, PageRequest, Paginated},
    },
    AppState,
};

use super::{AppPath, AppQuery, AuthenticatedUser};

#[derive(Serialize, ToSchema)]
pub struct FavoriteStatus {
    pub book_id: i32,
    /// False when the book was already a favorite
    pub created: bool,
}

/// List the caller's favorite books
#[utoipa::path(
    get,
    path = "/favorites",
    tag = "favorites",
    security(("bearer_auth" = [])),
    params(FavoriteQuery),
    responses(
        (status = 200, description = "Page of favorites", body = FavoritePage),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppQuery(query): AppQuery<FavoriteQuery>,
) -> AppResult<Json<FavoritePage>> {
    let page = PageRequest::<FavoriteSort>::from_query(
        query.page,
        query.per_page,
        query.sort_by.as_deref(),
        query.order.as_deref(),
        &state.config.pagination,
    )?;

    let (books, total) = state.services.favorites.list(claims.user_id, &page).await?;
    Ok(Json(Paginated::new(books, page.page_info(total))))
}

/// Add a book to the caller's favorites
#[utoipa::path(
    post,
    path = "/favorites/{book_id}",
    tag = "favorites",
    security(("bearer_auth" = [])),
    params(("book_id" = i32, Path, description = "Book ID")),
    responses(
        (status = 201, description = "Added", body = FavoriteStatus),
        (status = 200, description = "Already a favorite", body = FavoriteStatus),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(book_id): AppPath<i32>,
) -> AppResult<(StatusCode, Json<FavoriteStatus>)> {
    let created = state.services.favorites.add(claims.user_id, book_id).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(FavoriteStatus { book_id, created })))
}

/// Remove a book from the caller's favorites
#[utoipa::path(
    delete,
    path = "/favorites/{book_id}",
    tag = "favorites",
    security(("bearer_auth" = [])),
    params(("book_id" = i32, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Not a favorite", body = crate::error::ErrorResponse)
    )
)]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(book_id): AppPath<i32>,
) -> AppResult<StatusCode> {
    state.services.favorites.remove(claims.user_id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
