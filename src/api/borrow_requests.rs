//! Borrow request endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrow_request::{
            BorrowRequestDetails, BorrowRequestQuery, BorrowRequestSort, CreateBorrowRequest,
            UpdateBorrowStatus,
        },
        pagination::{BorrowRequestPage, PageRequest, Paginated},
    },
    AppState,
};

use super::{AdminUser, AppJson, AppPath, AppQuery, AuthenticatedUser};

fn page_request(
    state: &AppState,
    query: &BorrowRequestQuery,
) -> AppResult<PageRequest<BorrowRequestSort>> {
    PageRequest::from_query(
        query.page,
        query.per_page,
        query.sort_by.as_deref(),
        query.order.as_deref(),
        &state.config.pagination,
    )
}

/// Submit a borrow request
#[utoipa::path(
    post,
    path = "/borrow-requests",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request created", body = BorrowRequestDetails),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Open request for this book already exists", body = crate::error::ErrorResponse),
        (status = 422, description = "No copy available or request limit reached", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(data): AppJson<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRequestDetails>)> {
    data.validate()?;
    let request = state.services.borrows.create(claims.user_id, data).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// List the caller's borrow requests
#[utoipa::path(
    get,
    path = "/borrow-requests/mine",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(BorrowRequestQuery),
    responses(
        (status = 200, description = "Page of requests", body = BorrowRequestPage),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_requests(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppQuery(query): AppQuery<BorrowRequestQuery>,
) -> AppResult<Json<BorrowRequestPage>> {
    let page = page_request(&state, &query)?;
    let (requests, total) = state
        .services
        .borrows
        .list_mine(claims.user_id, query, &page)
        .await?;
    Ok(Json(Paginated::new(requests, page.page_info(total))))
}

/// List all borrow requests
#[utoipa::path(
    get,
    path = "/borrow-requests",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(BorrowRequestQuery),
    responses(
        (status = 200, description = "Page of requests", body = BorrowRequestPage),
        (status = 403, description = "Administrator only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppQuery(query): AppQuery<BorrowRequestQuery>,
) -> AppResult<Json<BorrowRequestPage>> {
    let page = page_request(&state, &query)?;
    let (requests, total) = state.services.borrows.list(&query, &page).await?;
    Ok(Json(Paginated::new(requests, page.page_info(total))))
}

/// Get a borrow request (owner or administrator)
#[utoipa::path(
    get,
    path = "/borrow-requests/{id}",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Borrow request", body = BorrowRequestDetails),
        (status = 403, description = "Another member's request", body = crate::error::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<BorrowRequestDetails>> {
    let request = state.services.borrows.get(id, &claims).await?;
    Ok(Json(request))
}

/// Approve, reject or mark a request returned
#[utoipa::path(
    patch,
    path = "/borrow-requests/{id}",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    request_body = UpdateBorrowStatus,
    responses(
        (status = 200, description = "Status changed", body = BorrowRequestDetails),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Transition not allowed or no copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_request_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(id): AppPath<i32>,
    AppJson(data): AppJson<UpdateBorrowStatus>,
) -> AppResult<Json<BorrowRequestDetails>> {
    data.validate()?;
    let request = state.services.borrows.update_status(id, data).await?;
    Ok(Json(request))
}

/// Renew an approved loan
#[utoipa::path(
    post,
    path = "/borrow-requests/{id}/renew",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Loan renewed", body = BorrowRequestDetails),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Not renewable", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<BorrowRequestDetails>> {
    let request = state.services.borrows.renew(id, &claims).await?;
    Ok(Json(request))
}

/// Cancel a pending request
#[utoipa::path(
    delete,
    path = "/borrow-requests/{id}",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 204, description = "Request cancelled"),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Request already processed", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    state.services.borrows.cancel(id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}
