//! Circulation log endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        pagination::{PageRequest, Paginated, TransactionPage},
        transaction::{CreateTransaction, TransactionDetails, TransactionQuery, TransactionSort},
    },
    AppState,
};

use super::{AdminUser, AppJson, AppPath, AppQuery, AuthenticatedUser};

fn page_request(state: &AppState, query: &TransactionQuery) -> AppResult<PageRequest<TransactionSort>> {
    PageRequest::from_query(
        query.page,
        query.per_page,
        query.sort_by.as_deref(),
        query.order.as_deref(),
        &state.config.pagination,
    )
}

/// List circulation transactions
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "Page of transactions", body = TransactionPage),
        (status = 403, description = "Administrator only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppQuery(query): AppQuery<TransactionQuery>,
) -> AppResult<Json<TransactionPage>> {
    let page = page_request(&state, &query)?;
    let (rows, total) = state.services.transactions.list(&query, &page).await?;
    Ok(Json(Paginated::new(rows, page.page_info(total))))
}

/// The caller's circulation history
#[utoipa::path(
    get,
    path = "/transactions/mine",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "Page of transactions", body = TransactionPage),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_transactions(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppQuery(query): AppQuery<TransactionQuery>,
) -> AppResult<Json<TransactionPage>> {
    let page = page_request(&state, &query)?;
    let (rows, total) = state
        .services
        .transactions
        .list_mine(claims.user_id, query, &page)
        .await?;
    Ok(Json(Paginated::new(rows, page.page_info(total))))
}

/// Get a transaction
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction", body = TransactionDetails),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<TransactionDetails>> {
    let transaction = state.services.transactions.get(id).await?;
    Ok(Json(transaction))
}

/// Record a walk-in issue or return
#[utoipa::path(
    post,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = CreateTransaction,
    responses(
        (status = 201, description = "Transaction recorded", body = TransactionDetails),
        (status = 400, description = "Invalid kind", body = crate::error::ErrorResponse),
        (status = 404, description = "Member or book not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Copy counter cannot move", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppJson(data): AppJson<CreateTransaction>,
) -> AppResult<(StatusCode, Json<TransactionDetails>)> {
    data.validate()?;
    let transaction = state.services.transactions.create(data).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Delete a mistaken transaction
#[utoipa::path(
    delete,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_transaction(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    state.services.transactions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
