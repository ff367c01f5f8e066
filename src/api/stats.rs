//! Statistics endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, models::stats::LibraryStats, AppState};

use super::AdminUser;

/// Dashboard totals
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = LibraryStats),
        (status = 403, description = "Administrator only", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<LibraryStats>> {
    let stats = state.services.stats.get_stats().await?;
    Ok(Json(stats))
}
