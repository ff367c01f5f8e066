//! Dashboard counters

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Library-wide totals for the admin dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LibraryStats {
    pub total_books: i64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub total_members: i64,
    pub total_categories: i64,
    pub pending_requests: i64,
    /// APPROVED requests, i.e. copies currently on loan
    pub active_loans: i64,
    /// APPROVED requests past their due date
    pub overdue_loans: i64,
}
