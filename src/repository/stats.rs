//! Dashboard statistics queries

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::stats::LibraryStats};

#[derive(Clone)]
pub struct StatsRepository {
    pool: Pool<Postgres>,
}

impl StatsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All dashboard counters in a single round trip
    pub async fn totals(&self) -> AppResult<LibraryStats> {
        let stats = sqlx::query_as::<_, LibraryStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM books) AS total_books,
                (SELECT COALESCE(SUM(total_copies), 0)::BIGINT FROM books) AS total_copies,
                (SELECT COALESCE(SUM(available_copies), 0)::BIGINT FROM books) AS available_copies,
                (SELECT COUNT(*) FROM users WHERE role = 'MEMBER') AS total_members,
                (SELECT COUNT(*) FROM categories) AS total_categories,
                (SELECT COUNT(*) FROM borrow_requests WHERE status = 'PENDING') AS pending_requests,
                (SELECT COUNT(*) FROM borrow_requests WHERE status = 'APPROVED') AS active_loans,
                (SELECT COUNT(*) FROM borrow_requests
                 WHERE status = 'APPROVED' AND due_date < NOW()) AS overdue_loans
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}
