//! Borrow requests repository
//!
//! Status changes go through `lock` + one of the transition helpers inside a
//! caller-owned database transaction, so the row lock is held until the copy
//! counter and the circulation log are updated as well.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow_request::{
            BorrowRequest, BorrowRequestDetails, BorrowRequestQuery, BorrowRequestSort,
            BorrowStatus,
        },
        pagination::PageRequest,
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.name AS user_name, u.email AS user_email,
           r.book_id, b.title AS book_title, b.author AS book_author,
           r.status, r.request_date, r.due_date, r.notes, r.admin_response,
           r.processed_at, r.returned_at, r.renewal_count,
           COALESCE(r.status = 'APPROVED' AND r.due_date < NOW(), FALSE) AS is_overdue
    FROM borrow_requests r
    JOIN users u ON u.id = r.user_id
    JOIN books b ON b.id = r.book_id
"#;

const COUNT_SELECT: &str = "SELECT COUNT(*) FROM borrow_requests r";

#[derive(Clone)]
pub struct BorrowRequestsRepository {
    pool: Pool<Postgres>,
}

impl BorrowRequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get request by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request {} not found", id)))
    }

    /// Get request with book and member names
    pub async fn get_details(&self, id: i32) -> AppResult<BorrowRequestDetails> {
        let query = format!("{} WHERE r.id = $1", DETAILS_SELECT);
        sqlx::query_as::<_, BorrowRequestDetails>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request {} not found", id)))
    }

    /// List requests with filters and pagination
    pub async fn search(
        &self,
        query: &BorrowRequestQuery,
        page: &PageRequest<BorrowRequestSort>,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new(COUNT_SELECT);
        push_filters(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        push_filters(&mut select, query);
        select
            .push(format!(" ORDER BY {}", page.order_clause("r.id")))
            .push(" LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select
            .build_query_as::<BorrowRequestDetails>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Number of pending or approved requests held by a member
    pub async fn count_open_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrow_requests
            WHERE user_id = $1 AND status IN ('PENDING', 'APPROVED')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Whether the member already has an open request for this book
    pub async fn has_open_for_book(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrow_requests
                WHERE user_id = $1 AND book_id = $2 AND status IN ('PENDING', 'APPROVED')
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a pending request
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        notes: Option<&str>,
    ) -> AppResult<BorrowRequest> {
        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO borrow_requests (user_id, book_id, status, notes)
            VALUES ($1, $2, 'PENDING', $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    /// Delete a request only while it is still pending
    pub async fn delete_pending(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM borrow_requests WHERE id = $1 AND status = 'PENDING'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Load a request and lock its row for the rest of the transaction
    pub async fn lock(conn: &mut PgConnection, id: i32) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request {} not found", id)))
    }

    /// PENDING -> APPROVED
    pub async fn approve(
        conn: &mut PgConnection,
        id: i32,
        due_date: DateTime<Utc>,
        admin_response: Option<&str>,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'APPROVED', due_date = $2, admin_response = $3, processed_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(due_date)
        .bind(admin_response)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| stale(id, BorrowStatus::Pending, BorrowStatus::Approved))
    }

    /// PENDING -> REJECTED
    pub async fn reject(
        conn: &mut PgConnection,
        id: i32,
        admin_response: Option<&str>,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'REJECTED', admin_response = $2, processed_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(admin_response)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| stale(id, BorrowStatus::Pending, BorrowStatus::Rejected))
    }

    /// APPROVED -> RETURNED
    pub async fn mark_returned(
        conn: &mut PgConnection,
        id: i32,
        admin_response: Option<&str>,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'RETURNED', returned_at = NOW(),
                admin_response = COALESCE($2, admin_response)
            WHERE id = $1 AND status = 'APPROVED'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(admin_response)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| stale(id, BorrowStatus::Approved, BorrowStatus::Returned))
    }

    /// Push the due date of an approved request and count the renewal
    pub async fn renew(
        conn: &mut PgConnection,
        id: i32,
        due_date: DateTime<Utc>,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET due_date = $2, renewal_count = renewal_count + 1
            WHERE id = $1 AND status = 'APPROVED'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(due_date)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::BusinessRule("Only approved requests can be renewed".to_string()))
    }
}

/// The row no longer had the status the transition expects
fn stale(id: i32, from: BorrowStatus, to: BorrowStatus) -> AppError {
    AppError::BusinessRule(format!(
        "Borrow request {} is no longer {}, cannot move it to {}",
        id, from, to
    ))
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &BorrowRequestQuery) {
    qb.push(" WHERE 1=1");

    if let Some(status) = query.status {
        qb.push(" AND r.status = ").push_bind(status);
    }
    if let Some(user_id) = query.user_id {
        qb.push(" AND r.user_id = ").push_bind(user_id);
    }
    if let Some(book_id) = query.book_id {
        qb.push(" AND r.book_id = ").push_bind(book_id);
    }
    match query.overdue {
        Some(true) => {
            qb.push(" AND r.status = 'APPROVED' AND r.due_date < NOW()");
        }
        Some(false) => {
            qb.push(" AND NOT (r.status = 'APPROVED' AND r.due_date IS NOT NULL AND r.due_date < NOW())");
        }
        None => {}
    }
}
