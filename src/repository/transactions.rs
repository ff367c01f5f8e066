//! Circulation log repository

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        pagination::PageRequest,
        transaction::{NewTransaction, Transaction, TransactionDetails, TransactionQuery, TransactionSort},
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT t.id, t.user_id, u.name AS user_name, t.book_id, b.title AS book_title,
           t.borrow_request_id, t.kind, t.transaction_date, t.due_date, t.notes
    FROM transactions t
    JOIN users u ON u.id = t.user_id
    JOIN books b ON b.id = t.book_id
"#;

#[derive(Clone)]
pub struct TransactionsRepository {
    pool: Pool<Postgres>,
}

impl TransactionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Append an entry, inside the caller's transaction
    pub async fn insert(conn: &mut PgConnection, entry: &NewTransaction) -> AppResult<Transaction> {
        let row = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (user_id, book_id, borrow_request_id, kind, due_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.book_id)
        .bind(entry.borrow_request_id)
        .bind(entry.kind)
        .bind(entry.due_date)
        .bind(&entry.notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Get a transaction with book and member names
    pub async fn get_details(&self, id: i32) -> AppResult<TransactionDetails> {
        let query = format!("{} WHERE t.id = $1", DETAILS_SELECT);
        sqlx::query_as::<_, TransactionDetails>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", id)))
    }

    /// List transactions with filters and pagination
    pub async fn search(
        &self,
        query: &TransactionQuery,
        page: &PageRequest<TransactionSort>,
    ) -> AppResult<(Vec<TransactionDetails>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM transactions t");
        push_filters(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        push_filters(&mut select, query);
        select
            .push(format!(" ORDER BY {}", page.order_clause("t.id")))
            .push(" LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select
            .build_query_as::<TransactionDetails>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Remove a log entry. Copy counters are left untouched.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Transaction {} not found", id)));
        }
        Ok(())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &TransactionQuery) {
    qb.push(" WHERE 1=1");

    if let Some(kind) = query.kind {
        qb.push(" AND t.kind = ").push_bind(kind);
    }
    if let Some(user_id) = query.user_id {
        qb.push(" AND t.user_id = ").push_bind(user_id);
    }
    if let Some(book_id) = query.book_id {
        qb.push(" AND t.book_id = ").push_bind(book_id);
    }
    if let Some(from) = query.from {
        qb.push(" AND t.transaction_date >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        qb.push(" AND t.transaction_date < ").push_bind(to);
    }
}
