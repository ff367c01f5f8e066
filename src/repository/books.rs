//! Books repository for database operations

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{contains_pattern, search_term};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookSort, BookSummary},
        pagination::PageRequest,
    },
};

const BOOK_COLUMNS: &str = r#"
    b.id, b.title, b.author, b.isbn, b.category_id, c.name AS category_name,
    b.description, b.publisher, b.published_year,
    b.total_copies, b.available_copies, b.is_featured, b.is_active,
    b.created_at, b.updated_at
"#;

const SUMMARY_COLUMNS: &str = r#"
    b.id, b.title, b.author, b.isbn, b.category_id, c.name AS category_name,
    b.published_year, b.total_copies, b.available_copies, b.is_featured, b.is_active
"#;

/// Column values for an insert or a full-row update
#[derive(Debug, Clone)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub is_featured: bool,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let query = format!(
            "SELECT {} FROM books b LEFT JOIN categories c ON c.id = b.category_id WHERE b.id = $1",
            BOOK_COLUMNS
        );
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search the catalog with filters, sorting and pagination
    pub async fn search(
        &self,
        query: &BookQuery,
        page: &PageRequest<BookSort>,
        include_inactive: bool,
    ) -> AppResult<(Vec<BookSummary>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b");
        push_filters(&mut count, query, include_inactive);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM books b LEFT JOIN categories c ON c.id = b.category_id",
            SUMMARY_COLUMNS
        ));
        push_filters(&mut select, query, include_inactive);
        select
            .push(format!(" ORDER BY {}", page.order_clause("b.id")))
            .push(" LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let books = select
            .build_query_as::<BookSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    /// Check whether another book already uses this ISBN
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::int IS NULL OR id != $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a book
    pub async fn create(&self, book: &BookRecord) -> AppResult<Book> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (
                title, author, isbn, category_id, description, publisher, published_year,
                total_copies, available_copies, is_featured, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.category_id)
        .bind(&book.description)
        .bind(&book.publisher)
        .bind(book.published_year)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(book.is_featured)
        .bind(book.is_active)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Overwrite a book row, guarded by the copy counters read beforehand.
    ///
    /// Returns `Conflict` when a borrow or return changed the counters in
    /// between, so the caller never clobbers circulation updates.
    pub async fn update(
        &self,
        id: i32,
        book: &BookRecord,
        expected_total: i32,
        expected_available: i32,
    ) -> AppResult<Book> {
        let result = sqlx::query(
            r#"
            UPDATE books SET
                title = $2, author = $3, isbn = $4, category_id = $5, description = $6,
                publisher = $7, published_year = $8, total_copies = $9, available_copies = $10,
                is_featured = $11, is_active = $12, updated_at = NOW()
            WHERE id = $1 AND total_copies = $13 AND available_copies = $14
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.category_id)
        .bind(&book.description)
        .bind(&book.publisher)
        .bind(book.published_year)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(book.is_featured)
        .bind(book.is_active)
        .bind(expected_total)
        .bind(expected_available)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Book {} was modified concurrently, reload and retry",
                id
            )));
        }

        self.get_by_id(id).await
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Whether any pending or approved request references this book
    pub async fn has_open_requests(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrow_requests
                WHERE book_id = $1 AND status IN ('PENDING', 'APPROVED')
            )
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Take one copy off the shelf. Returns false when none is available.
    pub async fn take_copy(conn: &mut PgConnection, id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies - 1, updated_at = NOW()
            WHERE id = $1 AND available_copies > 0
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Put one copy back. Returns false when every copy is already shelved.
    pub async fn put_back_copy(conn: &mut PgConnection, id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies + 1, updated_at = NOW()
            WHERE id = $1 AND available_copies < total_copies
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &BookQuery, include_inactive: bool) {
    qb.push(" WHERE 1=1");

    if !include_inactive {
        qb.push(" AND b.is_active");
    }

    if let Some(term) = search_term(&query.search) {
        let pattern = contains_pattern(term);
        qb.push(" AND (LOWER(b.title) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(b.author) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(b.isbn, '')) LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(author) = search_term(&query.author) {
        qb.push(" AND LOWER(b.author) LIKE ")
            .push_bind(contains_pattern(author));
    }

    if let Some(category_id) = query.category_id {
        qb.push(" AND b.category_id = ").push_bind(category_id);
    }

    match query.available {
        Some(true) => {
            qb.push(" AND b.available_copies > 0");
        }
        Some(false) => {
            qb.push(" AND b.available_copies = 0");
        }
        None => {}
    }

    if let Some(featured) = query.featured {
        qb.push(" AND b.is_featured = ").push_bind(featured);
    }
}
