//! Favorites repository

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        favorite::{FavoriteBook, FavoriteSort},
        pagination::PageRequest,
    },
};

#[derive(Clone)]
pub struct FavoritesRepository {
    pool: Pool<Postgres>,
}

impl FavoritesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// A member's favorites
    pub async fn list(
        &self,
        user_id: i32,
        page: &PageRequest<FavoriteSort>,
    ) -> AppResult<(Vec<FavoriteBook>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let query = format!(
            r#"
            SELECT f.book_id, b.title, b.author, c.name AS category_name,
                   b.available_copies, f.created_at AS favorited_at
            FROM favorites f
            JOIN books b ON b.id = f.book_id
            LEFT JOIN categories c ON c.id = b.category_id
            WHERE f.user_id = $1
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            page.order_clause("f.book_id")
        );
        let rows = sqlx::query_as::<_, FavoriteBook>(&query)
            .bind(user_id)
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Add a favorite. Returns false when it was already present.
    pub async fn add(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO favorites (user_id, book_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Remove a favorite. Returns false when it did not exist.
    pub async fn remove(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
