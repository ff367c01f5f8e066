//! Repository layer for database operations

pub mod books;
pub mod borrow_requests;
pub mod categories;
pub mod favorites;
pub mod stats;
pub mod transactions;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub borrow_requests: borrow_requests::BorrowRequestsRepository,
    pub categories: categories::CategoriesRepository,
    pub favorites: favorites::FavoritesRepository,
    pub stats: stats::StatsRepository,
    pub transactions: transactions::TransactionsRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            borrow_requests: borrow_requests::BorrowRequestsRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            favorites: favorites::FavoritesRepository::new(pool.clone()),
            stats: stats::StatsRepository::new(pool.clone()),
            transactions: transactions::TransactionsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Build a case-insensitive `LIKE` pattern matching `term` anywhere,
/// with `%`, `_` and `\` in the term matched literally.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Trimmed, non-empty search term
pub(crate) fn search_term(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern(" Dune "), "%dune%");
        assert_eq!(contains_pattern("100%_"), "%100\\%\\_%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn blank_search_terms_are_ignored() {
        assert_eq!(search_term(&Some("   ".to_string())), None);
        assert_eq!(search_term(&Some(" tolkien ".to_string())), Some("tolkien"));
        assert_eq!(search_term(&None), None);
    }
}
