//! Member favorites service

use crate::{
    error::{AppError, AppResult},
    models::{
        favorite::{FavoriteBook, FavoriteSort},
        pagination::PageRequest,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct FavoritesService {
    repository: Repository,
}

impl FavoritesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(
        &self,
        user_id: i32,
        page: &PageRequest<FavoriteSort>,
    ) -> AppResult<(Vec<FavoriteBook>, i64)> {
        self.repository.favorites.list(user_id, page).await
    }

    /// Add a book to the member's favorites. Returns true when newly added.
    pub async fn add(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let book = self.repository.books.get_by_id(book_id).await?;
        if !book.is_active {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        let created = self.repository.favorites.add(user_id, book_id).await?;
        if created {
            tracing::info!("Favorite added user id={} book id={}", user_id, book_id);
        }
        Ok(created)
    }

    pub async fn remove(&self, user_id: i32, book_id: i32) -> AppResult<()> {
        if !self.repository.favorites.remove(user_id, book_id).await? {
            return Err(AppError::NotFound(format!(
                "Book {} is not in your favorites",
                book_id
            )));
        }
        tracing::info!("Favorite removed user id={} book id={}", user_id, book_id);
        Ok(())
    }
}
