//! Catalog (books) management service

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{adjust_copies, normalize_isbn, Book, BookQuery, BookSort, BookSummary, CreateBook, UpdateBook},
        pagination::PageRequest,
    },
    repository::{books::BookRecord, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search the catalog. Deactivated books are only listed for administrators
    /// who ask for them.
    pub async fn search_books(
        &self,
        query: &BookQuery,
        page: &PageRequest<BookSort>,
        is_admin: bool,
    ) -> AppResult<(Vec<BookSummary>, i64)> {
        let include_inactive = is_admin && query.include_inactive.unwrap_or(false);
        self.repository.books.search(query, page, include_inactive).await
    }

    /// Get a book; inactive books are hidden from non-administrators
    pub async fn get_book(&self, id: i32, is_admin: bool) -> AppResult<Book> {
        let book = self.repository.books.get_by_id(id).await?;
        if !book.is_active && !is_admin {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(book)
    }

    pub async fn create_book(&self, data: CreateBook) -> AppResult<Book> {
        self.check_category(data.category_id).await?;
        let isbn = self.check_isbn(data.isbn.as_deref(), None).await?;

        let available_copies = data.available_copies.unwrap_or(data.total_copies);
        if available_copies > data.total_copies {
            return Err(AppError::Validation(format!(
                "available_copies ({}) cannot exceed total_copies ({})",
                available_copies, data.total_copies
            )));
        }

        let record = BookRecord {
            title: data.title.trim().to_string(),
            author: data.author.trim().to_string(),
            isbn,
            category_id: data.category_id,
            description: data.description,
            publisher: data.publisher,
            published_year: data.published_year,
            total_copies: data.total_copies,
            available_copies,
            is_featured: data.is_featured,
            is_active: data.is_active.unwrap_or(true),
        };

        let book = self.repository.books.create(&record).await?;
        tracing::info!(
            "Book created id={} title={:?} copies={}",
            book.id,
            book.title,
            book.total_copies
        );
        Ok(book)
    }

    /// Partial update. Copy counters are recomputed from the current row and
    /// written back only if nobody borrowed or returned in the meantime.
    pub async fn update_book(&self, id: i32, data: UpdateBook) -> AppResult<Book> {
        let current = self.repository.books.get_by_id(id).await?;

        let (total_copies, available_copies) = adjust_copies(
            current.total_copies,
            current.available_copies,
            data.total_copies,
            data.available_copies,
        )?;

        if data.category_id.is_some() && data.category_id != current.category_id {
            self.check_category(data.category_id).await?;
        }
        let isbn = match data.isbn.as_deref() {
            Some(isbn) => self.check_isbn(Some(isbn), Some(id)).await?,
            None => current.isbn,
        };

        let record = BookRecord {
            title: data.title.map(|t| t.trim().to_string()).unwrap_or(current.title),
            author: data.author.map(|a| a.trim().to_string()).unwrap_or(current.author),
            isbn,
            category_id: data.category_id.or(current.category_id),
            description: data.description.or(current.description),
            publisher: data.publisher.or(current.publisher),
            published_year: data.published_year.or(current.published_year),
            total_copies,
            available_copies,
            is_featured: data.is_featured.unwrap_or(current.is_featured),
            is_active: data.is_active.unwrap_or(current.is_active),
        };

        let book = self
            .repository
            .books
            .update(id, &record, current.total_copies, current.available_copies)
            .await?;
        tracing::info!(
            "Book updated id={} copies={}/{}",
            id,
            book.available_copies,
            book.total_copies
        );
        Ok(book)
    }

    /// Delete a book; refused while requests for it are still open
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        if self.repository.books.has_open_requests(id).await? {
            return Err(AppError::Conflict(format!(
                "Book {} has pending or approved borrow requests",
                id
            )));
        }
        self.repository.books.delete(id).await?;
        tracing::info!("Book deleted id={}", id);
        Ok(())
    }

    async fn check_category(&self, category_id: Option<i32>) -> AppResult<()> {
        if let Some(category_id) = category_id {
            if !self.repository.categories.exists(category_id).await? {
                return Err(AppError::BadRequest(format!(
                    "Category {} does not exist",
                    category_id
                )));
            }
        }
        Ok(())
    }

    /// Normalize the ISBN and make sure no other book carries it
    async fn check_isbn(&self, isbn: Option<&str>, exclude_id: Option<i32>) -> AppResult<Option<String>> {
        let Some(isbn) = isbn.map(normalize_isbn) else {
            return Ok(None);
        };
        if self.repository.books.isbn_exists(&isbn, exclude_id).await? {
            return Err(AppError::Conflict(format!(
                "A book with ISBN {} already exists",
                isbn
            )));
        }
        Ok(Some(isbn))
    }
}
