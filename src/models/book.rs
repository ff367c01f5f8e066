//! Book (catalog) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::pagination::{SortKey, SortOrder};
use crate::error::{AppError, AppResult};

/// Full book record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book row for catalog listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    pub published_year: Option<i32>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub is_featured: bool,
    pub is_active: bool,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: String,
    /// ISBN-10 or ISBN-13, hyphens allowed
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    #[validate(range(min = 0, max = 9999, message = "Invalid publication year"))]
    pub published_year: Option<i32>,
    #[validate(range(min = 0, message = "total_copies cannot be negative"))]
    pub total_copies: i32,
    /// Defaults to `total_copies`
    #[validate(range(min = 0, message = "available_copies cannot be negative"))]
    pub available_copies: Option<i32>,
    #[serde(default)]
    pub is_featured: bool,
    pub is_active: Option<bool>,
}

/// Update book request (only provided fields change)
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: Option<String>,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    #[validate(range(min = 0, max = 9999, message = "Invalid publication year"))]
    pub published_year: Option<i32>,
    #[validate(range(min = 0, message = "total_copies cannot be negative"))]
    pub total_copies: Option<i32>,
    #[validate(range(min = 0, message = "available_copies cannot be negative"))]
    pub available_copies: Option<i32>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

/// Catalog query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive match on title, author or ISBN
    pub search: Option<String>,
    pub category_id: Option<i32>,
    /// Case-insensitive match on author only
    pub author: Option<String>,
    /// Only books with at least one copy on the shelf
    pub available: Option<bool>,
    pub featured: Option<bool>,
    /// Include deactivated books (administrators only)
    pub include_inactive: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// title, author, created_at, published_year, available_copies
    pub sort_by: Option<String>,
    /// asc or desc
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSort {
    Title,
    Author,
    CreatedAt,
    PublishedYear,
    AvailableCopies,
}

impl SortKey for BookSort {
    const DEFAULT: Self = BookSort::Title;
    const DEFAULT_ORDER: SortOrder = SortOrder::Asc;

    fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(BookSort::Title),
            "author" => Some(BookSort::Author),
            "created_at" => Some(BookSort::CreatedAt),
            "published_year" => Some(BookSort::PublishedYear),
            "available_copies" => Some(BookSort::AvailableCopies),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            BookSort::Title => "LOWER(b.title)",
            BookSort::Author => "LOWER(b.author)",
            BookSort::CreatedAt => "b.created_at",
            BookSort::PublishedYear => "b.published_year",
            BookSort::AvailableCopies => "b.available_copies",
        }
    }

    fn accepted() -> &'static [&'static str] {
        &["title", "author", "created_at", "published_year", "available_copies"]
    }
}

/// Strip separators from an ISBN, keeping digits and a trailing check `X`
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Checksum validation for ISBN-10 and ISBN-13
pub fn is_valid_isbn(isbn: &str) -> bool {
    let isbn = normalize_isbn(isbn);
    let chars: Vec<char> = isbn.chars().collect();

    match chars.len() {
        10 => {
            let mut sum = 0;
            for (i, c) in chars.iter().enumerate() {
                let value = match c {
                    'X' if i == 9 => 10,
                    c => match c.to_digit(10) {
                        Some(d) => d,
                        None => return false,
                    },
                };
                sum += value * (10 - i as u32);
            }
            sum % 11 == 0
        }
        13 => {
            let mut sum = 0;
            for (i, c) in chars.iter().enumerate() {
                let Some(d) = c.to_digit(10) else {
                    return false;
                };
                sum += if i % 2 == 0 { d } else { d * 3 };
            }
            sum % 10 == 0
        }
        _ => false,
    }
}

fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    if is_valid_isbn(isbn) {
        Ok(())
    } else {
        let mut error = ValidationError::new("isbn");
        error.message = Some("Invalid ISBN-10/ISBN-13".into());
        Err(error)
    }
}

/// Recompute copy counters after an edit.
///
/// A new total shifts the available count by the same delta (copies on loan
/// stay on loan); an explicit available count overrides that. The result must
/// satisfy `0 <= available <= total`.
pub fn adjust_copies(
    total: i32,
    available: i32,
    new_total: Option<i32>,
    new_available: Option<i32>,
) -> AppResult<(i32, i32)> {
    let target_total = new_total.unwrap_or(total);
    let target_available =
        new_available.unwrap_or_else(|| available + (target_total - total));

    if target_total < 0 {
        return Err(AppError::BusinessRule(
            "total_copies cannot be negative".to_string(),
        ));
    }
    if target_available < 0 {
        return Err(AppError::BusinessRule(format!(
            "Cannot reduce total_copies to {}: {} copies are on loan",
            target_total,
            total - available
        )));
    }
    if target_available > target_total {
        return Err(AppError::BusinessRule(format!(
            "available_copies ({}) cannot exceed total_copies ({})",
            target_available, target_total
        )));
    }

    Ok((target_total, target_available))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isbn_checksums() {
        assert!(is_valid_isbn("0-306-40615-2"));
        assert!(is_valid_isbn("978-0-306-40615-7"));
        assert!(is_valid_isbn("080442957X"));
        assert!(!is_valid_isbn("978-0-306-40615-8"));
        assert!(!is_valid_isbn("0-306-40615-3"));
        assert!(!is_valid_isbn("12345"));
        assert!(!is_valid_isbn("X804429570"));
    }

    #[test]
    fn create_book_rejects_bad_isbn() {
        let book = CreateBook {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            isbn: Some("not-an-isbn".into()),
            category_id: None,
            description: None,
            publisher: None,
            published_year: Some(1965),
            total_copies: 2,
            available_copies: None,
            is_featured: false,
            is_active: None,
        };
        assert!(book.validate().is_err());
    }

    #[test]
    fn raising_total_adds_available_copies() {
        assert_eq!(adjust_copies(3, 1, Some(5), None).unwrap(), (5, 3));
    }

    #[test]
    fn lowering_total_below_loans_is_rejected() {
        // 2 of 3 copies on loan, cannot drop to 1 copy
        assert!(adjust_copies(3, 1, Some(1), None).is_err());
        assert_eq!(adjust_copies(3, 1, Some(2), None).unwrap(), (2, 0));
    }

    #[test]
    fn available_never_exceeds_total() {
        assert!(adjust_copies(3, 3, None, Some(4)).is_err());
        assert_eq!(adjust_copies(3, 1, None, Some(3)).unwrap(), (3, 3));
    }
}
