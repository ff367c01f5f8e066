//! Member favorites

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::pagination::{SortKey, SortOrder};

/// A book on a member's favorites list
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FavoriteBook {
    pub book_id: i32,
    pub title: String,
    pub author: String,
    pub category_name: Option<String>,
    pub available_copies: i32,
    pub favorited_at: DateTime<Utc>,
}

/// Favorites list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct FavoriteQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// favorited_at, title
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteSort {
    FavoritedAt,
    Title,
}

impl SortKey for FavoriteSort {
    const DEFAULT: Self = FavoriteSort::FavoritedAt;
    const DEFAULT_ORDER: SortOrder = SortOrder::Desc;

    fn parse(s: &str) -> Option<Self> {
        match s {
            "favorited_at" => Some(FavoriteSort::FavoritedAt),
            "title" => Some(FavoriteSort::Title),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            FavoriteSort::FavoritedAt => "f.created_at",
            FavoriteSort::Title => "LOWER(b.title)",
        }
    }

    fn accepted() -> &'static [&'static str] {
        &["favorited_at", "title"]
    }
}
