//! Pagination, sorting and the `pagination` response envelope

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    book::BookSummary, borrow_request::BorrowRequestDetails, favorite::FavoriteBook,
    transaction::TransactionDetails, user::Member,
};
use crate::{
    config::PaginationConfig,
    error::{AppError, AppResult},
};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(AppError::BadRequest(format!(
                "Invalid order '{}', expected 'asc' or 'desc'",
                other
            ))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A whitelisted sort column for one resource.
///
/// Only `column()` output ever reaches the SQL text, so `sort_by` query
/// values can never inject arbitrary SQL.
pub trait SortKey: Sized + Copy {
    const DEFAULT: Self;
    const DEFAULT_ORDER: SortOrder;

    fn parse(s: &str) -> Option<Self>;

    /// Qualified column expression used in ORDER BY
    fn column(self) -> &'static str;

    /// Accepted `sort_by` values, for error messages
    fn accepted() -> &'static [&'static str];
}

/// Validated paging and sorting request
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<S> {
    pub page: i64,
    pub per_page: i64,
    pub sort: S,
    pub order: SortOrder,
}

impl<S: SortKey> PageRequest<S> {
    /// Build from raw query-string values.
    ///
    /// `page` clamps to 1 at the low end and to the last representable
    /// page at the high end; `per_page` clamps to `1..=max_per_page`.
    /// Unknown sort keys or orders are rejected.
    pub fn from_query(
        page: Option<i64>,
        per_page: Option<i64>,
        sort_by: Option<&str>,
        order: Option<&str>,
        config: &PaginationConfig,
    ) -> AppResult<Self> {
        let per_page = per_page
            .unwrap_or(config.default_per_page)
            .clamp(1, config.max_per_page.max(1));
        // Keeps `offset()` within i64
        let page = page.unwrap_or(1).clamp(1, i64::MAX / per_page);

        let sort = match sort_by.filter(|s| !s.is_empty()) {
            Some(key) => S::parse(key).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Invalid sort_by '{}', expected one of: {}",
                    key,
                    S::accepted().join(", ")
                ))
            })?,
            None => S::DEFAULT,
        };

        let order = match order.filter(|s| !s.is_empty()) {
            Some(o) => SortOrder::parse(o)?,
            None => S::DEFAULT_ORDER,
        };

        Ok(Self {
            page,
            per_page,
            sort,
            order,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// ORDER BY body with a stable tie-breaker on the row id
    pub fn order_clause(&self, id_column: &str) -> String {
        format!(
            "{} {}, {} {}",
            self.sort.column(),
            self.order.as_sql(),
            id_column,
            self.order.as_sql()
        )
    }

    pub fn page_info(&self, total: i64) -> PageInfo {
        PageInfo::new(self.page, self.per_page, total)
    }
}

/// Pagination metadata returned next to every list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PageInfo {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageInfo {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// List response envelope
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    BookPage = Paginated<BookSummary>,
    MemberPage = Paginated<Member>,
    BorrowRequestPage = Paginated<BorrowRequestDetails>,
    FavoritePage = Paginated<FavoriteBook>,
    TransactionPage = Paginated<TransactionDetails>
)]
pub struct Paginated<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Paginated<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(data: Vec<T>, pagination: PageInfo) -> Self {
        Self { data, pagination }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum TestSort {
        Name,
        Created,
    }

    impl SortKey for TestSort {
        const DEFAULT: Self = TestSort::Name;
        const DEFAULT_ORDER: SortOrder = SortOrder::Asc;

        fn parse(s: &str) -> Option<Self> {
            match s {
                "name" => Some(TestSort::Name),
                "created_at" => Some(TestSort::Created),
                _ => None,
            }
        }

        fn column(self) -> &'static str {
            match self {
                TestSort::Name => "t.name",
                TestSort::Created => "t.created_at",
            }
        }

        fn accepted() -> &'static [&'static str] {
            &["name", "created_at"]
        }
    }

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_per_page: 20,
            max_per_page: 50,
        }
    }

    #[test]
    fn defaults_apply_when_query_is_empty() {
        let req = PageRequest::<TestSort>::from_query(None, None, None, None, &config()).unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 20);
        assert_eq!(req.sort, TestSort::Name);
        assert_eq!(req.order, SortOrder::Asc);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let req =
            PageRequest::<TestSort>::from_query(Some(0), Some(500), None, None, &config()).unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 50);

        let req =
            PageRequest::<TestSort>::from_query(Some(3), Some(-4), None, None, &config()).unwrap();
        assert_eq!(req.per_page, 1);
        assert_eq!(req.offset(), 2);
    }

    #[test]
    fn huge_page_number_does_not_overflow_offset() {
        let req =
            PageRequest::<TestSort>::from_query(Some(i64::MAX), Some(50), None, None, &config())
                .unwrap();
        assert_eq!(req.page, i64::MAX / 50);
        assert!(req.offset() > 0);
        assert_eq!(req.page_info(0).page, req.page);
    }

    #[test]
    fn unknown_sort_key_is_rejected() {
        let err = PageRequest::<TestSort>::from_query(None, None, Some("password"), None, &config())
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("name, created_at")));
    }

    #[test]
    fn order_clause_uses_whitelisted_column() {
        let req = PageRequest::<TestSort>::from_query(
            Some(2),
            Some(10),
            Some("created_at"),
            Some("DESC"),
            &config(),
        )
        .unwrap();
        assert_eq!(req.order_clause("t.id"), "t.created_at DESC, t.id DESC");
        assert_eq!(req.offset(), 10);
    }

    #[test]
    fn invalid_order_is_rejected() {
        assert!(SortOrder::parse("sideways").is_err());
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(PageInfo::new(1, 20, 0).total_pages, 0);
        assert_eq!(PageInfo::new(1, 20, 20).total_pages, 1);
        assert_eq!(PageInfo::new(1, 20, 21).total_pages, 2);
    }
}
