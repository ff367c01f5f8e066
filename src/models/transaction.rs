//! Circulation transaction log (issue, return, renewal)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::pagination::{SortKey, SortOrder};

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum TransactionKind {
    Issue,
    Return,
    Renewal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Issue => "ISSUE",
            TransactionKind::Return => "RETURN",
            TransactionKind::Renewal => "RENEWAL",
        }
    }

    /// Change applied to a book's available copies when this kind is recorded
    pub fn copy_delta(self) -> i32 {
        match self {
            TransactionKind::Issue => -1,
            TransactionKind::Return => 1,
            TransactionKind::Renewal => 0,
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ISSUE" => Ok(TransactionKind::Issue),
            "RETURN" => Ok(TransactionKind::Return),
            "RENEWAL" => Ok(TransactionKind::Renewal),
            _ => Err(format!("Invalid transaction kind: {}", s)),
        }
    }
}

super::pg_text_enum!(TransactionKind);

/// Transaction row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Transaction {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_request_id: Option<i32>,
    pub kind: TransactionKind,
    pub transaction_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Transaction joined with book and member names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TransactionDetails {
    pub id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub book_id: i32,
    pub book_title: String,
    pub borrow_request_id: Option<i32>,
    pub kind: TransactionKind,
    pub transaction_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Insert payload shared by the request workflow and manual entries
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_request_id: Option<i32>,
    pub kind: TransactionKind,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Manual walk-in circulation entry (admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTransaction {
    pub user_id: i32,
    pub book_id: i32,
    /// ISSUE or RETURN
    pub kind: TransactionKind,
    /// For ISSUE; defaults to the configured loan length
    pub due_date: Option<DateTime<Utc>>,
    #[validate(length(max = 1000, message = "Notes are limited to 1000 characters"))]
    pub notes: Option<String>,
}

/// Transaction list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    pub kind: Option<TransactionKind>,
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    /// Inclusive lower bound on transaction_date
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on transaction_date
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// transaction_date, due_date
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionSort {
    TransactionDate,
    DueDate,
}

impl SortKey for TransactionSort {
    const DEFAULT: Self = TransactionSort::TransactionDate;
    const DEFAULT_ORDER: SortOrder = SortOrder::Desc;

    fn parse(s: &str) -> Option<Self> {
        match s {
            "transaction_date" => Some(TransactionSort::TransactionDate),
            "due_date" => Some(TransactionSort::DueDate),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            TransactionSort::TransactionDate => "t.transaction_date",
            TransactionSort::DueDate => "t.due_date",
        }
    }

    fn accepted() -> &'static [&'static str] {
        &["transaction_date", "due_date"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_deltas() {
        assert_eq!(TransactionKind::Issue.copy_delta(), -1);
        assert_eq!(TransactionKind::Return.copy_delta(), 1);
        assert_eq!(TransactionKind::Renewal.copy_delta(), 0);
    }
}
