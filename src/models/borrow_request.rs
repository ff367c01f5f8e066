//! Borrow request model and its status workflow
//!
//! A request moves along a single path:
//!
//! ```text
//! PENDING --> APPROVED --> RETURNED
//!    \
//!     +-----> REJECTED
//! ```
//!
//! REJECTED and RETURNED are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::pagination::{SortKey, SortOrder};
use crate::error::{AppError, AppResult};

/// Borrow request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum BorrowStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Pending => "PENDING",
            BorrowStatus::Approved => "APPROVED",
            BorrowStatus::Rejected => "REJECTED",
            BorrowStatus::Returned => "RETURNED",
        }
    }

    /// Whether `next` is the immediate successor of `self`
    pub fn can_transition_to(self, next: BorrowStatus) -> bool {
        matches!(
            (self, next),
            (BorrowStatus::Pending, BorrowStatus::Approved)
                | (BorrowStatus::Pending, BorrowStatus::Rejected)
                | (BorrowStatus::Approved, BorrowStatus::Returned)
        )
    }

    pub fn ensure_transition(self, next: BorrowStatus) -> AppResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::BusinessRule(format!(
                "Cannot move a borrow request from {} to {}",
                self, next
            )))
        }
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(BorrowStatus::Pending),
            "APPROVED" => Ok(BorrowStatus::Approved),
            "REJECTED" => Ok(BorrowStatus::Rejected),
            "RETURNED" => Ok(BorrowStatus::Returned),
            _ => Err(format!("Invalid borrow status: {}", s)),
        }
    }
}

super::pg_text_enum!(BorrowStatus);

/// Borrow request row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub status: BorrowStatus,
    pub request_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub admin_response: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub renewal_count: i32,
}

impl BorrowRequest {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == BorrowStatus::Approved && self.due_date.map(|d| d < now).unwrap_or(false)
    }
}

/// Borrow request joined with book and member names for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequestDetails {
    pub id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub user_email: String,
    pub book_id: i32,
    pub book_title: String,
    pub book_author: String,
    pub status: BorrowStatus,
    pub request_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub admin_response: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub renewal_count: i32,
    pub is_overdue: bool,
}

/// Member's borrow request submission
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowRequest {
    pub book_id: i32,
    #[validate(length(max = 1000, message = "Notes are limited to 1000 characters"))]
    pub notes: Option<String>,
}

/// Admin decision on a request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBorrowStatus {
    pub status: BorrowStatus,
    #[validate(length(max = 1000, message = "Response is limited to 1000 characters"))]
    pub admin_response: Option<String>,
    /// Due date on approval; defaults to the configured loan length
    pub due_date: Option<DateTime<Utc>>,
}

/// Borrow request list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowRequestQuery {
    pub status: Option<BorrowStatus>,
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    /// Only approved requests past their due date
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// request_date, due_date, status
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowRequestSort {
    RequestDate,
    DueDate,
    Status,
}

impl SortKey for BorrowRequestSort {
    const DEFAULT: Self = BorrowRequestSort::RequestDate;
    const DEFAULT_ORDER: SortOrder = SortOrder::Desc;

    fn parse(s: &str) -> Option<Self> {
        match s {
            "request_date" => Some(BorrowRequestSort::RequestDate),
            "due_date" => Some(BorrowRequestSort::DueDate),
            "status" => Some(BorrowRequestSort::Status),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            BorrowRequestSort::RequestDate => "r.request_date",
            BorrowRequestSort::DueDate => "r.due_date",
            BorrowRequestSort::Status => "r.status",
        }
    }

    fn accepted() -> &'static [&'static str] {
        &["request_date", "due_date", "status"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use BorrowStatus::*;

    const ALL: [BorrowStatus; 4] = [Pending, Approved, Rejected, Returned];

    #[test]
    fn only_linear_transitions_are_allowed() {
        let allowed = [(Pending, Approved), (Pending, Rejected), (Approved, Returned)];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn nothing_moves_back_to_pending() {
        for from in ALL {
            assert!(from.ensure_transition(Pending).is_err(), "{} -> PENDING", from);
        }
    }

    #[test]
    fn rejected_transition_reports_both_states() {
        let err = Returned.ensure_transition(Approved).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(msg) if msg.contains("RETURNED to APPROVED")));
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Approved).unwrap(), "\"APPROVED\"");
        let parsed: BorrowStatus = serde_json::from_str("\"PENDING\"").unwrap();
        assert_eq!(parsed, Pending);
    }

    #[test]
    fn status_deserializes_in_any_case() {
        let parsed: BorrowStatus = serde_json::from_str("\"returned\"").unwrap();
        assert_eq!(parsed, Returned);
        assert!(serde_json::from_str::<BorrowStatus>("\"lost\"").is_err());
    }

    #[test]
    fn overdue_only_applies_to_approved_requests() {
        let now = Utc::now();
        let mut request = BorrowRequest {
            id: 1,
            user_id: 1,
            book_id: 1,
            status: Approved,
            request_date: now - Duration::days(20),
            due_date: Some(now - Duration::days(1)),
            notes: None,
            admin_response: None,
            processed_at: Some(now - Duration::days(19)),
            returned_at: None,
            renewal_count: 0,
        };
        assert!(request.is_overdue(now));

        request.status = Returned;
        assert!(!request.is_overdue(now));
    }
}
