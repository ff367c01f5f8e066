//! Borrow request workflow
//!
//! Members submit requests; administrators approve, reject or mark them
//! returned. Approval and return move the book's copy counter and append to
//! the circulation log inside one database transaction.

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        borrow_request::{
            BorrowRequest, BorrowRequestDetails, BorrowRequestQuery, BorrowRequestSort,
            BorrowStatus, CreateBorrowRequest, UpdateBorrowStatus,
        },
        pagination::PageRequest,
        transaction::{NewTransaction, TransactionKind},
        user::UserClaims,
    },
    repository::{
        books::BooksRepository, borrow_requests::BorrowRequestsRepository,
        transactions::TransactionsRepository, Repository,
    },
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    config: LoansConfig,
}

impl BorrowsService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Submit a request for a book on behalf of the caller
    pub async fn create(&self, user_id: i32, data: CreateBorrowRequest) -> AppResult<BorrowRequestDetails> {
        let book = self.repository.books.get_by_id(data.book_id).await?;
        if !book.is_active {
            return Err(AppError::NotFound(format!("Book with id {} not found", book.id)));
        }
        if book.available_copies <= 0 {
            return Err(AppError::BusinessRule(format!(
                "No copies of '{}' are available",
                book.title
            )));
        }

        let requests = &self.repository.borrow_requests;
        if requests.has_open_for_book(user_id, book.id).await? {
            return Err(AppError::Conflict(format!(
                "You already have an open request for '{}'",
                book.title
            )));
        }
        let open = requests.count_open_for_user(user_id).await?;
        if open >= self.config.max_active_requests {
            return Err(AppError::BusinessRule(format!(
                "Limit of {} open borrow requests reached",
                self.config.max_active_requests
            )));
        }

        let request = requests.create(user_id, book.id, data.notes.as_deref()).await?;
        tracing::info!(
            "Borrow request created id={} user id={} book id={}",
            request.id,
            user_id,
            book.id
        );
        requests.get_details(request.id).await
    }

    pub async fn list(
        &self,
        query: &BorrowRequestQuery,
        page: &PageRequest<BorrowRequestSort>,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        self.repository.borrow_requests.search(query, page).await
    }

    /// The caller's requests; any `user_id` filter in the query is ignored
    pub async fn list_mine(
        &self,
        user_id: i32,
        mut query: BorrowRequestQuery,
        page: &PageRequest<BorrowRequestSort>,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        query.user_id = Some(user_id);
        self.repository.borrow_requests.search(&query, page).await
    }

    /// A single request, visible to its owner and administrators
    pub async fn get(&self, id: i32, claims: &UserClaims) -> AppResult<BorrowRequestDetails> {
        let request = self.repository.borrow_requests.get_details(id).await?;
        claims.require_self_or_admin(request.user_id)?;
        Ok(request)
    }

    /// Administrator decision: approve, reject or mark returned
    pub async fn update_status(&self, id: i32, data: UpdateBorrowStatus) -> AppResult<BorrowRequestDetails> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let current = BorrowRequestsRepository::lock(&mut *tx, id).await?;
        current.status.ensure_transition(data.status)?;
        let admin_response = data.admin_response.as_deref();

        match data.status {
            BorrowStatus::Approved => {
                let due_date = data
                    .due_date
                    .unwrap_or_else(|| now + Duration::days(self.config.default_loan_days));
                if due_date <= now {
                    return Err(AppError::Validation(
                        "due_date must be in the future".to_string(),
                    ));
                }
                if !BooksRepository::take_copy(&mut *tx, current.book_id).await? {
                    return Err(AppError::BusinessRule(format!(
                        "No copies of book {} are available",
                        current.book_id
                    )));
                }
                BorrowRequestsRepository::approve(&mut *tx, id, due_date, admin_response).await?;
                TransactionsRepository::insert(
                    &mut *tx,
                    &NewTransaction {
                        user_id: current.user_id,
                        book_id: current.book_id,
                        borrow_request_id: Some(id),
                        kind: TransactionKind::Issue,
                        due_date: Some(due_date),
                        notes: data.admin_response.clone(),
                    },
                )
                .await?;
            }
            BorrowStatus::Rejected => {
                BorrowRequestsRepository::reject(&mut *tx, id, admin_response).await?;
            }
            BorrowStatus::Returned => {
                if !BooksRepository::put_back_copy(&mut *tx, current.book_id).await? {
                    tracing::warn!(
                        "Return of request id={}: every copy of book id={} is already on the shelf",
                        id,
                        current.book_id
                    );
                }
                BorrowRequestsRepository::mark_returned(&mut *tx, id, admin_response).await?;
                TransactionsRepository::insert(
                    &mut *tx,
                    &NewTransaction {
                        user_id: current.user_id,
                        book_id: current.book_id,
                        borrow_request_id: Some(id),
                        kind: TransactionKind::Return,
                        due_date: current.due_date,
                        notes: data.admin_response.clone(),
                    },
                )
                .await?;
            }
            BorrowStatus::Pending => {
                unreachable!("ensure_transition rejects every move into PENDING")
            }
        }

        tx.commit().await?;
        tracing::info!(
            "Borrow request id={} moved {} -> {}",
            id,
            current.status,
            data.status
        );
        self.repository.borrow_requests.get_details(id).await
    }

    /// Extend an approved loan by the configured loan length
    pub async fn renew(&self, id: i32, claims: &UserClaims) -> AppResult<BorrowRequestDetails> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let current = BorrowRequestsRepository::lock(&mut *tx, id).await?;
        claims.require_self_or_admin(current.user_id)?;
        let due_date = renewed_due_date(&current, now, &self.config)?;

        BorrowRequestsRepository::renew(&mut *tx, id, due_date).await?;
        TransactionsRepository::insert(
            &mut *tx,
            &NewTransaction {
                user_id: current.user_id,
                book_id: current.book_id,
                borrow_request_id: Some(id),
                kind: TransactionKind::Renewal,
                due_date: Some(due_date),
                notes: None,
            },
        )
        .await?;

        tx.commit().await?;
        tracing::info!("Borrow request id={} renewed until {}", id, due_date);
        self.repository.borrow_requests.get_details(id).await
    }

    /// Withdraw a request that has not been processed yet
    pub async fn cancel(&self, id: i32, claims: &UserClaims) -> AppResult<()> {
        let request = self.repository.borrow_requests.get_by_id(id).await?;
        claims.require_self_or_admin(request.user_id)?;

        if request.status != BorrowStatus::Pending
            || !self.repository.borrow_requests.delete_pending(id).await?
        {
            return Err(AppError::BusinessRule(
                "Only pending requests can be cancelled".to_string(),
            ));
        }

        tracing::info!("Borrow request id={} cancelled by user id={}", id, claims.user_id);
        Ok(())
    }
}

/// New due date for a renewal, or why the loan cannot be renewed
fn renewed_due_date(
    request: &BorrowRequest,
    now: DateTime<Utc>,
    config: &LoansConfig,
) -> AppResult<DateTime<Utc>> {
    if request.status != BorrowStatus::Approved {
        return Err(AppError::BusinessRule(
            "Only approved requests can be renewed".to_string(),
        ));
    }
    if request.renewal_count >= config.max_renewals {
        return Err(AppError::BusinessRule(format!(
            "Renewal limit of {} reached",
            config.max_renewals
        )));
    }
    if request.is_overdue(now) {
        return Err(AppError::BusinessRule(
            "Overdue loans cannot be renewed, please return the book".to_string(),
        ));
    }

    let from = request.due_date.unwrap_or(now);
    Ok(from + Duration::days(config.default_loan_days))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approved(due_in_days: i64, renewal_count: i32) -> BorrowRequest {
        let now = Utc::now();
        BorrowRequest {
            id: 1,
            user_id: 7,
            book_id: 3,
            status: BorrowStatus::Approved,
            request_date: now - Duration::days(10),
            due_date: Some(now + Duration::days(due_in_days)),
            notes: None,
            admin_response: None,
            processed_at: Some(now - Duration::days(9)),
            returned_at: None,
            renewal_count,
        }
    }

    #[test]
    fn renewal_extends_from_current_due_date() {
        let config = LoansConfig::default();
        let request = approved(3, 0);
        let due = renewed_due_date(&request, Utc::now(), &config).unwrap();
        assert_eq!(
            due,
            request.due_date.unwrap() + Duration::days(config.default_loan_days)
        );
    }

    #[test]
    fn renewal_limit_is_enforced() {
        let config = LoansConfig::default();
        let request = approved(3, config.max_renewals);
        assert!(matches!(
            renewed_due_date(&request, Utc::now(), &config),
            Err(AppError::BusinessRule(_))
        ));
    }

    #[test]
    fn overdue_loans_cannot_be_renewed() {
        let request = approved(-1, 0);
        assert!(renewed_due_date(&request, Utc::now(), &LoansConfig::default()).is_err());
    }

    #[test]
    fn only_approved_requests_renew() {
        let mut request = approved(3, 0);
        request.status = BorrowStatus::Pending;
        assert!(renewed_due_date(&request, Utc::now(), &LoansConfig::default()).is_err());
    }
}
