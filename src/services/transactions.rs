//! Circulation log service: browsing and manual walk-in entries

use chrono::{Duration, Utc};

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        pagination::PageRequest,
        transaction::{
            CreateTransaction, NewTransaction, TransactionDetails, TransactionKind,
            TransactionQuery, TransactionSort,
        },
    },
    repository::{books::BooksRepository, transactions::TransactionsRepository, Repository},
};

#[derive(Clone)]
pub struct TransactionsService {
    repository: Repository,
    config: LoansConfig,
}

impl TransactionsService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    pub async fn list(
        &self,
        query: &TransactionQuery,
        page: &PageRequest<TransactionSort>,
    ) -> AppResult<(Vec<TransactionDetails>, i64)> {
        self.repository.transactions.search(query, page).await
    }

    /// The caller's own circulation history
    pub async fn list_mine(
        &self,
        user_id: i32,
        mut query: TransactionQuery,
        page: &PageRequest<TransactionSort>,
    ) -> AppResult<(Vec<TransactionDetails>, i64)> {
        query.user_id = Some(user_id);
        self.repository.transactions.search(&query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<TransactionDetails> {
        self.repository.transactions.get_details(id).await
    }

    /// Record a walk-in issue or return and move the copy counter with it
    pub async fn create(&self, data: CreateTransaction) -> AppResult<TransactionDetails> {
        // Only kinds that move a copy can be recorded by hand
        let delta = data.kind.copy_delta();
        if delta == 0 {
            return Err(AppError::BadRequest(
                "Renewals are recorded through the borrow request renew endpoint".to_string(),
            ));
        }

        // Surface 404s before opening the transaction
        self.repository.users.get_by_id(data.user_id).await?;
        let book = self.repository.books.get_by_id(data.book_id).await?;

        let now = Utc::now();
        let due_date = match data.kind {
            TransactionKind::Issue => Some(
                data.due_date
                    .unwrap_or_else(|| now + Duration::days(self.config.default_loan_days)),
            ),
            _ => data.due_date,
        };

        let mut tx = self.repository.pool.begin().await?;

        let moved = if delta < 0 {
            BooksRepository::take_copy(&mut *tx, book.id).await?
        } else {
            BooksRepository::put_back_copy(&mut *tx, book.id).await?
        };
        if !moved {
            return Err(AppError::BusinessRule(if delta < 0 {
                format!("No copies of '{}' are available", book.title)
            } else {
                format!("Every copy of '{}' is already on the shelf", book.title)
            }));
        }

        let entry = TransactionsRepository::insert(
            &mut *tx,
            &NewTransaction {
                user_id: data.user_id,
                book_id: book.id,
                borrow_request_id: None,
                kind: data.kind,
                due_date,
                notes: data.notes,
            },
        )
        .await?;

        tx.commit().await?;
        tracing::info!(
            "Manual {} recorded id={} user id={} book id={} (copy delta {})",
            entry.kind,
            entry.id,
            entry.user_id,
            entry.book_id,
            delta
        );
        self.repository.transactions.get_details(entry.id).await
    }

    /// Drop a mistaken log entry; copy counters are not touched
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.transactions.delete(id).await?;
        tracing::info!("Transaction deleted id={}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::config::DatabaseConfig;

    fn service() -> TransactionsService {
        // Never connected: the cases below fail before any query
        let pool = PgPoolOptions::new()
            .connect_lazy(&DatabaseConfig::default().url)
            .expect("lazy pool");
        TransactionsService::new(Repository::new(pool), LoansConfig::default())
    }

    #[tokio::test]
    async fn renewal_cannot_be_recorded_by_hand() {
        let err = service()
            .create(CreateTransaction {
                user_id: 1,
                book_id: 1,
                kind: TransactionKind::Renewal,
                due_date: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("renew")));
    }
}
