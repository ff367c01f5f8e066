//! Business logic services

pub mod auth;
pub mod borrows;
pub mod catalog;
pub mod categories;
pub mod favorites;
pub mod members;
pub mod stats;
pub mod transactions;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub borrows: borrows::BorrowsService,
    pub catalog: catalog::CatalogService,
    pub categories: categories::CategoriesService,
    pub favorites: favorites::FavoritesService,
    pub members: members::MembersService,
    pub stats: stats::StatsService,
    pub transactions: transactions::TransactionsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            borrows: borrows::BorrowsService::new(repository.clone(), config.loans.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            categories: categories::CategoriesService::new(repository.clone()),
            favorites: favorites::FavoritesService::new(repository.clone()),
            members: members::MembersService::new(repository.clone()),
            stats: stats::StatsService::new(repository.clone()),
            transactions: transactions::TransactionsService::new(
                repository.clone(),
                config.loans.clone(),
            ),
            repository,
        }
    }

    /// Database round trip for the readiness probe
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.repository.ping().await
    }
}
