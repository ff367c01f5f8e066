//! Dashboard statistics service

use crate::{error::AppResult, models::stats::LibraryStats, repository::Repository};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_stats(&self) -> AppResult<LibraryStats> {
        self.repository.stats.totals().await
    }
}
