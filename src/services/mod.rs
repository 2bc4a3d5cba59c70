//! Business logic services

pub mod catalog;
pub mod loans;
pub mod sessions;
pub mod stats;

use std::sync::Arc;

use crate::{clock::Clock, config::PaginationConfig, models::Paginator, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub stats: stats::StatsService,
    pub sessions: Arc<dyn sessions::SessionStore>,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(
        repository: Repository,
        clock: Arc<dyn Clock>,
        pagination: &PaginationConfig,
        sessions: Arc<dyn sessions::SessionStore>,
    ) -> Self {
        let paginator = Paginator::new(pagination);
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone(), paginator),
            loans: loans::LoansService::new(repository.clone(), clock, paginator),
            stats: stats::StatsService::new(repository),
            sessions,
        }
    }
}
