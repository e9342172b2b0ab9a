//! Business logic services

pub mod catalog;
pub mod lending;

use std::sync::Arc;

use crate::{clock::Clock, config::LendingConfig, models::LoanPolicy, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, lending_config: &LendingConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone()),
            lending: lending::LendingService::new(
                repository,
                LoanPolicy::from(lending_config),
                clock,
            ),
        }
    }
}
