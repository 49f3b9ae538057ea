//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::query::PageLimits;
use crate::resources::Repository;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Resource query runner bound to `db`.
    repository: Repository,

    /// Page-size policy for listing requests.
    page_limits: PageLimits,
}

impl AppState {
    /// Connect, migrate and assemble the state.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;
        info!("database migrations applied");

        Ok(Self::from_pool(db, config.page_limits, config.query_timeout))
    }

    /// Assemble state around an existing pool.
    pub fn from_pool(db: PgPool, page_limits: PageLimits, query_timeout: Duration) -> Self {
        let repository = Repository::new(db.clone(), query_timeout);
        Self {
            inner: Arc::new(AppStateInner {
                db,
                repository,
                page_limits,
            }),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.inner.repository
    }

    pub fn page_limits(&self) -> PageLimits {
        self.inner.page_limits
    }

    /// Check if PostgreSQL is reachable.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}
