//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::query::PageLimits;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Page size when a request gives none, and the clamp for oversized ones.
    pub page_limits: PageLimits,

    /// Deadline for one list or detail operation (default: 30s).
    pub query_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let default_limit: u64 = env::var("PAGE_LIMIT_DEFAULT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("PAGE_LIMIT_DEFAULT must be a valid u64")?;

        let max_limit: u64 = env::var("PAGE_LIMIT_MAX")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .context("PAGE_LIMIT_MAX must be a valid u64")?;

        let page_limits = page_limits(default_limit, max_limit)?;

        let query_timeout_secs: u64 = env::var("QUERY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("QUERY_TIMEOUT_SECS must be a valid u64")?;

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            cors_allowed_origins,
            page_limits,
            query_timeout: Duration::from_secs(query_timeout_secs),
        })
    }
}

fn page_limits(default_limit: u64, max_limit: u64) -> Result<PageLimits> {
    if default_limit == 0 || max_limit == 0 {
        bail!("page limits must be positive");
    }
    if default_limit > max_limit {
        bail!("PAGE_LIMIT_DEFAULT ({default_limit}) exceeds PAGE_LIMIT_MAX ({max_limit})");
    }
    if i64::try_from(max_limit).is_err() {
        bail!("PAGE_LIMIT_MAX ({max_limit}) does not fit a BIGINT");
    }
    Ok(PageLimits {
        default_limit,
        max_limit,
    })
}
