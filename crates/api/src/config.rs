use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use stockroom_infra::DEFAULT_PAGE_SIZE;
use stockroom_observability::LogFormat;

/// `STOCKROOM_DATABASE_URL` value selecting the in-memory backend.
pub const MEMORY_DATABASE: &str = "memory";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// `sqlite://...` URL, or `memory` for a non-persistent table.
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    /// Rows fetched per round trip when listing.
    pub page_size: u64,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("STOCKROOM_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://stockroom.db?mode=rwc".to_string()),
            bind_addr: env::var("STOCKROOM_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
                .parse()
                .context("STOCKROOM_BIND_ADDR must be host:port")?,
            request_timeout: Duration::from_secs(
                env::var("STOCKROOM_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("STOCKROOM_REQUEST_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            page_size: env::var("STOCKROOM_PAGE_SIZE")
                .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
                .parse()
                .context("STOCKROOM_PAGE_SIZE must be a positive number")?,
            log_format: env::var("STOCKROOM_LOG_FORMAT")
                .unwrap_or_else(|_| "json".to_string())
                .parse()
                .map_err(|e: String| anyhow!(e))?,
        })
    }

    /// Configuration for tests and demos: in-memory table, ephemeral port.
    pub fn in_memory() -> Self {
        Self {
            database_url: MEMORY_DATABASE.to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            request_timeout: Duration::from_secs(10),
            page_size: DEFAULT_PAGE_SIZE,
            log_format: LogFormat::Pretty,
        }
    }

    pub fn uses_memory(&self) -> bool {
        self.database_url == MEMORY_DATABASE
    }
}
