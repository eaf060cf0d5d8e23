use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_POOL_MAX_SIZE: usize = 10;

/// Settings for SQLite connections and pools.
///
/// Deserializes from the same JSON shape callers already keep for MySQL-style clients
/// (`database` and `connectionLimit` are accepted as aliases):
/// ```rust
/// use sql_await::sqlite::SqliteConfig;
///
/// let cfg: SqliteConfig =
///     serde_json::from_str(r#"{ "database": "people.db", "connectionLimit": 4 }"#).unwrap();
/// assert_eq!(cfg.path, "people.db");
/// assert_eq!(cfg.pool_max_size, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqliteConfig {
    #[serde(alias = "database")]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_pool_max_size", alias = "connectionLimit")]
    pub pool_max_size: usize,
    /// How long an acquire may wait for a free slot; `None` waits forever.
    #[serde(default, alias = "acquireTimeout")]
    pub pool_wait_timeout_ms: Option<u64>,
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_pool_max_size() -> usize {
    DEFAULT_POOL_MAX_SIZE
}

impl SqliteConfig {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            pool_wait_timeout_ms: None,
        }
    }

    #[must_use]
    pub fn builder(path: impl Into<String>) -> SqliteConfigBuilder {
        SqliteConfigBuilder::new(path)
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    #[must_use]
    pub fn pool_wait_timeout(&self) -> Option<Duration> {
        self.pool_wait_timeout_ms.map(Duration::from_millis)
    }

    /// Slots the pool is built with; a configured size of 0 still gets one slot.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_max_size.max(1)
    }
}

/// Fluent builder for [`SqliteConfig`].
#[derive(Debug, Clone)]
pub struct SqliteConfigBuilder {
    cfg: SqliteConfig,
}

impl SqliteConfigBuilder {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            cfg: SqliteConfig::new(path),
        }
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn pool_max_size(mut self, max_size: usize) -> Self {
        self.cfg.pool_max_size = max_size.max(1);
        self
    }

    #[must_use]
    pub fn pool_wait_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.pool_wait_timeout_ms =
            Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteConfig {
        self.cfg
    }
}
