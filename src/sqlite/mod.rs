//! Bundled callback-style client over `rusqlite`, with a `deadpool` pool.
//!
//! Each connection owns a worker thread; completions fire on that thread. Wrap it with
//! [`create_connection`] / [`create_pool`] to get the awaitable surface.

pub mod config;
pub mod connection;
pub mod error;
pub mod params;
pub mod pool;
pub mod query;
mod worker;

pub use config::{SqliteConfig, SqliteConfigBuilder};
pub use connection::SqliteRawConnection;
pub use error::SqliteClientError;
pub use pool::{SqliteManager, SqlitePooledConnection, SqliteRawPool};

use crate::client::AwaitableClient;
use crate::connection::AwaitableConnection;
use crate::format::Dialect;
use crate::pool::AwaitablePool;
use crate::raw::RawDriver;
use crate::types::RowValues;

/// [`RawDriver`] for the bundled SQLite client.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl RawDriver for SqliteDriver {
    type Config = SqliteConfig;
    type Connection = SqliteRawConnection;
    type Pool = SqliteRawPool;

    fn create_connection(&self, config: &SqliteConfig) -> SqliteRawConnection {
        SqliteRawConnection::new(config)
    }

    fn create_pool(&self, config: &SqliteConfig) -> SqliteRawPool {
        SqliteRawPool::new(config)
    }

    fn format(&self, sql: &str, params: &[RowValues]) -> String {
        Dialect::Sqlite.format(sql, params)
    }
}

/// Awaitable SQLite connection. Nothing is opened until `connect` or the first command.
#[must_use]
pub fn create_connection(config: &SqliteConfig) -> AwaitableConnection<SqliteRawConnection> {
    AwaitableClient::new(SqliteDriver).create_connection(config)
}

/// Awaitable SQLite pool. Must be used from within a tokio runtime.
#[must_use]
pub fn create_pool(config: &SqliteConfig) -> AwaitablePool<SqliteRawPool> {
    AwaitableClient::new(SqliteDriver).create_pool(config)
}

/// Substitute `?` / `??` placeholders using SQLite quoting.
#[must_use]
pub fn format(sql: &str, params: &[RowValues]) -> String {
    Dialect::Sqlite.format(sql, params)
}
