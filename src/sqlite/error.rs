use deadpool::managed::PoolError;
use thiserror::Error;

/// Errors reported by the bundled SQLite client.
#[derive(Debug, Error)]
pub enum SqliteClientError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection is already established")]
    AlreadyConnected,

    #[error("connection is closed")]
    Closed,

    #[error("pool is closed")]
    PoolClosed,

    #[error("timed out waiting for a pooled connection")]
    PoolTimeout,

    #[error("pool error: {0}")]
    Pool(String),

    #[error("no tokio runtime is available to drive the pool")]
    NoRuntime,

    #[error("unsupported by SQLite: {0}")]
    Unsupported(String),

    #[error("{0} completion was lost before it fired")]
    CompletionLost(&'static str),
}

impl From<PoolError<SqliteClientError>> for SqliteClientError {
    fn from(err: PoolError<SqliteClientError>) -> Self {
        match err {
            PoolError::Backend(err) => err,
            PoolError::Closed => SqliteClientError::PoolClosed,
            PoolError::Timeout(_) => SqliteClientError::PoolTimeout,
            other => SqliteClientError::Pool(other.to_string()),
        }
    }
}
