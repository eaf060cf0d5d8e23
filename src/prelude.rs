//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::client::AwaitableClient;
pub use crate::connection::AwaitableConnection;
pub use crate::error::SqlAwaitError;
pub use crate::events::{ClientEvent, EventHandler, EventKind};
pub use crate::format::Dialect;
pub use crate::pool::AwaitablePool;
pub use crate::raw::{Completion, PooledRawConnection, RawConnection, RawDriver, RawPool};
pub use crate::results::{CustomDbRow, QueryOutcome, ResultSet};
pub use crate::types::{ChangeUserOptions, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{
    SqliteClientError, SqliteConfig, SqliteDriver, SqlitePooledConnection, SqliteRawConnection,
    SqliteRawPool,
};
