//! Awaitable, transaction-aware wrappers for callback-based SQL clients.
//!
//! A raw client (see [`raw`]) reports every operation through a one-shot callback. This crate
//! turns those callbacks into futures and adds one guarantee on top: when a commit or query fails
//! while a transaction is open, the same connection is rolled back before the original error is
//! returned.
//!
//! ```rust
//! use sql_await::prelude::*;
//! use sql_await::test_utils::{MockDriver, MockError, MockScript, Op};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let script = MockScript::new();
//! let client = AwaitableClient::new(MockDriver::new(&script));
//! let mut conn = client.create_connection(&());
//!
//! conn.begin_transaction().await.unwrap();
//! script.fail_next(Op::Query, MockError::new("ER_PARSE_ERROR", "syntax error"));
//! let err = conn.query("SELECTJKLSDF").await.unwrap_err();
//!
//! assert_eq!(err.client().map(|e| e.code.as_str()), Some("ER_PARSE_ERROR"));
//! assert!(!conn.in_transaction());
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod events;
pub mod format;
pub mod pending;
pub mod pool;
pub mod prelude;
pub mod raw;
pub mod results;
pub mod transaction_state;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::AwaitableClient;
pub use connection::AwaitableConnection;
pub use error::SqlAwaitError;
pub use events::{ClientEvent, EventEmitter, EventHandler, EventKind};
pub use pool::AwaitablePool;
pub use raw::{Completion, PooledRawConnection, RawConnection, RawDriver, RawPool};
pub use results::{CustomDbRow, QueryOutcome, ResultSet};
pub use transaction_state::TransactionState;
pub use types::{ChangeUserOptions, RowValues};
