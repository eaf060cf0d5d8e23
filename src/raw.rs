//! Capability traits for callback-based database clients.
//!
//! Everything in this crate talks to the database through these traits. A raw client performs
//! the real I/O and reports each outcome by invoking the [`Completion`] it was handed, exactly
//! once, from whatever thread it likes.

use crate::events::{EventHandler, EventKind};
use crate::format;
use crate::types::{ChangeUserOptions, RowValues};

/// One-shot completion callback handed to every raw operation.
pub type Completion<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

/// Error type reported by the connections a pool hands out.
pub type PoolErrorOf<P> = <<P as RawPool>::Connection as RawConnection>::Error;

/// Query payload produced by the connections a pool hands out.
pub type PoolOutputOf<P> = <<P as RawPool>::Connection as RawConnection>::Output;

/// A single callback-based connection.
pub trait RawConnection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: Send + 'static;

    fn connect(&self, done: Completion<(), Self::Error>);

    /// Close gracefully once queued work has run.
    fn end(&self, done: Completion<(), Self::Error>);

    /// Tear down immediately; queued work is abandoned.
    fn destroy(&self, done: Completion<(), Self::Error>);

    /// Parameterless call form: `sql` is sent as-is and nothing is bound.
    fn query(&self, sql: &str, done: Completion<Self::Output, Self::Error>);

    /// Parameterized call form, even when `params` is empty.
    fn query_with_params(
        &self,
        sql: &str,
        params: &[RowValues],
        done: Completion<Self::Output, Self::Error>,
    );

    fn begin_transaction(&self, done: Completion<(), Self::Error>);

    fn commit(&self, done: Completion<(), Self::Error>);

    fn rollback(&self, done: Completion<(), Self::Error>);

    fn change_user(&self, options: &ChangeUserOptions, done: Completion<(), Self::Error>);

    fn on(&self, event: EventKind, handler: EventHandler);

    fn escape(&self, value: &RowValues) -> String {
        format::escape(value)
    }

    fn escape_id(&self, identifier: &str) -> String {
        format::escape_id(identifier)
    }

    fn format(&self, sql: &str, params: &[RowValues]) -> String {
        format::format(sql, params)
    }
}

/// A connection leased from a [`RawPool`].
pub trait PooledRawConnection: RawConnection {
    /// Hand the lease back to its pool.
    fn release(self);
}

/// A callback-based connection pool.
pub trait RawPool: Send + Sync + 'static {
    type Connection: PooledRawConnection;

    fn get_connection(&self, done: Completion<Self::Connection, PoolErrorOf<Self>>);

    /// Pool-scoped parameterless query; lease handling is the pool's concern.
    fn query(&self, sql: &str, done: Completion<PoolOutputOf<Self>, PoolErrorOf<Self>>);

    /// Pool-scoped parameterized query; lease handling is the pool's concern.
    fn query_with_params(
        &self,
        sql: &str,
        params: &[RowValues],
        done: Completion<PoolOutputOf<Self>, PoolErrorOf<Self>>,
    );

    /// Close every connection; later acquires fail.
    fn end(&self, done: Completion<(), PoolErrorOf<Self>>);

    fn on(&self, event: EventKind, handler: EventHandler);

    fn escape(&self, value: &RowValues) -> String {
        format::escape(value)
    }

    fn escape_id(&self, identifier: &str) -> String {
        format::escape_id(identifier)
    }

    fn format(&self, sql: &str, params: &[RowValues]) -> String {
        format::format(sql, params)
    }
}

/// Factory for raw connections and pools sharing one configuration type.
pub trait RawDriver: Send + Sync + 'static {
    type Config;
    type Connection: RawConnection;
    type Pool: RawPool;

    fn create_connection(&self, config: &Self::Config) -> Self::Connection;

    fn create_pool(&self, config: &Self::Config) -> Self::Pool;

    fn format(&self, sql: &str, params: &[RowValues]) -> String {
        format::format(sql, params)
    }
}
