use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use deadpool::Runtime;
use deadpool::managed::{self, Metrics, Object, RecycleError, RecycleResult};
use tokio::runtime::Handle;
use tracing::debug;

use super::config::SqliteConfig;
use super::connection::SqliteRawConnection;
use super::error::SqliteClientError;
use crate::error::SqlAwaitError;
use crate::events::{ClientEvent, EventEmitter, EventHandler, EventKind};
use crate::format::Dialect;
use crate::pending::pending;
use crate::raw::{Completion, PooledRawConnection, RawConnection, RawPool};
use crate::results::QueryOutcome;
use crate::types::{ChangeUserOptions, RowValues};

type Pool = managed::Pool<SqliteManager>;

fn flatten(err: SqlAwaitError<SqliteClientError>) -> SqliteClientError {
    match err {
        SqlAwaitError::Client(err) => err,
        SqlAwaitError::CallbackDropped(op) => SqliteClientError::CompletionLost(op),
    }
}

/// `deadpool` manager that opens worker-backed SQLite connections.
pub struct SqliteManager {
    config: SqliteConfig,
    events: EventEmitter,
}

impl managed::Manager for SqliteManager {
    type Type = SqliteRawConnection;
    type Error = SqliteClientError;

    async fn create(&self) -> Result<SqliteRawConnection, SqliteClientError> {
        let conn = SqliteRawConnection::new(&self.config);
        let (done, op) = pending("connect");
        conn.connect(done);
        op.settle().await.map_err(flatten)?;

        let pool_events = self.events.clone();
        conn.on(
            EventKind::Error,
            Arc::new(move |event: &ClientEvent| {
                pool_events.emit(event);
            }),
        );
        self.events.emit(&ClientEvent::Connection {
            thread_id: conn.thread_id(),
        });
        Ok(conn)
    }

    async fn recycle(
        &self,
        conn: &mut SqliteRawConnection,
        _metrics: &Metrics,
    ) -> RecycleResult<SqliteClientError> {
        if conn.is_closed() {
            return Err(RecycleError::Backend(SqliteClientError::Closed));
        }
        let (done, op) = pending("reset");
        conn.reset(done);
        op.settle()
            .await
            .map_err(|err| RecycleError::Backend(flatten(err)))
    }
}

/// Callback-style SQLite pool.
///
/// Slot allocation and queueing are `deadpool`'s; this type adds the callback surface, the
/// `connection`/`enqueue`/`acquire`/`release` events, and acquire/execute/release for
/// pool-scoped queries. Callbacks are driven on the ambient tokio runtime.
pub struct SqliteRawPool {
    inner: Result<Pool, String>,
    events: EventEmitter,
}

impl SqliteRawPool {
    #[must_use]
    pub fn new(config: &SqliteConfig) -> Self {
        let events = EventEmitter::new();
        let manager = SqliteManager {
            config: config.clone(),
            events: events.clone(),
        };
        let inner = Pool::builder(manager)
            .max_size(config.pool_size())
            .wait_timeout(config.pool_wait_timeout())
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|err| err.to_string());
        Self { inner, events }
    }

    fn pool(&self) -> Result<&Pool, SqliteClientError> {
        self.inner
            .as_ref()
            .map_err(|err| SqliteClientError::Pool(err.clone()))
    }

    /// Resolve the pool and runtime, or complete `done` with the reason they are unavailable.
    #[allow(clippy::type_complexity)]
    fn prepare<T>(
        &self,
        done: Completion<T, SqliteClientError>,
    ) -> Option<(Pool, Handle, Completion<T, SqliteClientError>)> {
        let pool = match self.pool() {
            Ok(pool) => pool.clone(),
            Err(err) => {
                done(Err(err));
                return None;
            }
        };
        let Ok(handle) = Handle::try_current() else {
            done(Err(SqliteClientError::NoRuntime));
            return None;
        };
        // Best-effort: decided from one status snapshot, so racing acquires may skip or repeat it.
        let status = pool.status();
        if !pool.is_closed() && status.available == 0 && status.size >= status.max_size {
            self.events.emit(&ClientEvent::Enqueue);
        }
        Some((pool, handle, done))
    }

    fn run_pooled(
        &self,
        sql: &str,
        params: Option<Vec<RowValues>>,
        done: Completion<QueryOutcome, SqliteClientError>,
    ) {
        let Some((pool, handle, done)) = self.prepare(done) else {
            return;
        };
        let events = self.events.clone();
        let sql = sql.to_owned();
        handle.spawn(async move {
            let conn = match acquire(&pool, events).await {
                Ok(conn) => conn,
                Err(err) => return done(Err(err)),
            };
            let (query_done, op) = pending("pool query");
            match &params {
                Some(values) => conn.query_with_params(&sql, values, query_done),
                None => conn.query(&sql, query_done),
            }
            let outcome = op.settle().await.map_err(flatten);
            conn.release();
            done(outcome);
        });
    }
}

async fn acquire(
    pool: &Pool,
    events: EventEmitter,
) -> Result<SqlitePooledConnection, SqliteClientError> {
    let object = pool.get().await?;
    let conn = SqlitePooledConnection { object, events };
    debug!(thread_id = conn.thread_id(), "pooled SQLite connection acquired");
    conn.events.emit(&ClientEvent::Acquire {
        thread_id: conn.thread_id(),
    });
    Ok(conn)
}

impl RawPool for SqliteRawPool {
    type Connection = SqlitePooledConnection;

    fn get_connection(&self, done: Completion<SqlitePooledConnection, SqliteClientError>) {
        let Some((pool, handle, done)) = self.prepare(done) else {
            return;
        };
        let events = self.events.clone();
        handle.spawn(async move {
            done(acquire(&pool, events).await);
        });
    }

    fn query(&self, sql: &str, done: Completion<QueryOutcome, SqliteClientError>) {
        self.run_pooled(sql, None, done);
    }

    fn query_with_params(
        &self,
        sql: &str,
        params: &[RowValues],
        done: Completion<QueryOutcome, SqliteClientError>,
    ) {
        self.run_pooled(sql, Some(params.to_vec()), done);
    }

    fn end(&self, done: Completion<(), SqliteClientError>) {
        match self.pool() {
            Ok(pool) if pool.is_closed() => done(Err(SqliteClientError::PoolClosed)),
            Ok(pool) => {
                pool.close();
                debug!("SQLite pool closed");
                done(Ok(()));
            }
            Err(err) => done(Err(err)),
        }
    }

    fn on(&self, event: EventKind, handler: EventHandler) {
        self.events.on(event, handler);
    }

    fn escape(&self, value: &RowValues) -> String {
        Dialect::Sqlite.escape(value)
    }

    fn escape_id(&self, identifier: &str) -> String {
        Dialect::Sqlite.escape_id(identifier)
    }

    fn format(&self, sql: &str, params: &[RowValues]) -> String {
        Dialect::Sqlite.format(sql, params)
    }
}

impl fmt::Debug for SqliteRawPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Ok(pool) => f
                .debug_struct("SqliteRawPool")
                .field("status", &pool.status())
                .finish(),
            Err(err) => f.debug_struct("SqliteRawPool").field("error", err).finish(),
        }
    }
}

/// A lease on a pooled SQLite connection; returns to the pool when released or dropped.
pub struct SqlitePooledConnection {
    object: Object<SqliteManager>,
    events: EventEmitter,
}

impl Deref for SqlitePooledConnection {
    type Target = SqliteRawConnection;

    fn deref(&self) -> &SqliteRawConnection {
        &self.object
    }
}

impl RawConnection for SqlitePooledConnection {
    type Error = SqliteClientError;
    type Output = QueryOutcome;

    fn connect(&self, done: Completion<(), SqliteClientError>) {
        self.object.connect(done);
    }

    fn end(&self, done: Completion<(), SqliteClientError>) {
        self.object.end(done);
    }

    fn destroy(&self, done: Completion<(), SqliteClientError>) {
        self.object.destroy(done);
    }

    fn query(&self, sql: &str, done: Completion<QueryOutcome, SqliteClientError>) {
        self.object.query(sql, done);
    }

    fn query_with_params(
        &self,
        sql: &str,
        params: &[RowValues],
        done: Completion<QueryOutcome, SqliteClientError>,
    ) {
        self.object.query_with_params(sql, params, done);
    }

    fn begin_transaction(&self, done: Completion<(), SqliteClientError>) {
        self.object.begin_transaction(done);
    }

    fn commit(&self, done: Completion<(), SqliteClientError>) {
        self.object.commit(done);
    }

    fn rollback(&self, done: Completion<(), SqliteClientError>) {
        self.object.rollback(done);
    }

    fn change_user(&self, options: &ChangeUserOptions, done: Completion<(), SqliteClientError>) {
        self.object.change_user(options, done);
    }

    fn on(&self, event: EventKind, handler: EventHandler) {
        self.object.on(event, handler);
    }

    fn escape(&self, value: &RowValues) -> String {
        self.object.escape(value)
    }

    fn escape_id(&self, identifier: &str) -> String {
        self.object.escape_id(identifier)
    }

    fn format(&self, sql: &str, params: &[RowValues]) -> String {
        self.object.format(sql, params)
    }
}

impl PooledRawConnection for SqlitePooledConnection {
    fn release(self) {
        drop(self);
    }
}

impl Drop for SqlitePooledConnection {
    fn drop(&mut self) {
        self.events.emit(&ClientEvent::Release {
            thread_id: self.object.thread_id(),
        });
    }
}

impl fmt::Debug for SqlitePooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SqlitePooledConnection")
            .field(&*self.object)
            .finish()
    }
}
