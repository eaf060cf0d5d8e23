use crate::connection::AwaitableConnection;
use crate::error::SqlAwaitError;
use crate::events::{EventHandler, EventKind};
use crate::pending::pending;
use crate::raw::{PoolErrorOf, PoolOutputOf, RawPool};
use crate::types::RowValues;

/// Awaitable wrapper around a raw connection pool.
///
/// Leases come back as [`AwaitableConnection`], the same type standalone connections use, and
/// must be handed back with [`AwaitableConnection::release`]. Pool-scoped queries are assumed
/// to run outside any transaction and are never compensated.
pub struct AwaitablePool<P: RawPool> {
    raw: P,
}

impl<P: RawPool> AwaitablePool<P> {
    #[must_use]
    pub fn new(raw: P) -> Self {
        Self { raw }
    }

    /// Callback-style surface of the underlying pool.
    #[must_use]
    pub fn raw(&self) -> &P {
        &self.raw
    }

    pub fn on(&self, event: EventKind, handler: EventHandler) {
        self.raw.on(event, handler);
    }

    #[must_use]
    pub fn escape(&self, value: &RowValues) -> String {
        self.raw.escape(value)
    }

    #[must_use]
    pub fn escape_id(&self, identifier: &str) -> String {
        self.raw.escape_id(identifier)
    }

    #[must_use]
    pub fn format(&self, sql: &str, params: &[RowValues]) -> String {
        self.raw.format(sql, params)
    }

    /// Lease a connection; it starts outside any transaction.
    ///
    /// # Errors
    /// Returns the pool's acquire error unmodified (for example once the pool has ended).
    pub async fn get_connection(
        &self,
    ) -> Result<AwaitableConnection<P::Connection>, SqlAwaitError<PoolErrorOf<P>>> {
        let (done, op) = pending("get_connection");
        self.raw.get_connection(done);
        op.settle().await.map(AwaitableConnection::new)
    }

    /// Run `sql` on whichever connection the pool picks, parameterless form.
    ///
    /// # Errors
    /// Returns the raw error unmodified.
    pub async fn query(&self, sql: &str) -> Result<PoolOutputOf<P>, SqlAwaitError<PoolErrorOf<P>>> {
        let (done, op) = pending("pool query");
        self.raw.query(sql, done);
        op.settle().await
    }

    /// Run `sql` on whichever connection the pool picks, parameterized form.
    ///
    /// # Errors
    /// Returns the raw error unmodified.
    pub async fn query_with_params(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<PoolOutputOf<P>, SqlAwaitError<PoolErrorOf<P>>> {
        let (done, op) = pending("pool query");
        self.raw.query_with_params(sql, params, done);
        op.settle().await
    }

    /// End the pool and every connection it holds.
    ///
    /// # Errors
    /// Returns the raw error unmodified.
    pub async fn end(&self) -> Result<(), SqlAwaitError<PoolErrorOf<P>>> {
        let (done, op) = pending("pool end");
        self.raw.end(done);
        op.settle().await
    }
}

impl<P: RawPool + std::fmt::Debug> std::fmt::Debug for AwaitablePool<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwaitablePool")
            .field("raw", &self.raw)
            .finish()
    }
}
