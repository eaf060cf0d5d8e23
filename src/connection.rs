use tracing::{debug, warn};

use crate::error::SqlAwaitError;
use crate::events::{EventHandler, EventKind};
use crate::pending::pending;
use crate::raw::{PooledRawConnection, RawConnection};
use crate::transaction_state::TransactionState;
use crate::types::{ChangeUserOptions, RowValues};

/// Awaitable, transaction-aware wrapper around one raw connection.
///
/// Both standalone connections and connections leased from an
/// [`AwaitablePool`](crate::pool::AwaitablePool) are this type, so every connection honours the
/// same contract: a commit or query that fails while a transaction is open rolls that same
/// connection back before the original error is returned.
///
/// Operations that can change the transaction state take `&mut self`, so only one of them can be
/// in flight per connection.
pub struct AwaitableConnection<C: RawConnection> {
    raw: C,
    tx: TransactionState,
}

impl<C: RawConnection> AwaitableConnection<C> {
    #[must_use]
    pub fn new(raw: C) -> Self {
        Self {
            raw,
            tx: TransactionState::new(),
        }
    }

    /// Callback-style surface of the underlying client.
    #[must_use]
    pub fn raw(&self) -> &C {
        &self.raw
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.tx.is_open()
    }

    /// Clear the transaction flag after a standalone [`rollback`](Self::rollback).
    pub fn mark_transaction_closed(&mut self) {
        self.tx.close();
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

    /// Open the underlying connection.
    ///
    /// # Errors
    /// Returns the raw client's connect error unmodified.
    pub async fn connect(&self) -> Result<(), SqlAwaitError<C::Error>> {
        let (done, op) = pending("connect");
        self.raw.connect(done);
        op.settle().await
    }

    /// Start a transaction; the flag is set only once the client confirms.
    ///
    /// # Errors
    /// Returns the raw client's error unmodified; the flag is left as it was.
    pub async fn begin_transaction(&mut self) -> Result<(), SqlAwaitError<C::Error>> {
        let (done, op) = pending("begin_transaction");
        self.raw.begin_transaction(done);
        op.settle().await?;
        self.tx.begin();
        debug!("transaction opened");
        Ok(())
    }

    /// Commit the open transaction.
    ///
    /// # Errors
    /// Returns the commit error unmodified. If a transaction was open, the connection has already
    /// been rolled back when this returns.
    pub async fn commit(&mut self) -> Result<(), SqlAwaitError<C::Error>> {
        let (done, op) = pending("commit");
        self.raw.commit(done);
        match op.settle().await {
            Ok(()) => {
                self.tx.close();
                debug!("transaction committed");
                Ok(())
            }
            Err(err) => {
                if self.tx.is_open() {
                    self.compensate("commit").await;
                }
                self.tx.close();
                Err(err)
            }
        }
    }

    /// Run `sql` using the client's parameterless call form.
    ///
    /// # Errors
    /// Returns the query error unmodified. If a transaction was open, the connection has already
    /// been rolled back when this returns.
    pub async fn query(&mut self, sql: &str) -> Result<C::Output, SqlAwaitError<C::Error>> {
        let (done, op) = pending("query");
        self.raw.query(sql, done);
        let outcome = op.settle().await;
        self.settle_query(outcome).await
    }

    /// Run `sql` using the client's parameterized call form, even for an empty `params`.
    ///
    /// # Errors
    /// Returns the query error unmodified. If a transaction was open, the connection has already
    /// been rolled back when this returns.
    pub async fn query_with_params(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<C::Output, SqlAwaitError<C::Error>> {
        let (done, op) = pending("query");
        self.raw.query_with_params(sql, params, done);
        let outcome = op.settle().await;
        self.settle_query(outcome).await
    }

    /// Roll back. Always resolves; the client's own rollback error is discarded.
    ///
    /// The transaction flag is left as it was; see
    /// [`mark_transaction_closed`](Self::mark_transaction_closed).
    pub async fn rollback(&mut self) {
        self.issue_rollback("rollback").await;
    }

    /// # Errors
    /// Returns the raw client's error unmodified.
    pub async fn change_user(
        &self,
        options: &ChangeUserOptions,
    ) -> Result<(), SqlAwaitError<C::Error>> {
        let (done, op) = pending("change_user");
        self.raw.change_user(options, done);
        op.settle().await
    }

    /// Close the connection once queued work has run. No rollback is attempted.
    ///
    /// # Errors
    /// Returns the raw client's error unmodified.
    pub async fn end(&mut self) -> Result<(), SqlAwaitError<C::Error>> {
        let (done, op) = pending("end");
        self.raw.end(done);
        let outcome = op.settle().await;
        self.tx.close();
        outcome
    }

    /// Tear the connection down immediately. No rollback is attempted.
    ///
    /// # Errors
    /// Returns the raw client's error unmodified.
    pub async fn destroy(&mut self) -> Result<(), SqlAwaitError<C::Error>> {
        let (done, op) = pending("destroy");
        self.raw.destroy(done);
        let outcome = op.settle().await;
        self.tx.close();
        outcome
    }

    async fn settle_query(
        &mut self,
        outcome: Result<C::Output, SqlAwaitError<C::Error>>,
    ) -> Result<C::Output, SqlAwaitError<C::Error>> {
        if outcome.is_err() && self.tx.is_open() {
            self.compensate("query").await;
            self.tx.close();
        }
        outcome
    }

    async fn compensate(&mut self, failed: &'static str) {
        debug!(operation = failed, "rolling back after failure inside transaction");
        self.issue_rollback(failed).await;
    }

    async fn issue_rollback(&self, reason: &'static str) {
        let (done, op) = pending::<(), C::Error>("rollback");
        self.raw.rollback(done);
        if let Err(err) = op.settle().await {
            warn!(reason, error = %err, "rollback failed; outcome discarded");
        }
    }
}

impl<C: PooledRawConnection> AwaitableConnection<C> {
    /// Hand the lease back to the pool it came from.
    pub fn release(self) {
        if self.tx.is_open() {
            warn!("releasing pooled connection with an open transaction");
        }
        self.raw.release();
    }
}

impl<C: RawConnection + std::fmt::Debug> std::fmt::Debug for AwaitableConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwaitableConnection")
            .field("raw", &self.raw)
            .field("in_transaction", &self.tx.is_open())
            .finish()
    }
}
