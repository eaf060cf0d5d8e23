mod channel;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;

use rusqlite::Connection;
use tracing::debug;

pub(super) use channel::Command;

use super::config::SqliteConfig;
use super::error::SqliteClientError;
use super::query::run_query;
use crate::events::{ClientEvent, EventEmitter};
use crate::types::ChangeUserOptions;

/// Flags shared between a connection handle and its worker thread.
#[derive(Debug, Default)]
pub(super) struct Shared {
    closed: AtomicBool,
    destroyed: AtomicBool,
}

impl Shared {
    pub(super) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(super) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(super) fn mark_destroyed(&self) {
        self.destroyed.store(true, Ordering::Release);
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

/// State owned by the worker thread.
pub(super) struct Session {
    config: SqliteConfig,
    conn: Option<Connection>,
    shared: Arc<Shared>,
    events: EventEmitter,
    thread_id: u64,
}

impl Session {
    pub(super) fn new(
        config: SqliteConfig,
        shared: Arc<Shared>,
        events: EventEmitter,
        thread_id: u64,
    ) -> Self {
        Self {
            config,
            conn: None,
            shared,
            events,
            thread_id,
        }
    }

    fn open(&mut self) -> Result<(), SqliteClientError> {
        let conn = Connection::open(&self.config.path)?;
        conn.busy_timeout(self.config.busy_timeout())?;
        debug!(thread_id = self.thread_id, path = %self.config.path, "SQLite connection opened");
        self.conn = Some(conn);
        Ok(())
    }

    /// Implicitly connect before the first command, as callback clients do.
    fn ensure_open(&mut self) -> Result<&Connection, SqliteClientError> {
        if self.conn.is_none()
            && let Err(err) = self.open()
        {
            self.events.emit(&ClientEvent::Error {
                message: err.to_string(),
            });
            return Err(err);
        }
        self.conn.as_ref().ok_or(SqliteClientError::Closed)
    }

    fn connect(&mut self) -> Result<(), SqliteClientError> {
        if self.conn.is_some() {
            return Err(SqliteClientError::AlreadyConnected);
        }
        self.open()
    }

    fn close(&mut self) -> Result<(), SqliteClientError> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, err)| err.into()),
            None => Ok(()),
        }
    }

    fn change_user(&mut self, options: &ChangeUserOptions) -> Result<(), SqliteClientError> {
        if options.user.is_some() || options.password.is_some() {
            return Err(SqliteClientError::Unsupported(
                "SQLite has no user accounts".into(),
            ));
        }
        // Text is always UTF-8, so a charset request needs no action.
        if let Some(database) = &options.database {
            self.close()?;
            self.config.path.clone_from(database);
            self.open()?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SqliteClientError> {
        match &self.conn {
            Some(conn) if !conn.is_autocommit() => {
                debug!(thread_id = self.thread_id, "rolling back transaction left open by lease");
                conn.execute_batch("ROLLBACK").map_err(Into::into)
            }
            _ => Ok(()),
        }
    }
}

pub(super) fn run_sqlite_worker(mut session: Session, receiver: &Receiver<Command>) {
    while let Ok(command) = receiver.recv() {
        if session.shared.is_destroyed() {
            if let Command::Destroy { done } = command {
                session.conn.take();
                session.shared.mark_closed();
                done(Ok(()));
                break;
            }
            command.fail(SqliteClientError::Closed);
            continue;
        }

        match command {
            Command::Connect { done } => done(session.connect()),
            Command::Query { sql, params, done } => {
                let outcome = session
                    .ensure_open()
                    .and_then(|conn| run_query(conn, &sql, params.as_deref()));
                done(outcome);
            }
            Command::Execute { sql, done } => {
                let outcome = session
                    .ensure_open()
                    .and_then(|conn| conn.execute_batch(sql).map_err(Into::into));
                done(outcome);
            }
            Command::ChangeUser { options, done } => done(session.change_user(&options)),
            Command::Reset { done } => done(session.reset()),
            Command::End { done } => {
                let outcome = session.close();
                session.shared.mark_closed();
                done(outcome);
                break;
            }
            Command::Destroy { done } => {
                session.conn.take();
                session.shared.mark_closed();
                done(Ok(()));
                break;
            }
        }
    }

    session.shared.mark_closed();
    while let Ok(command) = receiver.try_recv() {
        command.fail(SqliteClientError::Closed);
    }
    debug!(thread_id = session.thread_id, "SQLite worker stopped");
}
