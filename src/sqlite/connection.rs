use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SendError, Sender};
use std::thread;

use tracing::error;

use super::config::SqliteConfig;
use super::error::SqliteClientError;
use super::params::convert_params;
use super::worker::{Command, Session, Shared, run_sqlite_worker};
use crate::events::{EventEmitter, EventHandler, EventKind};
use crate::format::Dialect;
use crate::raw::{Completion, RawConnection};
use crate::results::QueryOutcome;
use crate::types::{ChangeUserOptions, RowValues};

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

/// Callback-style SQLite connection backed by a dedicated worker thread.
///
/// Commands run in the order they were issued; completions fire on the worker thread. The
/// database is opened by [`connect`](RawConnection::connect) or implicitly by the first command.
pub struct SqliteRawConnection {
    sender: Sender<Command>,
    shared: Arc<Shared>,
    events: EventEmitter,
    thread_id: u64,
}

impl SqliteRawConnection {
    #[must_use]
    pub fn new(config: &SqliteConfig) -> Self {
        let (sender, receiver) = mpsc::channel::<Command>();
        let thread_id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(Shared::default());
        let events = EventEmitter::new();
        let session = Session::new(
            config.clone(),
            Arc::clone(&shared),
            events.clone(),
            thread_id,
        );

        let spawned = thread::Builder::new()
            .name(format!("sqlite-worker-{thread_id}"))
            .spawn(move || run_sqlite_worker(session, &receiver));
        if let Err(err) = spawned {
            error!(thread_id, error = %err, "failed to spawn SQLite worker thread");
            shared.mark_closed();
        }

        Self {
            sender,
            shared,
            events,
            thread_id,
        }
    }

    /// Process-unique id of this connection.
    #[must_use]
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    /// True once the connection has ended, been destroyed, or lost its worker.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub(super) fn reset(&self, done: Completion<(), SqliteClientError>) {
        self.dispatch(Command::Reset { done });
    }

    fn dispatch(&self, command: Command) {
        if self.shared.is_closed() {
            command.fail(SqliteClientError::Closed);
            return;
        }
        if let Err(SendError(command)) = self.sender.send(command) {
            command.fail(SqliteClientError::Closed);
        }
    }
}

impl RawConnection for SqliteRawConnection {
    type Error = SqliteClientError;
    type Output = QueryOutcome;

    fn connect(&self, done: Completion<(), SqliteClientError>) {
        self.dispatch(Command::Connect { done });
    }

    fn end(&self, done: Completion<(), SqliteClientError>) {
        self.dispatch(Command::End { done });
    }

    fn destroy(&self, done: Completion<(), SqliteClientError>) {
        if self.shared.is_closed() {
            done(Ok(()));
            return;
        }
        self.shared.mark_destroyed();
        self.dispatch(Command::Destroy { done });
    }

    fn query(&self, sql: &str, done: Completion<QueryOutcome, SqliteClientError>) {
        self.dispatch(Command::Query {
            sql: sql.to_owned(),
            params: None,
            done,
        });
    }

    fn query_with_params(
        &self,
        sql: &str,
        params: &[RowValues],
        done: Completion<QueryOutcome, SqliteClientError>,
    ) {
        self.dispatch(Command::Query {
            sql: sql.to_owned(),
            params: Some(convert_params(params)),
            done,
        });
    }

    fn begin_transaction(&self, done: Completion<(), SqliteClientError>) {
        self.dispatch(Command::Execute { sql: "BEGIN", done });
    }

    fn commit(&self, done: Completion<(), SqliteClientError>) {
        self.dispatch(Command::Execute {
            sql: "COMMIT",
            done,
        });
    }

    fn rollback(&self, done: Completion<(), SqliteClientError>) {
        self.dispatch(Command::Execute {
            sql: "ROLLBACK",
            done,
        });
    }

    fn change_user(&self, options: &ChangeUserOptions, done: Completion<(), SqliteClientError>) {
        self.dispatch(Command::ChangeUser {
            options: options.clone(),
            done,
        });
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

impl fmt::Debug for SqliteRawConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteRawConnection")
            .field("thread_id", &self.thread_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
