use rusqlite::types::Value;

use crate::raw::Completion;
use crate::sqlite::error::SqliteClientError;
use crate::results::QueryOutcome;
use crate::types::ChangeUserOptions;

pub(in crate::sqlite) enum Command {
    Connect {
        done: Completion<(), SqliteClientError>,
    },
    Query {
        sql: String,
        params: Option<Vec<Value>>,
        done: Completion<QueryOutcome, SqliteClientError>,
    },
    Execute {
        sql: &'static str,
        done: Completion<(), SqliteClientError>,
    },
    ChangeUser {
        options: ChangeUserOptions,
        done: Completion<(), SqliteClientError>,
    },
    /// Roll back whatever a previous lease left open.
    Reset {
        done: Completion<(), SqliteClientError>,
    },
    End {
        done: Completion<(), SqliteClientError>,
    },
    Destroy {
        done: Completion<(), SqliteClientError>,
    },
}

impl Command {
    /// Complete the command with `err` without running it.
    pub(in crate::sqlite) fn fail(self, err: SqliteClientError) {
        match self {
            Command::Query { done, .. } => done(Err(err)),
            Command::Connect { done }
            | Command::Execute { done, .. }
            | Command::ChangeUser { done, .. }
            | Command::Reset { done }
            | Command::End { done }
            | Command::Destroy { done } => done(Err(err)),
        }
    }
}
