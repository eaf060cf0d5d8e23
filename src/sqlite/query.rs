use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};

use super::error::SqliteClientError;
use super::params::sqlite_value_to_row_value;
use crate::results::{QueryOutcome, ResultSet};
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
/// Returns `SqliteClientError` if the value cannot be read.
pub fn sqlite_extract_value(row: &Row<'_>, idx: usize) -> Result<RowValues, SqliteClientError> {
    let value: Value = row.get(idx)?;
    Ok(sqlite_value_to_row_value(value))
}

/// Run one statement.
///
/// `None` params runs the statement without binding anything (unbound placeholders read as NULL);
/// `Some` binds every value and lets SQLite reject a count mismatch.
///
/// # Errors
/// Returns `SqliteClientError::Sqlite` for prepare, bind, or step failures.
pub fn run_query(
    conn: &Connection,
    sql: &str,
    params: Option<&[Value]>,
) -> Result<QueryOutcome, SqliteClientError> {
    let mut stmt = conn.prepare(sql)?;

    if stmt.column_count() == 0 {
        let affected_rows = match params {
            Some(values) => stmt.execute(params_from_iter(values.iter()))?,
            None => stmt.raw_execute()?,
        };
        return Ok(QueryOutcome::Modified {
            affected_rows,
            insert_id: conn.last_insert_rowid(),
        });
    }

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    let mut rows = match params {
        Some(values) => stmt.query(params_from_iter(values.iter()))?,
        None => stmt.raw_query(),
    };
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(QueryOutcome::Rows(result_set))
}
