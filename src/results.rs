mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::CustomDbRow;

/// Payload produced by a single statement.
///
/// Statements that return columns surface their rows; everything else reports the rows it
/// touched, mirroring the "OK packet" shape callback clients hand back.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// Rows returned by a SELECT-like statement.
    Rows(ResultSet),
    /// Row count and last generated id for INSERT/UPDATE/DELETE/DDL.
    Modified { affected_rows: usize, insert_id: i64 },
}

impl QueryOutcome {
    /// Borrow the rows, if the statement produced any columns.
    #[must_use]
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            QueryOutcome::Rows(rs) => Some(rs),
            QueryOutcome::Modified { .. } => None,
        }
    }

    /// Rows returned for a query, rows touched for a modification.
    #[must_use]
    pub fn affected_rows(&self) -> usize {
        match self {
            QueryOutcome::Rows(rs) => rs.rows_affected,
            QueryOutcome::Modified { affected_rows, .. } => *affected_rows,
        }
    }

    #[must_use]
    pub fn insert_id(&self) -> Option<i64> {
        match self {
            QueryOutcome::Rows(_) => None,
            QueryOutcome::Modified { insert_id, .. } => Some(*insert_id),
        }
    }
}

impl Default for QueryOutcome {
    fn default() -> Self {
        QueryOutcome::Modified {
            affected_rows: 0,
            insert_id: 0,
        }
    }
}
