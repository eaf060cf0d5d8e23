//! Helper utilities for testing and development.

use std::sync::Arc;

use crate::results::{QueryOutcome, ResultSet};
use crate::types::RowValues;

/// Build a `QueryOutcome::Rows` from column names and row values.
#[must_use]
pub fn rows_outcome(column_names: &[&str], rows: Vec<Vec<RowValues>>) -> QueryOutcome {
    let mut rs = ResultSet::with_capacity(rows.len());
    rs.set_column_names(Arc::new(
        column_names.iter().map(|c| (*c).to_string()).collect(),
    ));
    for row in rows {
        rs.add_row_values(row);
    }
    QueryOutcome::Rows(rs)
}
