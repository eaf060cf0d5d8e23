//! Value escaping and `?` placeholder substitution.
//!
//! Raw clients that interpolate values client-side expose `escape`, `escape_id` and `format`;
//! the defaults on the raw traits use [`Dialect::MySql`], the bundled SQLite client uses
//! [`Dialect::Sqlite`].

mod parsers;
mod scanner;

use std::fmt::Write;

use parsers::{is_block_comment_end, is_block_comment_start, is_doubled, is_line_comment_start};
use scanner::{State, placeholder_run};

use crate::types::RowValues;

/// Quoting rules for a SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Backslash escapes inside string literals, backtick identifiers, `#` comments.
    #[default]
    MySql,
    /// Doubled-quote escapes, double-quoted identifiers.
    Sqlite,
}

impl Dialect {
    /// Render `value` as a SQL literal.
    #[must_use]
    pub fn escape(self, value: &RowValues) -> String {
        match value {
            RowValues::Null => "NULL".to_string(),
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) if f.is_finite() => f.to_string(),
            RowValues::Float(_) => "NULL".to_string(),
            RowValues::Bool(b) => match self {
                Dialect::MySql => b.to_string(),
                Dialect::Sqlite => i64::from(*b).to_string(),
            },
            RowValues::Text(s) => self.quote_string(s),
            RowValues::Timestamp(dt) => {
                self.quote_string(&dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            }
            RowValues::Json(json) => self.quote_string(&json.to_string()),
            RowValues::Blob(bytes) => {
                let mut out = String::with_capacity(bytes.len() * 2 + 3);
                out.push_str("X'");
                for byte in bytes {
                    let _ = write!(out, "{byte:02x}");
                }
                out.push('\'');
                out
            }
        }
    }

    /// Quote an identifier; dots separate qualified parts.
    #[must_use]
    pub fn escape_id(self, identifier: &str) -> String {
        let quote = match self {
            Dialect::MySql => '`',
            Dialect::Sqlite => '"',
        };
        let mut out = String::with_capacity(identifier.len() + 2);
        out.push(quote);
        for ch in identifier.chars() {
            match ch {
                '.' => {
                    out.push(quote);
                    out.push('.');
                    out.push(quote);
                }
                c if c == quote => {
                    out.push(quote);
                    out.push(quote);
                }
                c => out.push(c),
            }
        }
        out.push(quote);
        out
    }

    /// Substitute placeholders in `sql` with escaped `params`, left to right.
    ///
    /// `?` takes an escaped value and `??` an escaped identifier. Longer runs of `?`, placeholders
    /// inside literals or comments, and placeholders beyond the supplied values are left as-is.
    ///
    /// ```rust
    /// use sql_await::format::Dialect;
    /// use sql_await::RowValues;
    ///
    /// let sql = Dialect::MySql.format(
    ///     "SELECT ?? FROM people WHERE lastName = ?",
    ///     &[RowValues::from("age"), RowValues::from("O'Hara")],
    /// );
    /// assert_eq!(sql, "SELECT `age` FROM people WHERE lastName = 'O\\'Hara'");
    /// ```
    #[must_use]
    pub fn format(self, sql: &str, params: &[RowValues]) -> String {
        let bytes = sql.as_bytes();
        let mut values = params.iter();
        let mut out = String::with_capacity(sql.len() + params.len() * 8);
        let mut copied = 0;
        let mut state = State::Normal;
        let mut idx = 0;

        while idx < bytes.len() {
            let b = bytes[idx];
            match state {
                State::Normal => match b {
                    b'\'' => state = State::SingleQuoted,
                    b'"' => state = State::DoubleQuoted,
                    b'`' => state = State::Backticked,
                    b'?' => {
                        let run = placeholder_run(bytes, idx);
                        if run <= 2
                            && let Some(value) = values.next()
                        {
                            out.push_str(&sql[copied..idx]);
                            if run == 2 {
                                out.push_str(&self.escape_identifier_value(value));
                            } else {
                                out.push_str(&self.escape(value));
                            }
                            copied = idx + run;
                        }
                        idx += run;
                        continue;
                    }
                    _ if is_line_comment_start(bytes, idx, self.hash_comments()) => {
                        state = State::LineComment;
                    }
                    _ if is_block_comment_start(bytes, idx) => {
                        state = State::BlockComment;
                        idx += 1;
                    }
                    _ => {}
                },
                State::SingleQuoted | State::DoubleQuoted | State::Backticked => {
                    let quote = match state {
                        State::SingleQuoted => b'\'',
                        State::DoubleQuoted => b'"',
                        _ => b'`',
                    };
                    if b == b'\\' && self.backslash_escapes() && quote != b'`' {
                        idx += 1; // skip escaped byte
                    } else if b == quote {
                        if is_doubled(bytes, idx, quote) {
                            idx += 1;
                        } else {
                            state = State::Normal;
                        }
                    }
                }
                State::LineComment => {
                    if b == b'\n' {
                        state = State::Normal;
                    }
                }
                State::BlockComment => {
                    if is_block_comment_end(bytes, idx) {
                        state = State::Normal;
                        idx += 1;
                    }
                }
            }
            idx += 1;
        }

        out.push_str(&sql[copied..]);
        out
    }

    fn escape_identifier_value(self, value: &RowValues) -> String {
        match value {
            RowValues::Text(name) => self.escape_id(name),
            other => self.escape(other),
        }
    }

    fn quote_string(self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        match self {
            Dialect::MySql => {
                for ch in s.chars() {
                    match ch {
                        '\0' => out.push_str("\\0"),
                        '\u{8}' => out.push_str("\\b"),
                        '\t' => out.push_str("\\t"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\u{1a}' => out.push_str("\\Z"),
                        '"' => out.push_str("\\\""),
                        '\'' => out.push_str("\\'"),
                        '\\' => out.push_str("\\\\"),
                        c => out.push(c),
                    }
                }
            }
            Dialect::Sqlite => {
                for ch in s.chars() {
                    if ch == '\'' {
                        out.push('\'');
                    }
                    out.push(ch);
                }
            }
        }
        out.push('\'');
        out
    }

    fn backslash_escapes(self) -> bool {
        matches!(self, Dialect::MySql)
    }

    fn hash_comments(self) -> bool {
        matches!(self, Dialect::MySql)
    }
}

/// [`Dialect::MySql`] escaping, the default for raw clients.
#[must_use]
pub fn escape(value: &RowValues) -> String {
    Dialect::MySql.escape(value)
}

/// [`Dialect::MySql`] identifier quoting, the default for raw clients.
#[must_use]
pub fn escape_id(identifier: &str) -> String {
    Dialect::MySql.escape_id(identifier)
}

/// [`Dialect::MySql`] placeholder substitution, the default for raw clients.
#[must_use]
pub fn format(sql: &str, params: &[RowValues]) -> String {
    Dialect::MySql.format(sql, params)
}
