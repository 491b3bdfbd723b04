//! `tracing`-based SQL debug logging.

use crate::sql::Statement;
use std::time::Duration;
use tracing::Level;

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

/// Tracing target of every statement event.
pub const SQL_TARGET: &str = "tablewrap.sql";

/// Emits the statement an accessor is about to run.
///
/// Events go to target `tablewrap.sql` and are written before execution, so a statement that
/// hangs or fails is still visible.
#[derive(Debug, Clone)]
pub struct SqlLogger {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogger {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    /// Log a statement before it runs.
    pub fn statement(&self, table: &str, op: &str, stmt: &Statement) {
        let sql = self.truncate_sql(&stmt.text);
        let args = tracing::field::debug(&stmt.args);
        emit_at_level!(
            self.level,
            target: SQL_TARGET,
            table,
            op,
            param_count = stmt.args.len(),
            sql = %sql,
            args = args,
        );
    }

    /// Log a finished bulk insert. The statement itself is not logged.
    pub fn bulk_insert(&self, table: &str, records: usize, elapsed: Duration) {
        emit_at_level!(
            self.level,
            target: SQL_TARGET,
            table,
            op = "bulk_insert",
            records,
            elapsed_ms = elapsed.as_millis() as u64,
            "Writes {records} records in {elapsed:?}"
        );
    }
}

/// Cut `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
