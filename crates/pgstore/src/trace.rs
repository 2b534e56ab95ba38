//! SQL logging.

use crate::stmt::Statement;
use tracing::Level;

/// Emits every statement a repository runs as a `tracing` event on `pgstore::sql`.
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

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: Option<usize>) -> Self {
        self.max_sql_length = len;
        self
    }

    fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }

    /// Log `sql` about to run for `operation`.
    pub fn log_sql(&self, operation: &str, sql: &str, param_count: usize) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN => tracing::warn!($($field)*),
                    Level::INFO => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "pgstore::sql",
            operation,
            param_count,
            sql = %sql,
        );
    }

    pub fn log(&self, operation: &str, statement: &Statement) {
        self.log_sql(operation, &statement.sql, statement.values.len());
    }
}

/// Longest prefix of `sql` within `max_bytes` that ends on a char boundary.
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
