use crate::dialect::Dialect;
use serde::{Deserialize, Serialize};

/// Configuration for a [`Table`](crate::Table).
///
/// Every field except `table` has a default, so a config can be loaded from a partial
/// document:
///
/// ```ignore
/// let config: TableConfig = serde_json::from_str(r#"{"table": "test_dbwrapper", "debug": true}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name.
    pub table: String,
    /// Placeholder and quoting style of the store.
    #[serde(default)]
    pub dialect: Dialect,
    /// Column addressed by `get`.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Store-generated identity column, reported back by `create`.
    #[serde(default)]
    pub identity_column: Option<String>,
    /// Unique columns an upsert resolves conflicts on. Empty means `[primary_key]`.
    #[serde(default)]
    pub conflict_target: Vec<String>,
    /// Row cap of `update_where`.
    #[serde(default = "default_update_limit")]
    pub update_limit: u64,
    /// Log every statement before it runs.
    #[serde(default)]
    pub debug: bool,
    /// Truncate logged SQL to this many bytes.
    #[serde(default = "default_max_sql_log_length")]
    pub max_sql_log_length: usize,
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_update_limit() -> u64 {
    10_000
}

fn default_max_sql_log_length() -> usize {
    200
}

impl TableConfig {
    /// Create a configuration with defaults.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            dialect: Dialect::default(),
            primary_key: default_primary_key(),
            identity_column: None,
            conflict_target: Vec::new(),
            update_limit: default_update_limit(),
            debug: false,
            max_sql_log_length: default_max_sql_log_length(),
        }
    }

    /// Set the dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the primary key column.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Set the identity column.
    pub fn identity_column(mut self, column: impl Into<String>) -> Self {
        self.identity_column = Some(column.into());
        self
    }

    /// Set the upsert conflict target.
    pub fn conflict_target<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflict_target = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the `update_where` row cap.
    pub fn update_limit(mut self, limit: u64) -> Self {
        self.update_limit = limit;
        self
    }

    /// Enable statement logging.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_log_length(mut self, len: usize) -> Self {
        self.max_sql_log_length = len;
        self
    }

    /// Conflict target with the primary-key fallback applied.
    pub fn effective_conflict_target(&self) -> Vec<&str> {
        if self.conflict_target.is_empty() {
            vec![self.primary_key.as_str()]
        } else {
            self.conflict_target.iter().map(String::as_str).collect()
        }
    }
}
