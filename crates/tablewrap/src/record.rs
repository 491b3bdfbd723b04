//! Row mapping traits and utilities

use crate::error::{TableError, TableResult};
use crate::value::{FromValue, SqlValue};

/// One fetched row: column names with their values, in result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, SqlValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Lookups return the first column with a given name.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push((column.into(), value.into()));
    }

    /// Look up a column value by name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Get a typed column value, returning [`TableError::Decode`] on a missing column or a type
    /// mismatch.
    pub fn try_get<T: FromValue>(&self, column: &str) -> TableResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| TableError::decode_column(column, "column not present in row"))?;
        T::from_value(value).map_err(|e| TableError::decode_column(column, e))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Trait for converting a fetched [`Record`] into a Rust type.
///
/// `COLUMNS` is the statically declared column list used when a read is called with an empty
/// column list. Leave it empty to select `*`.
///
/// This trait should typically be derived using `#[derive(FromRecord)]`
/// from the `tablewrap-derive` crate.
///
/// # Example
///
/// ```ignore
/// use tablewrap::FromRecord;
///
/// #[derive(FromRecord)]
/// #[record(rename_all = "camelCase")]
/// struct Account {
///     id: i64,
///     mobile_no: String,
///     password: Option<String>,
/// }
/// ```
pub trait FromRecord: Sized {
    const COLUMNS: &'static [&'static str] = &[];

    fn from_record(record: &Record) -> TableResult<Self>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> TableResult<Self> {
        Ok(record.clone())
    }
}
