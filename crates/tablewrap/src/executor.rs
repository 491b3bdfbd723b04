//! Statement execution against a live connection.
//!
//! [`Executor`] is the one seam between statement building and the store. Implementations
//! return their native error type; the accessor classifies it exactly once.

use crate::error::StoreError;
use crate::record::Record;
use crate::value::SqlValue;
use std::future::Future;
use thiserror::Error;
use tokio_postgres::{Column, Row};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{ToSql, Type};

/// Outcome of a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Identity generated by the insert, when the store reports one.
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// A connection (or transaction) that can run parameterized statements.
///
/// `args` line up one-to-one with the placeholders in `sql`.
pub trait Executor: Send + Sync {
    /// Store-native error.
    type Error: StoreError;

    /// Run a statement and return every row.
    fn query(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send;

    /// Run a statement and report affected rows.
    fn execute(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> impl Future<Output = Result<ExecResult, Self::Error>> + Send;
}

/// Error of the `tokio-postgres` executors.
#[derive(Debug, Error)]
pub enum PgStoreError {
    #[error(transparent)]
    Driver(#[from] tokio_postgres::Error),

    #[error("column '{column}' has unsupported type {ty}")]
    UnsupportedType { column: String, ty: String },
}

impl StoreError for PgStoreError {
    fn is_unique_violation(&self) -> bool {
        match self {
            PgStoreError::Driver(e) => e.code() == Some(&SqlState::UNIQUE_VIOLATION),
            PgStoreError::UnsupportedType { .. } => false,
        }
    }
}

fn params(args: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|a| a as &(dyn ToSql + Sync)).collect()
}

fn rows_to_records(rows: Vec<Row>) -> Result<Vec<Record>, PgStoreError> {
    rows.iter().map(row_to_record).collect()
}

/// Convert a driver row into a [`Record`], keeping column order.
pub fn row_to_record(row: &Row) -> Result<Record, PgStoreError> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        record.push(column.name(), column_value(row, idx, column)?);
    }
    Ok(record)
}

fn column_value(row: &Row, idx: usize, column: &Column) -> Result<SqlValue, PgStoreError> {
    let ty = column.type_();
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        Type::OID => row.try_get::<_, Option<u32>>(idx)?.into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(idx)?.into()
        }
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.into(),
        Type::TIMESTAMP => row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)?.into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)?
            .into(),
        Type::UUID => row.try_get::<_, Option<uuid::Uuid>>(idx)?.into(),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map_or(SqlValue::Null, SqlValue::from),
        _ => {
            return Err(PgStoreError::UnsupportedType {
                column: column.name().to_string(),
                ty: ty.name().to_string(),
            });
        }
    };
    Ok(value)
}

impl Executor for tokio_postgres::Client {
    type Error = PgStoreError;

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Record>, PgStoreError> {
        let rows = tokio_postgres::Client::query(self, sql, &params(args)).await?;
        rows_to_records(rows)
    }

    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult, PgStoreError> {
        let n = tokio_postgres::Client::execute(self, sql, &params(args)).await?;
        Ok(ExecResult::new(n))
    }
}

impl Executor for tokio_postgres::Transaction<'_> {
    type Error = PgStoreError;

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Record>, PgStoreError> {
        let rows = tokio_postgres::Transaction::query(self, sql, &params(args)).await?;
        rows_to_records(rows)
    }

    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult, PgStoreError> {
        let n = tokio_postgres::Transaction::execute(self, sql, &params(args)).await?;
        Ok(ExecResult::new(n))
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::ClientWrapper {
    type Error = PgStoreError;

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Record>, PgStoreError> {
        Executor::query(&**self, sql, args).await
    }

    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult, PgStoreError> {
        Executor::execute(&**self, sql, args).await
    }
}

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Client {
    type Error = PgStoreError;

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Record>, PgStoreError> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        Executor::query(&**self, sql, args).await
    }

    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult, PgStoreError> {
        Executor::execute(&**self, sql, args).await
    }
}
