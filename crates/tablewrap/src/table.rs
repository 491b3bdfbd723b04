//! Table accessor.
//!
//! [`Table`] is the public surface: one value per table, built from a [`TableConfig`] and a
//! [`ConnectionProvider`]. Every operation builds a statement, runs it on the caller's
//! connection (or a leased one), and classifies the store error exactly once.
//!
//! # Example
//!
//! ```ignore
//! use tablewrap::{Table, TableConfig, column_map};
//!
//! let pool = tablewrap::create_pool(&database_url)?;
//! let accounts = Table::new(TableConfig::new("test_dbwrapper").identity_column("id"), pool)?;
//!
//! let created = accounts.create(None, &column_map! { "mobileNo" => "13800138000" }).await?;
//! let id = created.last_insert_id.unwrap_or_default();
//! let account: Account = accounts.get(None, &[], id).await?;
//! ```

use crate::builder::StatementBuilder;
use crate::condition::Condition;
use crate::config::TableConfig;
use crate::dialect::Dialect;
use crate::error::{Access, TableError, TableResult, classify};
use crate::executor::{ExecResult, Executor};
use crate::ident::Ident;
use crate::provider::{ConnectionProvider, Lease};
use crate::record::{FromRecord, Record};
use crate::sql::Statement;
use crate::trace::SqlLogger;
use crate::value::{ColumnMap, SqlValue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Accessor for one table.
///
/// Operations take `conn: Option<&P::Connection>`. Pass `Some` to run inside a connection or
/// transaction the caller already holds; pass `None` to lease one from the provider for the
/// duration of the call.
pub struct Table<P: ConnectionProvider> {
    config: TableConfig,
    builder: StatementBuilder,
    provider: P,
    identity: Option<Ident>,
    debug: AtomicBool,
    logger: SqlLogger,
}

impl<P: ConnectionProvider> Table<P> {
    pub fn new(config: TableConfig, provider: P) -> TableResult<Self> {
        let builder = StatementBuilder::new(&config.table, config.dialect)?;
        Ident::parse(&config.primary_key)?;
        let identity = config
            .identity_column
            .as_deref()
            .map(Ident::parse)
            .transpose()?;
        let logger = SqlLogger::new().max_sql_length(config.max_sql_log_length);
        Ok(Self {
            identity,
            debug: AtomicBool::new(config.debug),
            config,
            builder,
            provider,
            logger,
        })
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    pub fn builder(&self) -> &StatementBuilder {
        &self.builder
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Toggle statement logging.
    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    // ==================== Reads ====================

    /// Fetch the row whose primary key equals `id`.
    ///
    /// Zero rows is [`TableError::NotFound`].
    pub async fn get<T: FromRecord>(
        &self,
        conn: Option<&P::Connection>,
        columns: &[&str],
        id: impl Into<SqlValue>,
    ) -> TableResult<T> {
        let id = id.into();
        let stmt = self.builder.select_by_key(
            resolve_columns::<T>(columns),
            &self.config.primary_key,
            id.clone(),
        )?;
        let rows = self.query(conn, "get", &stmt, Access::FetchOne).await?;
        match rows.first() {
            Some(record) => T::from_record(record),
            None => Err(TableError::not_found(format!(
                "{} with {} = {id}",
                self.config.table, self.config.primary_key
            ))),
        }
    }

    /// Rows matching every condition; an empty list matches all rows.
    pub async fn gets_where<T: FromRecord>(
        &self,
        conn: Option<&P::Connection>,
        columns: &[&str],
        conditions: &[Condition],
        limit: u64,
    ) -> TableResult<Vec<T>> {
        let stmt = self
            .builder
            .select_where(resolve_columns::<T>(columns), conditions, limit)?;
        let rows = self.query(conn, "gets_where", &stmt, Access::Read).await?;
        decode_all(&rows)
    }

    /// Rows equal to every entry of `equals`.
    pub async fn gets<T: FromRecord>(
        &self,
        conn: Option<&P::Connection>,
        columns: &[&str],
        equals: &ColumnMap,
        limit: u64,
    ) -> TableResult<Vec<T>> {
        let stmt = self
            .builder
            .select_eq(resolve_columns::<T>(columns), equals, limit)?;
        let rows = self.query(conn, "gets", &stmt, Access::Read).await?;
        decode_all(&rows)
    }

    /// Rows equal to `equals` and containing each value of `likes`.
    ///
    /// No match is an empty vector, not an error.
    pub async fn search<T: FromRecord>(
        &self,
        conn: Option<&P::Connection>,
        columns: &[&str],
        equals: &ColumnMap,
        likes: &ColumnMap,
        limit: u64,
    ) -> TableResult<Vec<T>> {
        let stmt = self
            .builder
            .search(resolve_columns::<T>(columns), equals, likes, limit)?;
        let rows = self.query(conn, "search", &stmt, Access::Read).await?;
        decode_all(&rows)
    }

    /// Full-text search of `query` over `search_columns`.
    pub async fn search_full_text<T: FromRecord>(
        &self,
        conn: Option<&P::Connection>,
        columns: &[&str],
        search_columns: &[&str],
        query: &str,
        limit: u64,
    ) -> TableResult<Vec<T>> {
        let stmt = self.builder.full_text_search(
            resolve_columns::<T>(columns),
            search_columns,
            query,
            limit,
        )?;
        let rows = self
            .query(conn, "search_full_text", &stmt, Access::Read)
            .await?;
        decode_all(&rows)
    }

    /// Run caller-written SQL and decode every row.
    pub async fn raw_query<T: FromRecord>(
        &self,
        conn: Option<&P::Connection>,
        sql: &str,
        args: &[SqlValue],
    ) -> TableResult<Vec<T>> {
        let stmt = raw_statement(sql, args)?;
        let rows = self.query(conn, "raw_query", &stmt, Access::Read).await?;
        decode_all(&rows)
    }

    // ==================== Writes ====================

    /// Insert one row.
    ///
    /// With an identity column configured on a `Numbered` store the insert uses
    /// `RETURNING <identity>` and reports the new identity in `last_insert_id`. Other
    /// executors report it themselves.
    pub async fn create(
        &self,
        conn: Option<&P::Connection>,
        values: &ColumnMap,
    ) -> TableResult<ExecResult> {
        let identity = match self.config.dialect {
            Dialect::Numbered => self.identity.as_ref(),
            Dialect::Standard => None,
        };

        let returning = identity.and(self.config.identity_column.as_deref());
        let stmt = self.builder.insert(values, returning)?;
        let Some(identity) = identity else {
            return self.execute(conn, "create", &stmt).await;
        };

        let rows = self.query(conn, "create", &stmt, Access::Write).await?;
        let mut result = ExecResult::new(rows.len() as u64);
        if let Some(record) = rows.first() {
            result = result.with_last_insert_id(record.try_get::<i64>(identity.name())?);
        }
        Ok(result)
    }

    /// Insert, or overwrite the row that conflicts on the configured target.
    pub async fn upsert(
        &self,
        conn: Option<&P::Connection>,
        values: &ColumnMap,
    ) -> TableResult<ExecResult> {
        let stmt = self
            .builder
            .upsert(values, &self.config.effective_conflict_target())?;
        self.execute(conn, "upsert", &stmt).await
    }

    /// Update the row identified by `changes[primary_key]`.
    pub async fn update(
        &self,
        conn: Option<&P::Connection>,
        changes: &ColumnMap,
    ) -> TableResult<ExecResult> {
        let stmt = self
            .builder
            .update_by_key(changes, &self.config.primary_key)?;
        self.execute(conn, "update", &stmt).await
    }

    /// Update rows matching `conditions`, at most `update_limit` of them.
    pub async fn update_where(
        &self,
        conn: Option<&P::Connection>,
        changes: &ColumnMap,
        conditions: &[Condition],
    ) -> TableResult<ExecResult> {
        let stmt = self
            .builder
            .update_where(changes, conditions, self.config.update_limit)?;
        self.execute(conn, "update_where", &stmt).await
    }

    /// Delete at most one row matching every entry of `keys`. Returns the rows affected.
    pub async fn delete(&self, conn: Option<&P::Connection>, keys: &ColumnMap) -> TableResult<u64> {
        let stmt = self.builder.delete(keys)?;
        let result = self.execute(conn, "delete", &stmt).await?;
        Ok(result.rows_affected)
    }

    /// Insert every record in one statement.
    ///
    /// Logs the record count and elapsed time rather than the statement.
    pub async fn bulk_insert(
        &self,
        conn: Option<&P::Connection>,
        records: &[ColumnMap],
    ) -> TableResult<ExecResult> {
        let stmt = self.builder.bulk_insert(records)?;
        let start = Instant::now();
        let result = self.run_execute(conn, &stmt).await?;
        if self.is_debug() {
            self.logger
                .bulk_insert(&self.config.table, records.len(), start.elapsed());
        }
        Ok(result)
    }

    /// Run caller-written SQL as a write.
    pub async fn raw_exec(
        &self,
        conn: Option<&P::Connection>,
        sql: &str,
        args: &[SqlValue],
    ) -> TableResult<ExecResult> {
        let stmt = raw_statement(sql, args)?;
        self.execute(conn, "raw_exec", &stmt).await
    }

    // ==================== Execution ====================

    fn log(&self, op: &str, stmt: &Statement) {
        if self.is_debug() {
            self.logger.statement(&self.config.table, op, stmt);
        }
    }

    async fn query(
        &self,
        conn: Option<&P::Connection>,
        op: &str,
        stmt: &Statement,
        access: Access,
    ) -> TableResult<Vec<Record>> {
        self.log(op, stmt);
        let lease;
        let conn = match conn {
            Some(conn) => conn,
            None => {
                lease = Lease::acquire(&self.provider).await?;
                &*lease
            }
        };
        conn.query(&stmt.text, &stmt.args)
            .await
            .map_err(|e| classify(e, access))
    }

    async fn execute(
        &self,
        conn: Option<&P::Connection>,
        op: &str,
        stmt: &Statement,
    ) -> TableResult<ExecResult> {
        self.log(op, stmt);
        self.run_execute(conn, stmt).await
    }

    async fn run_execute(
        &self,
        conn: Option<&P::Connection>,
        stmt: &Statement,
    ) -> TableResult<ExecResult> {
        let lease;
        let conn = match conn {
            Some(conn) => conn,
            None => {
                lease = Lease::acquire(&self.provider).await?;
                &*lease
            }
        };
        conn.execute(&stmt.text, &stmt.args)
            .await
            .map_err(|e| classify(e, Access::Write))
    }
}

fn resolve_columns<'a, T: FromRecord>(columns: &'a [&'a str]) -> &'a [&'a str] {
    if columns.is_empty() {
        T::COLUMNS
    } else {
        columns
    }
}

fn decode_all<T: FromRecord>(rows: &[Record]) -> TableResult<Vec<T>> {
    rows.iter().map(T::from_record).collect()
}

fn raw_statement(sql: &str, args: &[SqlValue]) -> TableResult<Statement> {
    let args = args
        .iter()
        .cloned()
        .map(SqlValue::into_bindable)
        .collect::<TableResult<Vec<_>>>()?;
    Ok(Statement::new(sql, args))
}
