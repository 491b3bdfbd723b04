//! Accessor behavior against an in-memory store.
//!
//! `MemoryConn` interprets the `Standard`-dialect statements the builder emits for the
//! `test_dbwrapper` table (`id` auto-increment, unique `mobileNo`) and records every statement
//! it receives. `MemoryProvider` counts acquisitions and releases.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tablewrap::{
    ColumnMap, Condition, ConnectionProvider, Dialect, ExecResult, Executor, FromRecord, Record,
    SqlValue, StoreError, Table, TableConfig, TableError, TableResult, column_map,
};

// ==================== In-memory store ====================

#[derive(Debug, thiserror::Error)]
enum MemError {
    #[error("Duplicate entry '{0}' for key 'mobileNo'")]
    Duplicate(String),
    #[error("unsupported statement: {0}")]
    Unsupported(String),
    #[error("connection lost")]
    Broken,
}

impl StoreError for MemError {
    fn is_unique_violation(&self) -> bool {
        matches!(self, MemError::Duplicate(_))
    }
}

type Row = BTreeMap<String, SqlValue>;

#[derive(Default)]
struct State {
    rows: Vec<Row>,
    next_id: i64,
    statements: Vec<(String, Vec<SqlValue>)>,
    broken: bool,
}

#[derive(Clone, Default)]
struct MemoryConn {
    state: Arc<Mutex<State>>,
}

struct Args<'a>(std::slice::Iter<'a, SqlValue>);

impl Args<'_> {
    fn next(&mut self) -> Result<SqlValue, MemError> {
        self.0
            .next()
            .cloned()
            .ok_or_else(|| MemError::Unsupported("missing argument".into()))
    }
}

enum Term {
    All,
    Eq(String, SqlValue),
    Like(String, String),
    EqNull,
    IsNull(String),
}

fn unsupported(text: &str) -> MemError {
    MemError::Unsupported(text.to_string())
}

fn split_limit(text: &str) -> Result<(&str, Option<usize>), MemError> {
    match text.rsplit_once(" LIMIT ") {
        Some((head, n)) => {
            let n = n.trim().parse().map_err(|_| unsupported(text))?;
            Ok((head, Some(n)))
        }
        None => Ok((text, None)),
    }
}

fn parse_where(text: &str, args: &mut Args<'_>) -> Result<Vec<Term>, MemError> {
    text.split(" AND ")
        .map(|term| {
            if term == "1 = 1" {
                Ok(Term::All)
            } else if term.ends_with(" = null") {
                Ok(Term::EqNull)
            } else if let Some(col) = term.strip_suffix(" IS null") {
                Ok(Term::IsNull(col.to_string()))
            } else if let Some(col) = term.strip_suffix(" LIKE ?") {
                let pattern = args.next()?;
                let needle = pattern
                    .as_str()
                    .map(|p| p.trim_matches('%').to_string())
                    .ok_or_else(|| unsupported(term))?;
                Ok(Term::Like(col.to_string(), needle))
            } else if let Some(col) = term.strip_suffix(" = ?") {
                Ok(Term::Eq(col.to_string(), args.next()?))
            } else {
                Err(unsupported(term))
            }
        })
        .collect()
}

fn row_matches(row: &Row, terms: &[Term]) -> bool {
    terms.iter().all(|term| match term {
        Term::All => true,
        // `x = NULL` is never true.
        Term::EqNull => false,
        Term::IsNull(col) => row.get(col).is_none_or(SqlValue::is_null),
        Term::Eq(col, value) => row.get(col) == Some(value),
        Term::Like(col, needle) => row
            .get(col)
            .and_then(SqlValue::as_str)
            .is_some_and(|v| v.contains(needle.as_str())),
    })
}

impl State {
    fn select(&self, text: &str, args: &[SqlValue]) -> Result<Vec<Record>, MemError> {
        let mut args = Args(args.iter());
        let rest = text.strip_prefix("SELECT ").ok_or_else(|| unsupported(text))?;
        let (cols, rest) = rest.split_once(" FROM ").ok_or_else(|| unsupported(text))?;
        let (_, filter) = rest.split_once(" WHERE ").ok_or_else(|| unsupported(text))?;
        let (filter, limit) = split_limit(filter)?;
        let terms = parse_where(filter, &mut args)?;

        let records = self
            .rows
            .iter()
            .filter(|row| row_matches(row, &terms))
            .take(limit.unwrap_or(usize::MAX))
            .map(|row| -> Record {
                if cols == "*" {
                    row.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                } else {
                    cols.split(", ")
                        .map(|c| (c, row.get(c).cloned().unwrap_or_default()))
                        .collect()
                }
            })
            .collect();
        Ok(records)
    }

    fn insert(&mut self, text: &str, args: &[SqlValue]) -> Result<ExecResult, MemError> {
        let (insert, upsert) = match text.split_once(" ON DUPLICATE KEY UPDATE ") {
            Some((insert, _)) => (insert, true),
            None => (text, false),
        };
        let (_, rest) = insert.split_once(" (").ok_or_else(|| unsupported(text))?;
        let (cols, _) = rest.split_once(") VALUES ").ok_or_else(|| unsupported(text))?;
        let cols: Vec<&str> = cols.split(", ").collect();
        let tuple_args = if upsert { &args[..cols.len()] } else { args };

        let mut result = ExecResult::default();
        for tuple in tuple_args.chunks(cols.len()) {
            let mut row: Row = cols
                .iter()
                .map(|c| c.to_string())
                .zip(tuple.iter().cloned())
                .collect();

            let existing = row.get("mobileNo").and_then(|m| {
                self.rows
                    .iter()
                    .position(|r| r.get("mobileNo") == Some(m))
            });
            if let Some(idx) = existing {
                if !upsert {
                    return Err(MemError::Duplicate(row["mobileNo"].to_string()));
                }
                self.rows[idx].append(&mut row);
                result.rows_affected += 1;
                continue;
            }

            self.next_id += 1;
            let id = self.next_id;
            row.entry("id".to_string()).or_insert(SqlValue::Int(id));
            self.rows.push(row);
            result = result.with_last_insert_id(id);
            result.rows_affected += 1;
        }
        Ok(result)
    }

    fn update(&mut self, text: &str, args: &[SqlValue]) -> Result<ExecResult, MemError> {
        let mut args = Args(args.iter());
        let (_, rest) = text.split_once(" SET ").ok_or_else(|| unsupported(text))?;
        let (set, filter) = rest.split_once(" WHERE ").ok_or_else(|| unsupported(text))?;
        let changes = set
            .split(", ")
            .map(|a| {
                let col = a.strip_suffix(" = ?").ok_or_else(|| unsupported(a))?;
                Ok((col.to_string(), args.next()?))
            })
            .collect::<Result<Vec<_>, MemError>>()?;
        let (filter, limit) = split_limit(filter)?;
        let terms = parse_where(filter, &mut args)?;

        let mut n = 0;
        for row in self
            .rows
            .iter_mut()
            .filter(|row| row_matches(row, &terms))
            .take(limit.unwrap_or(usize::MAX))
        {
            for (col, value) in &changes {
                row.insert(col.clone(), value.clone());
            }
            n += 1;
        }
        Ok(ExecResult::new(n))
    }

    fn delete(&mut self, text: &str, args: &[SqlValue]) -> Result<ExecResult, MemError> {
        let mut args = Args(args.iter());
        let (_, filter) = text.split_once(" WHERE ").ok_or_else(|| unsupported(text))?;
        let (filter, limit) = split_limit(filter)?;
        let terms = parse_where(filter, &mut args)?;

        let mut remaining = limit.unwrap_or(usize::MAX);
        let before = self.rows.len();
        self.rows.retain(|row| {
            if remaining > 0 && row_matches(row, &terms) {
                remaining -= 1;
                false
            } else {
                true
            }
        });
        Ok(ExecResult::new((before - self.rows.len()) as u64))
    }
}

impl MemoryConn {
    fn with_state<R>(
        &self,
        sql: &str,
        args: &[SqlValue],
        f: impl FnOnce(&mut State) -> Result<R, MemError>,
    ) -> Result<R, MemError> {
        let mut state = self.state.lock().unwrap();
        state.statements.push((sql.to_string(), args.to_vec()));
        if state.broken {
            return Err(MemError::Broken);
        }
        f(&mut *state)
    }

    fn statements(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.state.lock().unwrap().statements.clone()
    }

    fn last_statement(&self) -> (String, Vec<SqlValue>) {
        self.statements().pop().expect("no statement was run")
    }

    fn break_connection(&self) {
        self.state.lock().unwrap().broken = true;
    }
}

impl Executor for MemoryConn {
    type Error = MemError;

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Record>, MemError> {
        self.with_state(sql, args, |state| {
            if sql.starts_with("SELECT ") {
                state.select(sql, args)
            } else {
                Err(unsupported(sql))
            }
        })
    }

    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult, MemError> {
        self.with_state(sql, args, |state| {
            if sql.starts_with("INSERT INTO ") {
                state.insert(sql, args)
            } else if sql.starts_with("UPDATE ") {
                state.update(sql, args)
            } else if sql.starts_with("DELETE FROM ") {
                state.delete(sql, args)
            } else {
                Err(unsupported(sql))
            }
        })
    }
}

#[derive(Clone, Default)]
struct MemoryProvider {
    conn: MemoryConn,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    refuse: bool,
}

impl ConnectionProvider for MemoryProvider {
    type Connection = MemoryConn;

    async fn acquire(&self) -> TableResult<MemoryConn> {
        if self.refuse {
            return Err(TableError::Connection("too many connections".into()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(self.conn.clone())
    }

    fn release(&self, conn: MemoryConn) {
        self.released.fetch_add(1, Ordering::SeqCst);
        drop(conn);
    }
}

impl MemoryProvider {
    fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

// ==================== Fixtures ====================

#[derive(Debug, FromRecord)]
#[record(rename_all = "camelCase")]
struct Account {
    id: i64,
    mobile_no: String,
    password: Option<String>,
    status: Option<String>,
}

fn accounts() -> (Table<MemoryProvider>, MemoryProvider) {
    let provider = MemoryProvider::default();
    let config = TableConfig::new("test_dbwrapper").dialect(Dialect::Standard);
    let table = Table::new(config, provider.clone()).unwrap();
    (table, provider)
}

async fn create_account(table: &Table<MemoryProvider>, mobile_no: &str) -> i64 {
    let result = table
        .create(None, &column_map! { "mobileNo" => mobile_no })
        .await
        .unwrap();
    result.last_insert_id.expect("identity")
}

// ==================== Scenarios ====================

#[tokio::test]
async fn create_then_get_returns_record() {
    let (table, _) = accounts();
    let id = create_account(&table, "13800138000").await;
    assert!(id > 0);

    let account: Account = table.get(None, &[], id).await.unwrap();
    assert_eq!(account.id, id);
    assert_eq!(account.mobile_no, "13800138000");
    assert_eq!(account.password, None);
}

#[tokio::test]
async fn get_uses_declared_columns() {
    let (table, provider) = accounts();
    let id = create_account(&table, "13800138000").await;
    let _: Account = table.get(None, &[], id).await.unwrap();

    let (sql, args) = provider.conn.last_statement();
    assert_eq!(
        sql,
        "SELECT id, mobileNo, password, status FROM test_dbwrapper WHERE id = ? LIMIT 1"
    );
    assert_eq!(args, vec![SqlValue::Int(id)]);
}

#[tokio::test]
async fn duplicate_create_is_duplicated_unique_key() {
    let (table, _) = accounts();
    create_account(&table, "13800138000").await;

    let err = table
        .create(None, &column_map! { "mobileNo" => "13800138000" })
        .await
        .unwrap_err();
    assert!(err.is_duplicated_unique_key(), "{err:?}");
}

#[tokio::test]
async fn get_unknown_identity_is_not_found() {
    let (table, _) = accounts();
    create_account(&table, "13800138000").await;

    let err = table.get::<Account>(None, &[], 9999).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn search_like_finds_and_misses() {
    let (table, provider) = accounts();
    create_account(&table, "13800138000").await;
    create_account(&table, "13900139000").await;

    let found: Vec<Account> = table
        .search(None, &[], &ColumnMap::new(), &column_map! { "mobileNo" => "1380" }, 10)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].mobile_no, "13800138000");

    let (_, args) = provider.conn.last_statement();
    assert_eq!(args, vec![SqlValue::from("%1380%")]);

    let none: Vec<Account> = table
        .search(None, &[], &ColumnMap::new(), &column_map! { "mobileNo" => "8888" }, 10)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn update_where_null_sentinel_binds_no_argument() {
    let (table, provider) = accounts();
    create_account(&table, "13800138000").await;

    let result = table
        .update_where(
            None,
            &column_map! { "password" => "reset" },
            &[Condition::new("status", "=", "null").unwrap()],
        )
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 0);

    let (sql, args) = provider.conn.last_statement();
    assert_eq!(
        sql,
        "UPDATE test_dbwrapper SET password = ? WHERE status = null LIMIT 10000"
    );
    assert_eq!(args, vec![SqlValue::from("reset")]);
}

#[tokio::test]
async fn update_where_is_null_touches_matching_rows() {
    let (table, _) = accounts();
    create_account(&table, "13800138000").await;
    create_account(&table, "13900139000").await;

    let result = table
        .update_where(
            None,
            &column_map! { "status" => "active" },
            &[Condition::is_null("status").unwrap()],
        )
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 2);

    let active: Vec<Account> = table
        .gets(None, &[], &column_map! { "status" => "active" }, 100)
        .await
        .unwrap();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|a| a.status.as_deref() == Some("active")));
}

// ==================== Other operations ====================

#[tokio::test]
async fn update_by_primary_key() {
    let (table, _) = accounts();
    let id = create_account(&table, "13800138000").await;

    let result = table
        .update(None, &column_map! { "id" => id, "password" => "secret" })
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);

    let account: Account = table.get(None, &[], id).await.unwrap();
    assert_eq!(account.password.as_deref(), Some("secret"));
}

#[tokio::test]
async fn gets_where_with_empty_conditions_matches_all() {
    let (table, provider) = accounts();
    for m in ["1", "2", "3"] {
        create_account(&table, m).await;
    }

    let all: Vec<Account> = table.gets_where(None, &[], &[], 2).await.unwrap();
    assert_eq!(all.len(), 2);
    let (sql, _) = provider.conn.last_statement();
    assert!(sql.ends_with("WHERE 1 = 1 LIMIT 2"), "{sql}");
}

#[tokio::test]
async fn delete_removes_one_row() {
    let (table, _) = accounts();
    let id = create_account(&table, "13800138000").await;

    let n = table.delete(None, &column_map! { "id" => id }).await.unwrap();
    assert_eq!(n, 1);
    assert!(table.get::<Account>(None, &[], id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn upsert_overwrites_conflicting_row() {
    let (table, provider) = accounts();
    let id = create_account(&table, "13800138000").await;

    table
        .upsert(None, &column_map! { "mobileNo" => "13800138000", "password" => "p2" })
        .await
        .unwrap();

    let (sql, args) = provider.conn.last_statement();
    assert!(sql.contains(" ON DUPLICATE KEY UPDATE mobileNo = ?, password = ?"), "{sql}");
    assert_eq!(args.len(), 4);

    let account: Account = table.get(None, &[], id).await.unwrap();
    assert_eq!(account.password.as_deref(), Some("p2"));
}

#[tokio::test]
async fn bulk_insert_writes_every_record() {
    let (table, provider) = accounts();
    let records: Vec<ColumnMap> = (0..3)
        .map(|i| column_map! { "mobileNo" => format!("1380000000{i}"), "password" => "x" })
        .collect();

    let result = table.bulk_insert(None, &records).await.unwrap();
    assert_eq!(result.rows_affected, 3);

    let (sql, args) = provider.conn.last_statement();
    assert_eq!(
        sql,
        "INSERT INTO test_dbwrapper (mobileNo, password) VALUES (?, ?), (?, ?), (?, ?)"
    );
    assert_eq!(args.len(), 6);
}

#[tokio::test]
async fn bulk_insert_schema_mismatch_never_reaches_store() {
    let (table, provider) = accounts();
    let records = vec![
        column_map! { "a" => 1, "b" => 2 },
        column_map! { "a" => 3, "c" => 4 },
    ];

    let err = table.bulk_insert(None, &records).await.unwrap_err();
    assert!(err.is_schema_mismatch());
    assert!(provider.conn.statements().is_empty());
    assert_eq!(provider.acquired(), 0);
}

#[tokio::test]
async fn raw_query_and_exec() {
    let (table, _) = accounts();
    create_account(&table, "13800138000").await;

    let rows: Vec<Record> = table
        .raw_query(None, "SELECT * FROM test_dbwrapper WHERE 1 = 1", &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("mobileNo"), Some(&SqlValue::from("13800138000")));

    let result = table
        .raw_exec(
            None,
            "DELETE FROM test_dbwrapper WHERE mobileNo = ?",
            &[SqlValue::from("13800138000")],
        )
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);
}

#[tokio::test]
async fn decode_failure_names_column() {
    let (table, _) = accounts();
    create_account(&table, "13800138000").await;

    #[derive(Debug, FromRecord)]
    #[record(rename_all = "camelCase")]
    struct Wrong {
        #[allow(dead_code)]
        mobile_no: i64,
    }

    let err = table.gets::<Wrong>(None, &[], &ColumnMap::new(), 1).await.unwrap_err();
    assert!(err.is_decode());
    assert!(err.to_string().contains("mobileNo"), "{err}");
}

// ==================== Connection handling ====================

#[tokio::test]
async fn leases_are_released_after_every_call() {
    let (table, provider) = accounts();
    let id = create_account(&table, "13800138000").await;
    let _: Account = table.get(None, &[], id).await.unwrap();
    let _ = table.get::<Account>(None, &[], 9999).await.unwrap_err();
    let _ = table
        .create(None, &column_map! { "mobileNo" => "13800138000" })
        .await
        .unwrap_err();

    assert_eq!(provider.acquired(), 4);
    assert_eq!(provider.released(), 4);
}

#[tokio::test]
async fn lease_is_released_when_store_fails() {
    let (table, provider) = accounts();
    provider.conn.break_connection();

    let err = table.get::<Account>(None, &[], 1).await.unwrap_err();
    assert!(matches!(err, TableError::Unclassified(_)));
    assert_eq!(err.to_string(), "connection lost");
    assert_eq!(provider.acquired(), 1);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn caller_connection_is_used_without_leasing() {
    let (table, provider) = accounts();
    let conn = provider.conn.clone();

    table
        .create(Some(&conn), &column_map! { "mobileNo" => "13800138000" })
        .await
        .unwrap();
    let found: Vec<Account> = table
        .gets(Some(&conn), &[], &column_map! { "mobileNo" => "13800138000" }, 1)
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(provider.acquired(), 0);
    assert_eq!(provider.released(), 0);
}

#[tokio::test]
async fn acquire_failure_is_returned() {
    let provider = MemoryProvider {
        refuse: true,
        ..MemoryProvider::default()
    };
    let table = Table::new(
        TableConfig::new("test_dbwrapper").dialect(Dialect::Standard),
        provider.clone(),
    )
    .unwrap();

    let err = table.get::<Account>(None, &[], 1).await.unwrap_err();
    assert!(matches!(err, TableError::Connection(_)));
    assert_eq!(provider.released(), 0);
}

#[tokio::test]
async fn debug_flag_toggles_without_mut() {
    let (table, _) = accounts();
    assert!(!table.is_debug());
    table.set_debug(true);
    assert!(table.is_debug());
    create_account(&table, "13800138000").await;
    table.bulk_insert(None, &[column_map! { "mobileNo" => "1" }]).await.unwrap();
}

#[test]
fn rejects_invalid_table_config() {
    let provider = MemoryProvider::default();
    assert!(Table::new(TableConfig::new("bad name;"), provider.clone()).is_err());
    assert!(Table::new(TableConfig::new("t").primary_key("id OR 1"), provider).is_err());
}
