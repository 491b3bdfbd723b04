//! Statement builder.
//!
//! Turns column maps and condition lists into parameterized [`Statement`]s for one table and
//! one [`Dialect`]. The builder holds no per-call state; every operation starts from a fresh
//! [`Sql`] buffer.
//!
//! ## Rules
//!
//! - Column lists: an empty list selects `*`.
//! - Map-driven statements list their columns in column-name order.
//! - Placeholders are numbered once, over the whole statement.
//! - Row caps: `Standard` appends `LIMIT n`; `Numbered` has no `UPDATE ... LIMIT`, so the
//!   filter is wrapped as `ctid IN (SELECT ctid FROM t WHERE ... LIMIT n)`.

mod delete;
mod insert;
mod select;
mod update;

use crate::dialect::Dialect;
use crate::error::{TableError, TableResult};
use crate::ident::{Ident, parse_columns};
use crate::sql::{Sql, Statement};
use crate::value::ColumnMap;

/// Builds statements for a single table.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    table: Ident,
    dialect: Dialect,
}

impl StatementBuilder {
    pub fn new(table: &str, dialect: Dialect) -> TableResult<Self> {
        Ok(Self {
            table: Ident::parse(table)?,
            dialect,
        })
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// `SELECT <cols> FROM <t>`
    fn select_head(&self, columns: &[&str]) -> TableResult<Sql> {
        let mut sql = Sql::new("SELECT ");
        if columns.is_empty() {
            sql.push("*");
        } else {
            sql.push_ident_list(&parse_columns(columns)?);
        }
        sql.push(" FROM ").push_ident(&self.table);
        Ok(sql)
    }

    /// Append `WHERE <filter>` to `head`, limited to `limit` rows.
    fn push_capped_filter(&self, head: &mut Sql, filter: Sql, limit: u64) {
        match self.dialect {
            Dialect::Standard => {
                head.push(" WHERE ").push_sql(filter);
                head.push(&format!(" LIMIT {limit}"));
            }
            Dialect::Numbered => {
                head.push(" WHERE ctid IN (SELECT ctid FROM ")
                    .push_ident(&self.table)
                    .push(" WHERE ")
                    .push_sql(filter);
                head.push(&format!(" LIMIT {limit})"));
            }
        }
    }

    fn finish(&self, sql: Sql) -> TableResult<Statement> {
        sql.into_statement(self.dialect)
    }
}

/// Column idents and values of a map, in column-name order.
fn map_columns(values: &ColumnMap) -> TableResult<Vec<Ident>> {
    values.keys().map(|k| Ident::parse(k)).collect()
}

fn require_non_empty(values: &ColumnMap, what: &str) -> TableResult<()> {
    if values.is_empty() {
        return Err(TableError::validation(format!("{what} requires at least one column")));
    }
    Ok(())
}

/// `a = <ph>, b = <ph>` for every column of `values`.
fn push_assignments(sql: &mut Sql, columns: &[Ident], values: &ColumnMap) {
    for (i, (ident, value)) in columns.iter().zip(values.values()).enumerate() {
        if i > 0 {
            sql.push(", ");
        }
        sql.push_ident(ident).push(" = ").push_bind(value.clone());
    }
}
