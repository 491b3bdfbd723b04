use super::{StatementBuilder, map_columns, push_assignments, require_non_empty};
use crate::dialect::Dialect;
use crate::error::{TableError, TableResult};
use crate::ident::{Ident, parse_columns};
use crate::sql::{Sql, Statement};
use crate::value::ColumnMap;

impl StatementBuilder {
    /// `INSERT INTO <t> (<cols>) VALUES (<phs>)`, optionally `RETURNING <col>`.
    pub fn insert(&self, values: &ColumnMap, returning: Option<&str>) -> TableResult<Statement> {
        require_non_empty(values, "insert")?;
        let columns = map_columns(values)?;
        let mut sql = self.insert_head(&columns);
        push_tuple(&mut sql, values);
        if let Some(col) = returning {
            sql.push(" RETURNING ").push_ident(&Ident::parse(col)?);
        }
        self.finish(sql)
    }

    /// Insert, or overwrite the conflicting row.
    ///
    /// `Standard` appends `ON DUPLICATE KEY UPDATE a = ?, ...` and binds the values a second
    /// time. `Numbered` appends `ON CONFLICT (<target>) DO UPDATE SET a = EXCLUDED.a, ...`.
    pub fn upsert(&self, values: &ColumnMap, conflict_target: &[&str]) -> TableResult<Statement> {
        require_non_empty(values, "upsert")?;
        let columns = map_columns(values)?;
        let mut sql = self.insert_head(&columns);
        push_tuple(&mut sql, values);

        match self.dialect {
            Dialect::Standard => {
                sql.push(" ON DUPLICATE KEY UPDATE ");
                push_assignments(&mut sql, &columns, values);
            }
            Dialect::Numbered => {
                if conflict_target.is_empty() {
                    return Err(TableError::validation(
                        "upsert requires a conflict target",
                    ));
                }
                let target = parse_columns(conflict_target)?;
                sql.push(" ON CONFLICT (")
                    .push_ident_list(&target)
                    .push(") DO UPDATE SET ");
                for (i, col) in columns.iter().enumerate() {
                    if i > 0 {
                        sql.push(", ");
                    }
                    sql.push_ident(col).push(" = EXCLUDED.").push_ident(col);
                }
            }
        }
        self.finish(sql)
    }

    /// Multi-row insert: one `(...)` tuple per record.
    ///
    /// The first record's columns fix the column list. A record with any other column set
    /// fails with [`TableError::SchemaMismatch`] before anything is rendered.
    pub fn bulk_insert(&self, records: &[ColumnMap]) -> TableResult<Statement> {
        let Some(first) = records.first() else {
            return Err(TableError::validation("bulk insert requires at least one record"));
        };
        require_non_empty(first, "bulk insert")?;

        for (i, record) in records.iter().enumerate().skip(1) {
            if !record.keys().eq(first.keys()) {
                return Err(TableError::schema_mismatch(format!(
                    "record {i} has columns [{}], expected [{}]",
                    join_keys(record),
                    join_keys(first)
                )));
            }
        }

        let columns = map_columns(first)?;
        let mut sql = self.insert_head(&columns);
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            push_tuple(&mut sql, record);
        }
        self.finish(sql)
    }

    /// `INSERT INTO <t> (<cols>) VALUES `
    fn insert_head(&self, columns: &[Ident]) -> Sql {
        let mut sql = Sql::new("INSERT INTO ");
        sql.push_ident(&self.table)
            .push(" (")
            .push_ident_list(columns)
            .push(") VALUES ");
        sql
    }
}

fn push_tuple(sql: &mut Sql, values: &ColumnMap) {
    sql.push("(");
    for (i, value) in values.values().enumerate() {
        if i > 0 {
            sql.push(", ");
        }
        sql.push_bind(value.clone());
    }
    sql.push(")");
}

fn join_keys(values: &ColumnMap) -> String {
    values.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}
