use super::StatementBuilder;
use crate::condition::{Condition, eq_conditions, like_conditions, push_conditions_and};
use crate::dialect::Dialect;
use crate::error::{TableError, TableResult};
use crate::ident::{Ident, parse_columns};
use crate::sql::{Sql, Statement};
use crate::value::{ColumnMap, SqlValue};

impl StatementBuilder {
    /// `SELECT <cols> FROM <t> WHERE <key> = <ph> LIMIT 1`
    pub fn select_by_key(
        &self,
        columns: &[&str],
        key: &str,
        value: impl Into<SqlValue>,
    ) -> TableResult<Statement> {
        let key = Ident::parse(key)?;
        let mut sql = self.select_head(columns)?;
        sql.push(" WHERE ")
            .push_ident(&key)
            .push(" = ")
            .push_bind(value)
            .push(" LIMIT 1");
        self.finish(sql)
    }

    /// `SELECT <cols> FROM <t> WHERE <conditions> LIMIT <limit>`
    ///
    /// An empty condition list matches every row.
    pub fn select_where(
        &self,
        columns: &[&str],
        conditions: &[Condition],
        limit: u64,
    ) -> TableResult<Statement> {
        let mut sql = self.select_head(columns)?;
        sql.push(" WHERE ");
        push_conditions_and(&mut sql, conditions)?;
        sql.push(&format!(" LIMIT {limit}"));
        self.finish(sql)
    }

    /// Equality match on every entry of `equals`.
    pub fn select_eq(
        &self,
        columns: &[&str],
        equals: &ColumnMap,
        limit: u64,
    ) -> TableResult<Statement> {
        self.select_where(columns, &eq_conditions(equals)?, limit)
    }

    /// Equality conditions from `equals`, then LIKE conditions from `likes`.
    pub fn search(
        &self,
        columns: &[&str],
        equals: &ColumnMap,
        likes: &ColumnMap,
        limit: u64,
    ) -> TableResult<Statement> {
        let mut conditions = eq_conditions(equals)?;
        conditions.extend(like_conditions(likes)?);
        self.select_where(columns, &conditions, limit)
    }

    /// Full-text match of `query` over the concatenation of `search_columns`.
    ///
    /// `Standard` renders `MATCH (...) AGAINST (?)`; `Numbered` renders
    /// `to_tsvector(concat_ws(' ', ...)) @@ plainto_tsquery($n)`. The query text and the limit
    /// are both bound.
    pub fn full_text_search(
        &self,
        columns: &[&str],
        search_columns: &[&str],
        query: &str,
        limit: u64,
    ) -> TableResult<Statement> {
        if search_columns.is_empty() {
            return Err(TableError::validation(
                "full-text search requires at least one search column",
            ));
        }
        let search_columns = parse_columns(search_columns)?;
        let limit = i64::try_from(limit)
            .map_err(|_| TableError::validation(format!("limit {limit} is out of range")))?;

        let mut predicate = Sql::empty();
        match self.dialect {
            Dialect::Standard => {
                predicate
                    .push("MATCH (")
                    .push_ident_list(&search_columns)
                    .push(") AGAINST (")
                    .push_bind(query)
                    .push(")");
            }
            Dialect::Numbered => {
                predicate
                    .push("to_tsvector(concat_ws(' ', ")
                    .push_ident_list(&search_columns)
                    .push(")) @@ plainto_tsquery(")
                    .push_bind(query)
                    .push(")");
            }
        }

        let mut sql = self.select_head(columns)?;
        sql.push(" WHERE ")
            .push_sql(predicate)
            .push(" LIMIT ")
            .push_bind(limit);
        self.finish(sql)
    }
}
