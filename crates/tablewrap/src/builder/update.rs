use super::{StatementBuilder, map_columns, push_assignments, require_non_empty};
use crate::condition::{Condition, push_conditions_and};
use crate::error::{TableError, TableResult};
use crate::ident::Ident;
use crate::sql::{Sql, Statement};
use crate::value::ColumnMap;

impl StatementBuilder {
    /// Update one row identified by `key`.
    ///
    /// `changes[key]` selects the row and is left out of the SET list.
    pub fn update_by_key(&self, changes: &ColumnMap, key: &str) -> TableResult<Statement> {
        let key_ident = Ident::parse(key)?;
        let Some(key_value) = changes.get(key) else {
            return Err(TableError::validation(format!(
                "update requires the key column '{key}' in the changes"
            )));
        };

        let mut set = changes.clone();
        set.remove(key);
        require_non_empty(&set, "update")?;

        let mut filter = Sql::empty();
        filter
            .push_ident(&key_ident)
            .push(" = ")
            .push_bind(key_value.clone());

        let mut sql = self.update_head(&set)?;
        self.push_capped_filter(&mut sql, filter, 1);
        self.finish(sql)
    }

    /// `UPDATE <t> SET ... WHERE <conditions>`, touching at most `limit` rows.
    ///
    /// SET arguments come before WHERE arguments.
    pub fn update_where(
        &self,
        changes: &ColumnMap,
        conditions: &[Condition],
        limit: u64,
    ) -> TableResult<Statement> {
        require_non_empty(changes, "update")?;

        let mut filter = Sql::empty();
        push_conditions_and(&mut filter, conditions)?;

        let mut sql = self.update_head(changes)?;
        self.push_capped_filter(&mut sql, filter, limit);
        self.finish(sql)
    }

    /// `UPDATE <t> SET a = <ph>, ...`
    fn update_head(&self, set: &ColumnMap) -> TableResult<Sql> {
        let columns = map_columns(set)?;
        let mut sql = Sql::new("UPDATE ");
        sql.push_ident(&self.table).push(" SET ");
        push_assignments(&mut sql, &columns, set);
        Ok(sql)
    }
}
