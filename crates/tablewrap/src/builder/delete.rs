use super::{StatementBuilder, require_non_empty};
use crate::condition::{eq_conditions, push_conditions_and};
use crate::error::TableResult;
use crate::sql::{Sql, Statement};
use crate::value::ColumnMap;

impl StatementBuilder {
    /// Delete at most one row matching every entry of `keys`.
    ///
    /// An empty map is rejected; there is no whole-table delete.
    pub fn delete(&self, keys: &ColumnMap) -> TableResult<Statement> {
        require_non_empty(keys, "delete")?;

        let mut filter = Sql::empty();
        push_conditions_and(&mut filter, &eq_conditions(keys)?)?;

        let mut sql = Sql::new("DELETE FROM ");
        sql.push_ident(&self.table);
        self.push_capped_filter(&mut sql, filter, 1);
        self.finish(sql)
    }
}
