//! Flat, conjunctive WHERE conditions.
//!
//! A [`Condition`] is `key operator value`. Rendering rules:
//!
//! - `LIKE` / `NOT LIKE` bind `%value%`.
//! - A value equal to the text `"null"` renders `key operator null` and binds nothing, so
//!   `{key: "deleted_at", op: "IS", value: "null"}` becomes `deleted_at IS null`.
//! - Everything else renders `key operator <placeholder>` and binds the value.
//! - An empty list renders `1 = 1`.

use crate::dialect::Dialect;
use crate::error::{TableError, TableResult};
use crate::ident::Ident;
use crate::sql::Sql;
use crate::value::{ColumnMap, SqlValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text value that stands for SQL `NULL` in a condition.
pub const NULL_SENTINEL: &str = "null";

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    NotLike,
    Is,
    IsNot,
}

impl Op {
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Gte => ">=",
            Op::Lte => "<=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::Is => "IS",
            Op::IsNot => "IS NOT",
        }
    }

    pub fn is_like(self) -> bool {
        matches!(self, Op::Like | Op::NotLike)
    }
}

impl FromStr for Op {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let op = match token.to_ascii_uppercase().as_str() {
            "=" | "==" => Op::Eq,
            "!=" | "<>" => Op::Ne,
            ">" => Op::Gt,
            "<" => Op::Lt,
            ">=" => Op::Gte,
            "<=" => Op::Lte,
            "LIKE" => Op::Like,
            "NOT LIKE" => Op::NotLike,
            "IS" => Op::Is,
            "IS NOT" => Op::IsNot,
            _ => {
                return Err(TableError::validation(format!(
                    "Unsupported condition operator '{s}'"
                )));
            }
        };
        Ok(op)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One flat comparison term.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    key: Ident,
    op: Op,
    value: SqlValue,
}

impl Condition {
    /// Create a condition from a column name, an operator token and a value.
    ///
    /// # Example
    /// ```ignore
    /// use tablewrap::Condition;
    ///
    /// Condition::new("status", "=", 1)?;
    /// Condition::new("deleted_at", "IS", "null")?; // deleted_at IS null
    /// Condition::new("mobileNo", "like", "1380")?; // mobileNo LIKE '%1380%'
    /// ```
    pub fn new(key: &str, op: &str, value: impl Into<SqlValue>) -> TableResult<Self> {
        Ok(Self {
            key: Ident::parse(key)?,
            op: op.parse()?,
            value: value.into(),
        })
    }

    /// Create a condition from an already parsed operator.
    pub fn with_op(key: &str, op: Op, value: impl Into<SqlValue>) -> TableResult<Self> {
        Ok(Self {
            key: Ident::parse(key)?,
            op,
            value: value.into(),
        })
    }

    /// Create an equality condition: key = value
    pub fn eq(key: &str, value: impl Into<SqlValue>) -> TableResult<Self> {
        Self::with_op(key, Op::Eq, value)
    }

    /// Create a LIKE condition: key LIKE %value%
    pub fn like(key: &str, value: impl Into<SqlValue>) -> TableResult<Self> {
        Self::with_op(key, Op::Like, value)
    }

    /// Create an IS NULL condition: key IS null
    pub fn is_null(key: &str) -> TableResult<Self> {
        Self::with_op(key, Op::Is, NULL_SENTINEL)
    }

    /// Create an IS NOT NULL condition: key IS NOT null
    pub fn is_not_null(key: &str) -> TableResult<Self> {
        Self::with_op(key, Op::IsNot, NULL_SENTINEL)
    }

    pub fn key(&self) -> &Ident {
        &self.key
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn value(&self) -> &SqlValue {
        &self.value
    }

    /// Whether this condition renders as a NULL comparison without an argument.
    pub fn is_null_sentinel(&self) -> bool {
        self.value.as_str() == Some(NULL_SENTINEL)
    }

    fn like_pattern(&self) -> TableResult<SqlValue> {
        let raw = match &self.value {
            SqlValue::Text(s) => s.clone(),
            v @ (SqlValue::Int(_) | SqlValue::Float(_) | SqlValue::Bool(_)) => v.to_string(),
            other => {
                return Err(TableError::validation(format!(
                    "{} pattern for '{}' must be text, got {}",
                    self.op,
                    self.key.to_sql(Dialect::default()),
                    other.kind()
                )));
            }
        };
        Ok(SqlValue::Text(format!("%{raw}%")))
    }

    /// Append this condition into a [`Sql`] buffer.
    pub fn append_to_sql(&self, sql: &mut Sql) -> TableResult<()> {
        sql.push_ident(&self.key);
        sql.push(" ");
        sql.push(self.op.as_sql());
        if self.is_null_sentinel() {
            sql.push(" null");
        } else if self.op.is_like() {
            sql.push(" ");
            sql.push_bind(self.like_pattern()?);
        } else {
            sql.push(" ");
            sql.push_bind(self.value.clone());
        }
        Ok(())
    }
}

/// Equality conditions for every entry of `map`, in column-name order.
pub fn eq_conditions(map: &ColumnMap) -> TableResult<Vec<Condition>> {
    map.iter()
        .map(|(key, value)| Condition::eq(key, value.clone()))
        .collect()
}

/// LIKE conditions for every entry of `map`, in column-name order.
pub fn like_conditions(map: &ColumnMap) -> TableResult<Vec<Condition>> {
    map.iter()
        .map(|(key, value)| Condition::like(key, value.clone()))
        .collect()
}

/// Append `conditions` joined by `AND`; an empty list appends `1 = 1`.
pub fn push_conditions_and(sql: &mut Sql, conditions: &[Condition]) -> TableResult<()> {
    if conditions.is_empty() {
        sql.push("1 = 1");
        return Ok(());
    }
    for (i, cond) in conditions.iter().enumerate() {
        if i > 0 {
            sql.push(" AND ");
        }
        cond.append_to_sql(sql)?;
    }
    Ok(())
}

/// A rendered condition list.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub fragment: String,
    pub args: Vec<SqlValue>,
    /// Index the next placeholder of the enclosing statement gets.
    pub next_index: usize,
}

/// Render `conditions` as a standalone fragment whose placeholders start at `start_index`.
///
/// Use this when splicing a WHERE list into hand-written SQL; the statement builder composes
/// [`Sql`] buffers instead and gets global numbering for free.
pub fn render_conditions(
    conditions: &[Condition],
    dialect: Dialect,
    start_index: usize,
) -> TableResult<Rendered> {
    let mut sql = Sql::empty();
    push_conditions_and(&mut sql, conditions)?;
    let (fragment, next_index) = sql.render(dialect, start_index);
    let args = sql.take_args()?;
    Ok(Rendered {
        fragment,
        args,
        next_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_placeholders(text: &str, dialect: Dialect) -> usize {
        match dialect {
            Dialect::Standard => text.matches('?').count(),
            Dialect::Numbered => text.matches('$').count(),
        }
    }

    fn mixed() -> Vec<Condition> {
        vec![
            Condition::new("status", "=", 1).unwrap(),
            Condition::new("deleted_at", "IS", "null").unwrap(),
            Condition::new("mobileNo", "LIKE", "1380").unwrap(),
            Condition::new("age", ">=", 18).unwrap(),
            Condition::new("banned_at", "is not", "null").unwrap(),
        ]
    }

    #[test]
    fn empty_list_is_tautology() {
        let r = render_conditions(&[], Dialect::Numbered, 1).unwrap();
        assert_eq!(r.fragment, "1 = 1");
        assert!(r.args.is_empty());
        assert_eq!(r.next_index, 1);
    }

    #[test]
    fn placeholders_match_args_in_both_dialects() {
        for dialect in [Dialect::Standard, Dialect::Numbered] {
            let r = render_conditions(&mixed(), dialect, 1).unwrap();
            assert_eq!(count_placeholders(&r.fragment, dialect), r.args.len());
            assert_eq!(r.args.len(), 3);
        }
    }

    #[test]
    fn renders_standard_fragment() {
        let r = render_conditions(&mixed(), Dialect::Standard, 1).unwrap();
        assert_eq!(
            r.fragment,
            "status = ? AND deleted_at IS null AND mobileNo LIKE ? AND age >= ? AND banned_at IS NOT null"
        );
    }

    #[test]
    fn numbering_continues_from_start_index() {
        let r = render_conditions(&mixed(), Dialect::Numbered, 3).unwrap();
        assert_eq!(
            r.fragment,
            r#"status = $3 AND deleted_at IS null AND "mobileNo" LIKE $4 AND age >= $5 AND banned_at IS NOT null"#
        );
        assert_eq!(r.next_index, 6);
    }

    #[test]
    fn null_sentinel_binds_nothing() {
        let r = render_conditions(
            &[Condition::new("status", "=", "null").unwrap()],
            Dialect::Standard,
            1,
        )
        .unwrap();
        assert_eq!(r.fragment, "status = null");
        assert!(r.args.is_empty());
    }

    #[test]
    fn like_wraps_value_with_wildcards() {
        let r = render_conditions(&mixed(), Dialect::Numbered, 1).unwrap();
        assert_eq!(r.args[1], SqlValue::Text("%1380%".into()));
        assert!(!r.args.contains(&SqlValue::Text("1380".into())));
    }

    #[test]
    fn like_accepts_numbers() {
        let c = Condition::like("mobileNo", 1380).unwrap();
        let r = render_conditions(&[c], Dialect::Standard, 1).unwrap();
        assert_eq!(r.args, vec![SqlValue::Text("%1380%".into())]);
    }

    #[test]
    fn like_rejects_binary_pattern() {
        let c = Condition::like("payload", vec![1u8, 2]).unwrap();
        assert!(render_conditions(&[c], Dialect::Standard, 1).is_err());
    }

    #[test]
    fn operator_tokens_are_case_and_space_insensitive() {
        assert_eq!("is  not".parse::<Op>().unwrap(), Op::IsNot);
        assert_eq!("<>".parse::<Op>().unwrap(), Op::Ne);
        assert_eq!("not like".parse::<Op>().unwrap(), Op::NotLike);
    }

    #[test]
    fn rejects_unknown_operator_and_bad_key() {
        assert!(Condition::new("id", "= 1 OR 1 =", 1).is_err());
        assert!(Condition::new("id; --", "=", 1).is_err());
    }

    #[test]
    fn map_conditions_follow_column_order() {
        let m = crate::column_map! { "b" => 2, "a" => 1 };
        let conds = eq_conditions(&m).unwrap();
        let r = render_conditions(&conds, Dialect::Numbered, 1).unwrap();
        assert_eq!(r.fragment, "a = $1 AND b = $2");
        assert_eq!(r.args, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }
}
