//! SQL fragment buffer and rendered statements.
//!
//! `Sql` stores raw SQL text, identifiers and parameter slots separately. Placeholders are
//! written only when the complete statement is rendered, so fragments built independently (a
//! SET list, a WHERE list, a batch of VALUES tuples) share one statement-global numbering once
//! they are appended together.
//!
//! ```ignore
//! let mut q = Sql::new("UPDATE ");
//! q.push_ident(&table).push(" SET ").push_ident(&col).push(" = ").push_bind("x");
//! q.push(" WHERE ").push_sql(where_fragment);
//! let stmt = q.into_statement(Dialect::Numbered)?;
//! ```

use crate::dialect::Dialect;
use crate::error::{TableError, TableResult};
use crate::ident::Ident;
use crate::value::SqlValue;

#[derive(Debug, Clone)]
enum SqlPart {
    Raw(String),
    Ident(Ident),
    Param,
}

/// A parameter-safe SQL fragment under construction.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Sql {
    parts: Vec<SqlPart>,
    args: Vec<SqlValue>,
}

impl Sql {
    /// Create a new buffer with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Raw(initial_sql.into())],
            args: Vec::new(),
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a validated identifier; quoting is decided by the dialect at render time.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        self.parts.push(SqlPart::Ident(ident.clone()));
        self
    }

    /// Append identifiers separated by `", "`.
    pub fn push_ident_list(&mut self, idents: &[Ident]) -> &mut Self {
        for (i, ident) in idents.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_ident(ident);
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.args.push(value.into());
        self
    }

    /// Append another fragment, consuming it.
    pub fn push_sql(&mut self, mut other: Sql) -> &mut Self {
        self.parts.append(&mut other.parts);
        self.args.append(&mut other.args);
        self
    }

    /// Number of bound parameters so far.
    pub fn param_count(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Render the text with placeholders numbered from `start` (1-based).
    ///
    /// Returns the text and the index the next placeholder would get.
    pub fn render(&self, dialect: Dialect, start: usize) -> (String, usize) {
        let mut out = String::new();
        let mut idx = start;
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Ident(ident) => ident.write_sql(&mut out, dialect),
                SqlPart::Param => {
                    dialect.write_placeholder(&mut out, idx);
                    idx += 1;
                }
            }
        }
        (out, idx)
    }

    /// Render the text with placeholders numbered from 1.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.render(dialect, 1).0
    }

    fn validate(&self) -> TableResult<()> {
        let placeholder_count = self
            .parts
            .iter()
            .filter(|p| matches!(p, SqlPart::Param))
            .count();

        if placeholder_count != self.args.len() {
            let args_len = self.args.len();
            return Err(TableError::Validation(format!(
                "Sql: placeholders({placeholder_count}) != args({args_len})"
            )));
        }
        Ok(())
    }

    /// Take the bound arguments, encoding semi-structured values on the way out.
    pub(crate) fn take_args(&mut self) -> TableResult<Vec<SqlValue>> {
        std::mem::take(&mut self.args)
            .into_iter()
            .map(SqlValue::into_bindable)
            .collect()
    }

    /// Finish the buffer as a complete statement.
    pub fn into_statement(mut self, dialect: Dialect) -> TableResult<Statement> {
        self.validate()?;
        let text = self.to_sql(dialect);
        let args = self.take_args()?;
        Ok(Statement { text, args })
    }
}

/// Rendered SQL text plus its positional arguments.
///
/// `args` lines up one-to-one with the placeholders in `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub args: Vec<SqlValue>,
}

impl Statement {
    pub fn new(text: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            text: text.into(),
            args,
        }
    }
}
