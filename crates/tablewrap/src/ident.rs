//! Safe SQL identifier handling.
//!
//! Table and column names arrive as plain strings (map keys, column lists), so every one of them
//! is parsed into an [`Ident`] before it is written into SQL text.
//!
//! - Unquoted parts are validated against: `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts (`"..."`) allow any characters except NUL and escape `"` as `""`
//!
//! Quoted parts are re-emitted with the dialect's delimiter (`` ` `` for
//! [`Dialect::Standard`], `"` for [`Dialect::Numbered`]). Under [`Dialect::Numbered`] an
//! unquoted part with uppercase letters is quoted as well, so `mobileNo` names the column
//! `mobileNo` and comes back under that name.

use crate::dialect::Dialect;
use crate::error::{TableError, TableResult};

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// Unquoted identifier: must match `[A-Za-z_][A-Za-z0-9_$]*`.
    Unquoted(String),
    /// Quoted identifier: allows any characters except NUL.
    Quoted(String),
}

/// A SQL identifier (column, table, or schema name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Parse an identifier string, supporting dotted and quoted forms.
    ///
    /// - Dotted: `schema.table`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `public."UserTable".id`
    pub fn parse(s: &str) -> TableResult<Self> {
        if s.is_empty() {
            return Err(TableError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(TableError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(TableError::validation(format!(
                                "Trailing '.' in identifier '{s}'"
                            )));
                        }
                    }
                    Some(c) => {
                        return Err(TableError::validation(format!(
                            "Expected '.' between identifier parts in '{s}', got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                name.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => {
                            return Err(TableError::validation(format!(
                                "Unclosed quoted identifier '{s}'"
                            )));
                        }
                    }
                }
                if name.is_empty() {
                    return Err(TableError::validation("Empty quoted identifier"));
                }
                parts.push(IdentPart::Quoted(name));
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let ok = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !ok {
                    return Err(TableError::validation(format!(
                        "Invalid character '{c}' in identifier '{s}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(TableError::validation(format!(
                    "Empty identifier segment in '{s}'"
                )));
            }
            parts.push(IdentPart::Unquoted(name));
        }

        Ok(Self { parts })
    }

    /// Render the identifier as SQL for `dialect`.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        self.write_sql(&mut out, dialect);
        out
    }

    /// The unquoted text of the last part: the column name a store reports back.
    pub fn name(&self) -> &str {
        match self.parts.last() {
            Some(IdentPart::Unquoted(s) | IdentPart::Quoted(s)) => s,
            None => "",
        }
    }

    pub(crate) fn write_sql(&self, out: &mut String, dialect: Dialect) {
        let quote = dialect.quote_char();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                // Case-folding stores would lowercase `mobileNo`; quote it to keep the case.
                IdentPart::Unquoted(s)
                    if dialect.folds_unquoted_case() && s.chars().any(|c| c.is_ascii_uppercase()) =>
                {
                    push_quoted(out, s, quote)
                }
                IdentPart::Unquoted(s) => out.push_str(s),
                IdentPart::Quoted(s) => push_quoted(out, s, quote),
            }
        }
    }
}

fn push_quoted(out: &mut String, s: &str, quote: char) {
    out.push(quote);
    for ch in s.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
}

/// Parse a list of column names, all or nothing.
pub(crate) fn parse_columns<S: AsRef<str>>(columns: &[S]) -> TableResult<Vec<Ident>> {
    columns.iter().map(|c| Ident::parse(c.as_ref())).collect()
}
