//! Placeholder dialects.

use serde::{Deserialize, Serialize};

/// Which placeholder syntax the target store expects.
///
/// - [`Dialect::Standard`]: every placeholder is `?` (MySQL, SQLite).
/// - [`Dialect::Numbered`]: placeholders are `$1, $2, ...`, numbered across the whole statement
///   (PostgreSQL).
///
/// The dialect also picks the store family's form of the few clauses that differ: upsert,
/// row-capped UPDATE/DELETE, full-text predicate and quoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Standard,
    #[default]
    Numbered,
}

impl Dialect {
    /// Write the placeholder for the 1-based parameter `index`.
    pub fn write_placeholder(self, out: &mut String, index: usize) {
        match self {
            Dialect::Standard => out.push('?'),
            Dialect::Numbered => {
                out.push('$');
                push_usize(out, index);
            }
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        let mut s = String::with_capacity(4);
        self.write_placeholder(&mut s, index);
        s
    }

    /// Whether the store lowercases unquoted identifiers.
    pub(crate) fn folds_unquoted_case(self) -> bool {
        matches!(self, Dialect::Numbered)
    }

    /// Delimiter used for quoted identifiers.
    pub(crate) fn quote_char(self) -> char {
        match self {
            Dialect::Standard => '`',
            Dialect::Numbered => '"',
        }
    }
}

// Write a usize as decimal digits into `out` without going through fmt.
#[inline]
fn push_usize(out: &mut String, mut n: usize) {
    if n < 10 {
        out.push((b'0' + n as u8) as char);
        return;
    }
    // Stack buffer for up to 20 digits (u64::MAX).
    let mut buf = [0u8; 20];
    let mut pos = buf.len();
    while n > 0 {
        pos -= 1;
        buf[pos] = b'0' + (n % 10) as u8;
        n /= 10;
    }
    for &b in &buf[pos..] {
        out.push(b as char);
    }
}
