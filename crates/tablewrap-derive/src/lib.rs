//! Derive macros for tablewrap
//!
//! Provides `#[derive(FromRecord)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod from_record;

/// Derive `FromRecord` for a struct.
///
/// # Example
///
/// ```ignore
/// use tablewrap::FromRecord;
///
/// #[derive(FromRecord)]
/// #[record(rename_all = "camelCase")]
/// struct Account {
///     id: i64,
///     mobile_no: String,
///     #[record(column = "password")]
///     secret: Option<String>,
///     #[record(skip)]
///     cached: bool,
/// }
/// ```
///
/// # Generated
///
/// - `COLUMNS` - the mapped column names, in field order (skipped fields excluded)
/// - `from_record` - reads each column with `Record::try_get`
///
/// # Attributes
///
/// - `#[record(rename_all = "...")]` - Column naming for the whole struct: `camelCase`,
///   `snake_case`, `PascalCase` or `SCREAMING_SNAKE_CASE`
/// - `#[record(column = "name")]` - Map field to a different column name
/// - `#[record(skip)]` - Leave the field out of `COLUMNS` and fill it with `Default`
#[proc_macro_derive(FromRecord, attributes(record))]
pub fn derive_from_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
