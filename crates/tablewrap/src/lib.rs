//! # tablewrap
//!
//! A thin, table-scoped data accessor over a relational store.
//!
//! ## Features
//!
//! - **Map-driven statements**: rows go in as [`ColumnMap`]s and conditions as flat
//!   [`Condition`] lists; values are always bound, never interpolated
//! - **Two dialects**: `?` placeholders with backtick quoting, or `$n` placeholders with
//!   double-quote quoting ([`Dialect`])
//! - **Portable errors**: store errors are classified into [`TableError`] once per call
//! - **Scoped connections**: pass your own connection or transaction, or let the accessor
//!   lease one from a [`ConnectionProvider`]
//! - **Row mapping**: `Record` -> struct via [`FromRecord`] (derivable)
//!
//! ## Example
//!
//! ```ignore
//! use tablewrap::{Condition, FromRecord, Table, TableConfig, column_map};
//!
//! #[derive(FromRecord)]
//! #[record(rename_all = "camelCase")]
//! struct Account {
//!     id: i64,
//!     mobile_no: String,
//! }
//!
//! let pool = tablewrap::create_pool(&database_url)?;
//! let accounts = Table::new(TableConfig::new("test_dbwrapper").identity_column("id"), pool)?;
//!
//! accounts.create(None, &column_map! { "mobileNo" => "13800138000" }).await?;
//!
//! let found: Vec<Account> = accounts
//!     .search(None, &[], &column_map! {}, &column_map! { "mobileNo" => "1380" }, 10)
//!     .await?;
//!
//! accounts
//!     .update_where(None, &column_map! { "password" => "reset" }, &[Condition::is_null("password")?])
//!     .await?;
//! ```

pub mod builder;
pub mod condition;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod ident;
pub mod json;
pub mod provider;
pub mod record;
pub mod sql;
pub mod table;
pub mod trace;
pub mod value;

pub use builder::StatementBuilder;
pub use condition::{Condition, NULL_SENTINEL, Op, Rendered, render_conditions};
pub use config::TableConfig;
pub use dialect::Dialect;
pub use error::{Access, StoreError, TableError, TableResult, classify};
pub use executor::{ExecResult, Executor, PgStoreError, row_to_record};
pub use ident::Ident;
pub use json::JsonMap;
pub use provider::{ConnectionProvider, Lease};
pub use record::{FromRecord, Record};
pub use sql::{Sql, Statement};
pub use table::Table;
pub use trace::SqlLogger;
pub use value::{ColumnMap, FromValue, SqlValue, column_map_from_json};

// Pool support
#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

// Re-export derive macros
#[cfg(feature = "derive")]
pub use tablewrap_derive::FromRecord;
