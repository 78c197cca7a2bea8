//! # sqlparts
//!
//! Split SQL statements into named parts, change them and join them back.
//!
//! ## Features
//!
//! - **Split and join**: `SELECT`, `INSERT`, `REPLACE`, `UPDATE`, `DELETE`,
//!   `TRUNCATE` and `SET` statements become an ordered map of clauses
//! - **Safe quoting**: values become literals, identifiers inside expressions
//!   are quoted and unbalanced input is rejected
//! - **Placeholders**: `?` and `:name` with `%` wildcards
//! - **Subqueries**: extracted, split on their own and injected back
//! - **Mutation**: add columns, tables, joins, conditions and rows to an
//!   existing statement with [`Query`]
//! - **Dialects**: MySQL and generic ANSI SQL
//!
//! ## Splitting
//!
//! ```ignore
//! use sqlparts::Splitter;
//!
//! let splitter = Splitter::mysql();
//! let parts = splitter.split("SELECT id, name FROM users WHERE active = 1 LIMIT 10")?;
//! assert_eq!(parts.get("where"), Some("active = 1"));
//! assert_eq!(splitter.split_limit(&parts)?, (Some(10), None));
//! ```
//!
//! ## Mutating
//!
//! ```ignore
//! use sqlparts::{Builder, DialectKind, SortOrder};
//!
//! let mut query = Builder::new(DialectKind::MySql).select(["id", "name"])?;
//! query
//!     .from("users")?
//!     .where_value("status", "active")?
//!     .order_by(["created_at"], SortOrder::Desc)?
//!     .page(2, Some(25))?;
//!
//! assert_eq!(
//!     query.to_sql()?,
//!     "SELECT `id`, `name` FROM `users` WHERE `status` = 'active' ORDER BY `created_at` DESC LIMIT 25 OFFSET 25"
//! );
//! ```

pub mod builder;
pub mod config;
pub mod dialect;
pub mod error;
pub mod parts;
pub mod query;
pub mod query_type;
pub mod quote;
pub mod splitter;
pub mod value;

mod bind;
mod count;
mod extract;
pub(crate) mod lexer;
mod merge;
mod split;
mod subquery;

pub use builder::Builder;
pub use config::{DEFAULT_MAX_NESTING, SplitterConfig};
pub use dialect::{Dialect, DialectKind};
pub use error::{SplitError, SplitResult};
pub use extract::{Limit, parse_limit};
pub use merge::Addition;
pub use parts::Parts;
pub use query::{Assign, PartOptions, Placement, Query, SortOrder};
pub use query_type::QueryType;
pub use quote::QuoteMode;
pub use splitter::Splitter;
pub use subquery::SUBQUERY_MARKER;
pub use value::{Params, Value};
