//! Query compilation for a columnar log store.
//!
//! Three interchangeable input modes produce the same [`Query`] value:
//!
//! - a compact filter DSL (`service_name='api';severity_text='error'`),
//!   tokenized and parsed into an AST before compilation,
//! - structured [`FilterGroup`] lists, already parsed by the caller,
//! - raw SQL, validated and rewritten against a single allow-listed table.
//!
//! All modes implement the [`Builder`] contract and return either a
//! parameterized SELECT plus its bound arguments or one of the [`Error`]
//! kinds. Builders are stateless, perform no I/O, and are safe to call from
//! many threads at once; query execution belongs to the caller.
//!
//! # Example
//!
//! ```
//! use log_query_compiler::{Builder, Options, QueryBuilder};
//!
//! let options = Options::new("logs");
//! let query = QueryBuilder::dsl("severity_text='error'", options)
//!     .build()
//!     .unwrap();
//! assert_eq!(query.sql, "SELECT * FROM logs WHERE severity_text = ?");
//! ```

#![deny(unsafe_code)]

pub mod ast;
pub mod builder;
pub mod config;
pub mod error;
pub mod filter;
pub mod lexer;
pub mod parser;
pub mod query;
pub mod raw_sql;
pub mod sql_compiler;
pub mod token;

pub use builder::{Builder, DslBuilder, Options, QueryBuilder, Sort, SortOrder};
pub use error::Error;
pub use filter::{FilterBuilder, FilterCondition, FilterGroup, FilterOperator, GroupOperator};
pub use query::{Query, SqlValue};
pub use raw_sql::RawSqlBuilder;
pub use sql_compiler::SqlCompiler;
