//! The common builder contract and the per-request options shared by every
//! query input mode.

use crate::error::Error;
use crate::filter::{FilterBuilder, FilterGroup};
use crate::lexer;
use crate::parser::Parser;
use crate::query::{Query, SqlValue};
use crate::raw_sql::RawSqlBuilder;
use crate::sql_compiler::SqlCompiler;
use chrono::{DateTime, Utc};
use std::fmt;

/// The log table's time column; time-range predicates and the default sort
/// target it.
pub(crate) const TIME_COLUMN: &str = "timestamp";

/// Sort order for the ORDER BY clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "ASC"),
            SortOrder::Desc => write!(f, "DESC"),
        }
    }
}

/// ORDER BY target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

/// Per-request compilation options shared by every builder mode.
///
/// `table_name` is the single source of truth for the raw-SQL table
/// allow-list. Time bounds compile to `timestamp >= start` / `timestamp <=
/// end`; the limit is applied only when positive.
#[derive(Debug, Clone)]
pub struct Options {
    pub table_name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: i64,
    pub sort: Option<Sort>,
}

impl Options {
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            start_time: None,
            end_time: None,
            limit: 0,
            sort: None,
        }
    }

    /// Sets the inclusive lower time bound.
    #[must_use]
    pub fn with_start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Sets the inclusive upper time bound.
    #[must_use]
    pub fn with_end_time(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    /// Sets the maximum number of rows; values <= 0 mean no limit.
    #[must_use]
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets an explicit sort target.
    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(Sort { field: field.into(), order });
        self
    }

    pub(crate) fn ensure_table(&self) -> Result<(), Error> {
        if self.table_name.is_empty() {
            return Err(Error::config("no table name configured"));
        }
        Ok(())
    }

    /// Renders the configured time bounds as predicates, pushing their bound
    /// values (nanosecond epochs) in order.
    pub(crate) fn time_predicates(&self, args: &mut Vec<SqlValue>) -> Vec<String> {
        let mut predicates = Vec::new();
        if let Some(start) = self.start_time {
            args.push(SqlValue::Int(start.timestamp_nanos_opt().unwrap_or(0)));
            predicates.push(format!("{TIME_COLUMN} >= ?"));
        }
        if let Some(end) = self.end_time {
            args.push(SqlValue::Int(end.timestamp_nanos_opt().unwrap_or(0)));
            predicates.push(format!("{TIME_COLUMN} <= ?"));
        }
        predicates
    }
}

/// Checks that a caller-supplied name is a plain column identifier before it
/// is interpolated into SQL text.
pub(crate) fn ensure_identifier(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::semantic(format!("invalid field name '{name}'")))
    }
}

/// Common contract implemented by all three query compilers.
///
/// `build` is pure and deterministic for identical input; builders hold no
/// mutable state and are safe to share across threads.
pub trait Builder {
    fn build(&self) -> Result<Query, Error>;
}

/// Compiles DSL text through the lexer, parser and SQL compiler.
#[derive(Debug, Clone)]
pub struct DslBuilder {
    source: String,
    options: Options,
}

impl DslBuilder {
    #[must_use]
    pub fn new(source: impl Into<String>, options: Options) -> Self {
        Self { source: source.into(), options }
    }
}

impl Builder for DslBuilder {
    fn build(&self) -> Result<Query, Error> {
        self.options.ensure_table()?;
        let tokens = lexer::tokenize(&self.source)?;
        let mut parser = Parser::new(&tokens);
        let ast = parser.parse()?;
        let query = SqlCompiler::new(&self.options).compile(&ast)?;
        tracing::debug!(sql = %query.sql, "compiled DSL query");
        Ok(query)
    }
}

/// The closed set of query input modes. Callers pick a mode by constructing
/// the matching variant; everything downstream only sees [`Builder`].
#[derive(Debug, Clone)]
pub enum QueryBuilder {
    Dsl(DslBuilder),
    Filters(FilterBuilder),
    Raw(RawSqlBuilder),
}

impl QueryBuilder {
    #[must_use]
    pub fn dsl(source: impl Into<String>, options: Options) -> Self {
        QueryBuilder::Dsl(DslBuilder::new(source, options))
    }

    #[must_use]
    pub fn filters(groups: Vec<FilterGroup>, options: Options) -> Self {
        QueryBuilder::Filters(FilterBuilder::new(groups, options))
    }

    #[must_use]
    pub fn raw(sql: impl Into<String>, options: Options) -> Self {
        QueryBuilder::Raw(RawSqlBuilder::new(sql, options))
    }
}

impl Builder for QueryBuilder {
    fn build(&self) -> Result<Query, Error> {
        match self {
            QueryBuilder::Dsl(builder) => builder.build(),
            QueryBuilder::Filters(builder) => builder.build(),
            QueryBuilder::Raw(builder) => builder.build(),
        }
    }
}
