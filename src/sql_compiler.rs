//! SQL compiler that lowers the filter AST into a parameterized SELECT.
//!
//! Every user-supplied value becomes a bound parameter; the only text that
//! reaches the statement verbatim is validated identifiers and fixed syntax.
//! Compilation is all-or-nothing: the first failing filter aborts the build.

use crate::ast::{CompOp, Field, Filter, Literal, Query as AstQuery};
use crate::builder::{ensure_identifier, Options};
use crate::error::Error;
use crate::query::{Query, SqlValue};
use std::fmt::Write as _;

/// Compiles a parsed filter query against one set of options.
pub struct SqlCompiler<'a> {
    options: &'a Options,
}

impl<'a> SqlCompiler<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    /// Compile a query AST into a SELECT over the configured table.
    ///
    /// Filters are AND-combined in source order, after any configured
    /// time-range predicates.
    pub fn compile(&self, query: &AstQuery) -> Result<Query, Error> {
        self.options.ensure_table()?;

        let mut args = Vec::new();
        let mut predicates = self.options.time_predicates(&mut args);
        for filter in &query.filters {
            predicates.push(self.compile_filter(filter, &mut args)?);
        }

        let mut sql = format!("SELECT * FROM {}", self.options.table_name);
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }
        if let Some(sort) = &self.options.sort {
            ensure_identifier(&sort.field)?;
            let _ = write!(sql, " ORDER BY {} {}", sort.field, sort.order);
        }
        if self.options.limit > 0 {
            let _ = write!(sql, " LIMIT {}", self.options.limit);
        }

        Ok(Query::new(sql, args))
    }

    /// Compile a single filter into one predicate, pushing its bound values.
    fn compile_filter(&self, filter: &Filter, args: &mut Vec<SqlValue>) -> Result<String, Error> {
        let column = column_expr(&filter.field, args)?;

        match filter.op {
            CompOp::Like | CompOp::NotLike => {
                let pattern = literal_text(&filter.value);
                args.push(SqlValue::String(format!("%{pattern}%")));
                Ok(format!("{column} {} ?", filter.op.as_sql()))
            }
            _ => {
                if let Literal::RelativeTime(raw) = &filter.value {
                    parse_relative_time(raw)?;
                    args.push(SqlValue::String(raw.clone()));
                    Ok(format!("{column} {} now() - INTERVAL ?", filter.op.as_sql()))
                } else {
                    args.push(bind_value(&filter.value, filter.field.is_nested()));
                    Ok(format!("{column} {} ?", filter.op.as_sql()))
                }
            }
        }
    }
}

/// Renders the column side of a predicate. A nested field becomes a map
/// subscript on its base column with the dotted path as a bound parameter.
fn column_expr(field: &Field, args: &mut Vec<SqlValue>) -> Result<String, Error> {
    ensure_identifier(&field.base.0)?;
    if !field.is_nested() {
        return Ok(field.base.0.clone());
    }
    for segment in &field.path {
        ensure_identifier(&segment.0)?;
    }
    args.push(SqlValue::String(field.attribute_path()));
    Ok(format!("{}[?]", field.base.0))
}

fn literal_text(value: &Literal) -> String {
    match value {
        Literal::String(s) => s.clone(),
        Literal::Int(i) => i.to_string(),
        Literal::Float(x) => x.to_string(),
        Literal::RelativeTime(raw) => raw.clone(),
    }
}

/// Attribute values are string-typed in the map column, so nested comparisons
/// bind the value as text.
fn bind_value(value: &Literal, as_text: bool) -> SqlValue {
    if as_text {
        return SqlValue::String(literal_text(value));
    }
    match value {
        Literal::String(s) => SqlValue::String(s.clone()),
        Literal::Int(i) => SqlValue::Int(*i),
        Literal::Float(x) => SqlValue::Float(*x),
        Literal::RelativeTime(raw) => SqlValue::String(raw.clone()),
    }
}

/// Time units accepted in relative-time literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

/// Validates a relative-time literal like "-1h" and returns its parts.
///
/// Zero magnitudes and unknown units are rejected; both abort the build.
pub fn parse_relative_time(raw: &str) -> Result<(i64, TimeUnit), Error> {
    let invalid = || Error::semantic(format!("invalid relative time literal '{raw}'"));

    let body = raw.strip_prefix('-').ok_or_else(invalid)?;
    let digits_end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (digits, unit) = body.split_at(digits_end);
    if digits.is_empty() {
        return Err(invalid());
    }
    let magnitude: i64 = digits.parse().map_err(|_| invalid())?;
    if magnitude == 0 {
        return Err(Error::semantic(format!(
            "relative time magnitude must be non-zero in '{raw}'"
        )));
    }
    let unit = match unit {
        "s" => TimeUnit::Seconds,
        "m" => TimeUnit::Minutes,
        "h" => TimeUnit::Hours,
        "d" => TimeUnit::Days,
        _ => {
            return Err(Error::semantic(format!(
                "unrecognized time unit '{unit}' in '{raw}'"
            )))
        }
    };
    Ok((magnitude, unit))
}
