//! Raw SQL validation and rewriting.
//!
//! Accepts arbitrary SQL text, parses it with a full SQL dialect parser and
//! only lets through a single SELECT over the configured table: no second
//! statement, no JOINs, no subqueries, no set operations, no calls to
//! mutating or administrative functions. The statement is re-serialized from
//! the validated AST, so the output is canonical SQL with any configured
//! default LIMIT injected.

use crate::builder::{Builder, Options};
use crate::error::Error;
use crate::query::Query;
use sqlparser::ast as sql;
use sqlparser::dialect::ClickHouseDialect;
use sqlparser::parser::Parser as SqlParser;

/// Keywords that must never appear as function names inside a query. Matched
/// case-insensitively against parsed function nodes, not rendered text, so a
/// keyword inside a string literal stays legal.
const DENIED_FUNCTIONS: [&str; 10] = [
    "drop", "delete", "truncate", "alter", "create", "insert", "update", "rename", "system",
    "settings",
];

/// Validates caller-supplied SQL against the allow-listed table and rewrites
/// it into its canonical form.
#[derive(Debug, Clone)]
pub struct RawSqlBuilder {
    sql: String,
    options: Options,
}

impl RawSqlBuilder {
    #[must_use]
    pub fn new(sql: impl Into<String>, options: Options) -> Self {
        Self { sql: sql.into(), options }
    }

    fn compile(&self) -> Result<Query, Error> {
        self.options.ensure_table()?;

        let mut statements = SqlParser::parse_sql(&ClickHouseDialect {}, &self.sql)
            .map_err(|e| Error::Syntax { message: e.to_string(), span: None })?;
        if statements.len() != 1 {
            return Err(Error::security(format!(
                "expected exactly one statement, found {}",
                statements.len()
            )));
        }
        let mut statement = statements.remove(0);
        let sql::Statement::Query(query) = &mut statement else {
            return Err(Error::security("only SELECT statements are allowed"));
        };

        self.validate(query)?;

        if query.limit.is_none() && self.options.limit > 0 {
            query.limit = Some(sql::Expr::Value(sql::Value::Number(
                self.options.limit.to_string(),
                false,
            )));
        }

        Ok(Query::new(statement.to_string(), Vec::new()))
    }

    fn validate(&self, query: &sql::Query) -> Result<(), Error> {
        if query.settings.is_some() {
            return Err(Error::security("SETTINGS clause is not allowed"));
        }
        let sql::SetExpr::Select(select) = query.body.as_ref() else {
            return Err(Error::security("only a plain SELECT body is allowed"));
        };

        self.check_from(select)?;

        for item in &select.projection {
            match item {
                sql::SelectItem::UnnamedExpr(expr)
                | sql::SelectItem::ExprWithAlias { expr, .. } => check_expr(expr)?,
                _ => {}
            }
        }
        if let Some(prewhere) = &select.prewhere {
            check_expr(prewhere)?;
        }
        if let Some(selection) = &select.selection {
            check_expr(selection)?;
        }
        if let Some(having) = &select.having {
            check_expr(having)?;
        }
        Ok(())
    }

    fn check_from(&self, select: &sql::Select) -> Result<(), Error> {
        if select.from.len() != 1 {
            return Err(Error::security(format!(
                "expected exactly one table source, found {}",
                select.from.len()
            )));
        }
        let table = &select.from[0];
        if !table.joins.is_empty() {
            return Err(Error::security("JOIN clauses are not allowed"));
        }
        match &table.relation {
            sql::TableFactor::Table { name, .. } => self.check_table_name(name),
            sql::TableFactor::Derived { .. } => {
                Err(Error::security("subqueries are not allowed as a table source"))
            }
            other => Err(Error::security(format!("unsupported table source: {other}"))),
        }
    }

    /// Resolves an optional `database.table` qualifier against the configured
    /// table name, which may itself be qualified. A qualified reference
    /// against an unqualified allow-list is rejected: the database cannot be
    /// verified.
    fn check_table_name(&self, name: &sql::ObjectName) -> Result<(), Error> {
        let (allowed_db, allowed_table) = match self.options.table_name.split_once('.') {
            Some((db, table)) => (Some(db), table),
            None => (None, self.options.table_name.as_str()),
        };
        let parts: Vec<&str> = name.0.iter().map(|ident| ident.value.as_str()).collect();
        let permitted = match parts.as_slice() {
            [table] => *table == allowed_table,
            [db, table] => allowed_db == Some(*db) && *table == allowed_table,
            _ => false,
        };
        if permitted {
            Ok(())
        } else {
            Err(Error::security(format!(
                "query references table '{name}' but only '{}' is allowed",
                self.options.table_name
            )))
        }
    }
}

impl Builder for RawSqlBuilder {
    fn build(&self) -> Result<Query, Error> {
        let result = self.compile();
        match &result {
            Ok(query) => tracing::debug!(sql = %query.sql, "validated raw SQL query"),
            Err(Error::Security(reason)) => {
                tracing::warn!(%reason, "rejected raw SQL query");
            }
            Err(_) => {}
        }
        result
    }
}

/// Walks an expression tree looking for subqueries and denied function calls.
fn check_expr(expr: &sql::Expr) -> Result<(), Error> {
    match expr {
        sql::Expr::Subquery(_) | sql::Expr::InSubquery { .. } | sql::Expr::Exists { .. } => {
            Err(Error::security("subqueries are not allowed"))
        }
        sql::Expr::Function(function) => check_function(function),
        sql::Expr::BinaryOp { left, right, .. } => {
            check_expr(left)?;
            check_expr(right)
        }
        sql::Expr::UnaryOp { expr, .. }
        | sql::Expr::Nested(expr)
        | sql::Expr::IsNull(expr)
        | sql::Expr::IsNotNull(expr)
        | sql::Expr::Cast { expr, .. } => check_expr(expr),
        sql::Expr::InList { expr, list, .. } => {
            check_expr(expr)?;
            for item in list {
                check_expr(item)?;
            }
            Ok(())
        }
        sql::Expr::Between { expr, low, high, .. } => {
            check_expr(expr)?;
            check_expr(low)?;
            check_expr(high)
        }
        sql::Expr::Like { expr, pattern, .. } | sql::Expr::ILike { expr, pattern, .. } => {
            check_expr(expr)?;
            check_expr(pattern)
        }
        sql::Expr::Tuple(items) => {
            for item in items {
                check_expr(item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_function(function: &sql::Function) -> Result<(), Error> {
    for part in &function.name.0 {
        let lowered = part.value.to_ascii_lowercase();
        if DENIED_FUNCTIONS.contains(&lowered.as_str()) {
            return Err(Error::security(format!(
                "function '{}' is not allowed",
                function.name
            )));
        }
    }
    check_function_arguments(&function.parameters)?;
    check_function_arguments(&function.args)
}

fn check_function_arguments(args: &sql::FunctionArguments) -> Result<(), Error> {
    match args {
        sql::FunctionArguments::None => Ok(()),
        sql::FunctionArguments::Subquery(_) => Err(Error::security("subqueries are not allowed")),
        sql::FunctionArguments::List(list) => {
            for arg in &list.args {
                let (sql::FunctionArg::Named { arg, .. } | sql::FunctionArg::Unnamed(arg)) = arg;
                if let sql::FunctionArgExpr::Expr(expr) = arg {
                    check_expr(expr)?;
                }
            }
            Ok(())
        }
    }
}
