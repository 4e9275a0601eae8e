//! Structured filter-group translation into SQL.
//!
//! Filter groups arrive already parsed, typically as a JSON request body; no
//! text parsing happens here. Conditions inside a group are combined with the
//! group's own operator, and the groups themselves are always OR-ed together.

use crate::builder::{ensure_identifier, Builder, Options, TIME_COLUMN};
use crate::error::Error;
use crate::query::{Query, SqlValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

/// Comparison operators available in structured filter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not_equals",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "not_contains",
            FilterOperator::StartsWith => "starts_with",
            FilterOperator::EndsWith => "ends_with",
            FilterOperator::GreaterThan => "greater_than",
            FilterOperator::GreaterThanOrEqual => "greater_than_or_equal",
            FilterOperator::LessThan => "less_than",
            FilterOperator::LessThanOrEqual => "less_than_or_equal",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not_in",
            FilterOperator::IsNull => "is_null",
            FilterOperator::IsNotNull => "is_not_null",
        };
        write!(f, "{name}")
    }
}

/// How conditions inside one group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupOperator {
    #[default]
    And,
    Or,
}

impl GroupOperator {
    fn separator(self) -> &'static str {
        match self {
            GroupOperator::And => " AND ",
            GroupOperator::Or => " OR ",
        }
    }
}

/// A single already-parsed condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    /// Scalar for comparisons, list for `in`/`not_in`; ignored by the null
    /// checks.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A group of conditions. The top-level list of groups is OR-ed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(default)]
    pub operator: GroupOperator,
    pub conditions: Vec<FilterCondition>,
}

/// Translates filter groups into a parameterized SELECT.
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    groups: Vec<FilterGroup>,
    options: Options,
}

impl FilterBuilder {
    #[must_use]
    pub fn new(groups: Vec<FilterGroup>, options: Options) -> Self {
        Self { groups, options }
    }

    /// Renders all non-empty groups into one clause, or `None` when there is
    /// nothing to filter on.
    fn render_groups(&self, args: &mut Vec<SqlValue>) -> Result<Option<String>, Error> {
        let groups: Vec<&FilterGroup> = self
            .groups
            .iter()
            .filter(|group| !group.conditions.is_empty())
            .collect();

        match groups.as_slice() {
            [] => Ok(None),
            [group] => {
                let clause = render_group(group, args)?;
                if group.conditions.len() > 1 {
                    Ok(Some(format!("({clause})")))
                } else {
                    Ok(Some(clause))
                }
            }
            groups => {
                let mut clauses = Vec::with_capacity(groups.len());
                for group in groups {
                    clauses.push(format!("({})", render_group(group, args)?));
                }
                Ok(Some(clauses.join(" OR ")))
            }
        }
    }
}

impl Builder for FilterBuilder {
    fn build(&self) -> Result<Query, Error> {
        self.options.ensure_table()?;

        let mut args = Vec::new();
        let mut predicates = self.options.time_predicates(&mut args);
        if let Some(clause) = self.render_groups(&mut args)? {
            predicates.push(clause);
        }

        let mut sql = format!("SELECT * FROM {}", self.options.table_name);
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }
        match &self.options.sort {
            Some(sort) => {
                ensure_identifier(&sort.field)?;
                let _ = write!(sql, " ORDER BY {} {}", sort.field, sort.order);
            }
            None => {
                let _ = write!(sql, " ORDER BY {TIME_COLUMN} DESC");
            }
        }
        if self.options.limit > 0 {
            let _ = write!(sql, " LIMIT {}", self.options.limit);
        }

        let query = Query::new(sql, args);
        tracing::debug!(sql = %query.sql, "compiled filter-group query");
        Ok(query)
    }
}

fn render_group(group: &FilterGroup, args: &mut Vec<SqlValue>) -> Result<String, Error> {
    let mut clauses = Vec::with_capacity(group.conditions.len());
    for condition in &group.conditions {
        clauses.push(render_condition(condition, args)?);
    }
    Ok(clauses.join(group.operator.separator()))
}

fn render_condition(cond: &FilterCondition, args: &mut Vec<SqlValue>) -> Result<String, Error> {
    ensure_identifier(&cond.field)?;
    match cond.operator {
        FilterOperator::Equals => comparison(cond, "=", args),
        FilterOperator::NotEquals => comparison(cond, "!=", args),
        FilterOperator::GreaterThan => comparison(cond, ">", args),
        FilterOperator::GreaterThanOrEqual => comparison(cond, ">=", args),
        FilterOperator::LessThan => comparison(cond, "<", args),
        FilterOperator::LessThanOrEqual => comparison(cond, "<=", args),
        FilterOperator::Contains => substring(cond, "> 0", args),
        FilterOperator::NotContains => substring(cond, "= 0", args),
        FilterOperator::StartsWith => affix(cond, "startsWith", args),
        FilterOperator::EndsWith => affix(cond, "endsWith", args),
        FilterOperator::In => list(cond, false, args),
        FilterOperator::NotIn => list(cond, true, args),
        FilterOperator::IsNull => Ok(format!("{} IS NULL", cond.field)),
        FilterOperator::IsNotNull => Ok(format!("{} IS NOT NULL", cond.field)),
    }
}

fn comparison(cond: &FilterCondition, symbol: &str, args: &mut Vec<SqlValue>) -> Result<String, Error> {
    args.push(scalar(&cond.value, cond)?);
    Ok(format!("{} {} ?", cond.field, symbol))
}

/// Substring search via `position()`: a plain function with no pattern
/// metacharacters, so values need no escaping.
fn substring(cond: &FilterCondition, suffix: &str, args: &mut Vec<SqlValue>) -> Result<String, Error> {
    args.push(string_scalar(cond)?);
    Ok(format!("position({}, ?) {}", cond.field, suffix))
}

fn affix(cond: &FilterCondition, function: &str, args: &mut Vec<SqlValue>) -> Result<String, Error> {
    args.push(string_scalar(cond)?);
    Ok(format!("{}({}, ?)", function, cond.field))
}

fn list(cond: &FilterCondition, negated: bool, args: &mut Vec<SqlValue>) -> Result<String, Error> {
    let Some(values) = cond.value.as_array() else {
        return Err(Error::semantic(format!(
            "operator {} requires a list value for field '{}'",
            cond.operator, cond.field
        )));
    };
    if values.is_empty() {
        return Err(Error::semantic(format!(
            "operator {} requires a non-empty list for field '{}'",
            cond.operator, cond.field
        )));
    }
    for value in values {
        args.push(scalar(value, cond)?);
    }
    let placeholders = vec!["?"; values.len()].join(", ");
    let keyword = if negated { "NOT IN" } else { "IN" };
    Ok(format!("{} {} ({})", cond.field, keyword, placeholders))
}

fn scalar(value: &serde_json::Value, cond: &FilterCondition) -> Result<SqlValue, Error> {
    match value {
        serde_json::Value::String(s) => Ok(SqlValue::String(s.clone())),
        serde_json::Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Float(f))
            } else {
                Err(unsupported_value(value, cond))
            }
        }
        _ => Err(unsupported_value(value, cond)),
    }
}

fn string_scalar(cond: &FilterCondition) -> Result<SqlValue, Error> {
    match &cond.value {
        serde_json::Value::String(s) => Ok(SqlValue::String(s.clone())),
        _ => Err(Error::semantic(format!(
            "operator {} requires a string value for field '{}'",
            cond.operator, cond.field
        ))),
    }
}

fn unsupported_value(value: &serde_json::Value, cond: &FilterCondition) -> Error {
    Error::semantic(format!(
        "operator {} is not supported for field '{}' with value {}",
        cond.operator, cond.field, value
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SortOrder;
    use chrono::TimeZone;
    use serde_json::json;

    fn condition(field: &str, operator: FilterOperator, value: serde_json::Value) -> FilterCondition {
        FilterCondition { field: field.to_string(), operator, value }
    }

    fn group(operator: GroupOperator, conditions: Vec<FilterCondition>) -> FilterGroup {
        FilterGroup { operator, conditions }
    }

    fn build(groups: Vec<FilterGroup>, options: Options) -> Result<Query, Error> {
        FilterBuilder::new(groups, options).build()
    }

    #[test]
    fn test_single_condition_has_no_parentheses() {
        let groups = vec![group(
            GroupOperator::And,
            vec![condition("severity_text", FilterOperator::Equals, json!("error"))],
        )];
        let query = build(groups, Options::new("logs")).unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM logs WHERE severity_text = ? ORDER BY timestamp DESC"
        );
        assert_eq!(query.args, vec![SqlValue::from("error")]);
    }

    #[test]
    fn test_lone_multi_condition_group_is_parenthesized() {
        let groups = vec![group(
            GroupOperator::Or,
            vec![
                condition("severity_text", FilterOperator::Equals, json!("error")),
                condition("severity_text", FilterOperator::Equals, json!("fatal")),
            ],
        )];
        let query = build(groups, Options::new("logs")).unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM logs WHERE (severity_text = ? OR severity_text = ?) \
             ORDER BY timestamp DESC"
        );
    }

    #[test]
    fn test_groups_are_ored_and_parenthesized() {
        let groups = vec![
            group(
                GroupOperator::And,
                vec![
                    condition("service_name", FilterOperator::Equals, json!("api")),
                    condition("status_code", FilterOperator::GreaterThanOrEqual, json!(500)),
                ],
            ),
            group(
                GroupOperator::And,
                vec![condition("severity_text", FilterOperator::Equals, json!("fatal"))],
            ),
        ];
        let query = build(groups, Options::new("logs")).unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM logs WHERE (service_name = ? AND status_code >= ?) \
             OR (severity_text = ?) ORDER BY timestamp DESC"
        );
        assert_eq!(
            query.args,
            vec![SqlValue::from("api"), SqlValue::Int(500), SqlValue::from("fatal")]
        );
    }

    #[test]
    fn test_time_range_is_anded_on_top() {
        let start = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let groups = vec![group(
            GroupOperator::And,
            vec![condition("status_code", FilterOperator::GreaterThanOrEqual, json!(500))],
        )];
        let options = Options::new("logs").with_start_time(start).with_end_time(end);

        let query = build(groups, options).unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM logs WHERE timestamp >= ? AND timestamp <= ? \
             AND status_code >= ? ORDER BY timestamp DESC"
        );
        assert_eq!(
            query.args,
            vec![
                SqlValue::Int(start.timestamp_nanos_opt().unwrap()),
                SqlValue::Int(end.timestamp_nanos_opt().unwrap()),
                SqlValue::Int(500),
            ]
        );
    }

    #[test]
    fn test_substring_operators() {
        let groups = vec![group(
            GroupOperator::And,
            vec![
                condition("body", FilterOperator::Contains, json!("timeout")),
                condition("body", FilterOperator::NotContains, json!("probe")),
                condition("service_name", FilterOperator::StartsWith, json!("api-")),
                condition("service_name", FilterOperator::EndsWith, json!("-prod")),
            ],
        )];
        let query = build(groups, Options::new("logs")).unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM logs WHERE (position(body, ?) > 0 AND position(body, ?) = 0 \
             AND startsWith(service_name, ?) AND endsWith(service_name, ?)) \
             ORDER BY timestamp DESC"
        );
        assert_eq!(query.args.len(), 4);
    }

    #[test]
    fn test_in_operator() {
        let groups = vec![group(
            GroupOperator::And,
            vec![condition(
                "severity_text",
                FilterOperator::In,
                json!(["error", "fatal", "warn"]),
            )],
        )];
        let query = build(groups, Options::new("logs")).unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM logs WHERE severity_text IN (?, ?, ?) ORDER BY timestamp DESC"
        );
        assert_eq!(
            query.args,
            vec![SqlValue::from("error"), SqlValue::from("fatal"), SqlValue::from("warn")]
        );
    }

    #[test]
    fn test_not_in_operator() {
        let groups = vec![group(
            GroupOperator::And,
            vec![condition("status_code", FilterOperator::NotIn, json!([200, 204]))],
        )];
        let query = build(groups, Options::new("logs")).unwrap();
        assert!(query.sql.contains("status_code NOT IN (?, ?)"));
    }

    #[test]
    fn test_in_with_scalar_is_error() {
        let groups = vec![group(
            GroupOperator::And,
            vec![condition("severity_text", FilterOperator::In, json!("error"))],
        )];
        let err = build(groups, Options::new("logs")).unwrap_err();
        assert!(matches!(err, Error::Semantic(_)));
        assert!(err.to_string().contains("severity_text"));
        assert!(err.to_string().contains("in"));
    }

    #[test]
    fn test_in_with_empty_list_is_error() {
        let groups = vec![group(
            GroupOperator::And,
            vec![condition("severity_text", FilterOperator::In, json!([]))],
        )];
        let err = build(groups, Options::new("logs")).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn test_null_checks_consume_no_value() {
        let groups = vec![group(
            GroupOperator::And,
            vec![
                condition("trace_id", FilterOperator::IsNull, serde_json::Value::Null),
                condition("span_id", FilterOperator::IsNotNull, serde_json::Value::Null),
            ],
        )];
        let query = build(groups, Options::new("logs")).unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM logs WHERE (trace_id IS NULL AND span_id IS NOT NULL) \
             ORDER BY timestamp DESC"
        );
        assert!(query.args.is_empty());
    }

    #[test]
    fn test_contains_requires_string_value() {
        let groups = vec![group(
            GroupOperator::And,
            vec![condition("body", FilterOperator::Contains, json!(42))],
        )];
        let err = build(groups, Options::new("logs")).unwrap_err();
        assert!(err.to_string().contains("contains"));
        assert!(err.to_string().contains("body"));
    }

    #[test]
    fn test_object_value_is_error_naming_field_and_operator() {
        let groups = vec![group(
            GroupOperator::And,
            vec![condition("body", FilterOperator::Equals, json!({"k": "v"}))],
        )];
        let err = build(groups, Options::new("logs")).unwrap_err();
        assert!(err.to_string().contains("equals"));
        assert!(err.to_string().contains("body"));
    }

    #[test]
    fn test_invalid_field_name_is_rejected() {
        let groups = vec![group(
            GroupOperator::And,
            vec![condition("body; DROP TABLE logs", FilterOperator::Equals, json!("x"))],
        )];
        let err = build(groups, Options::new("logs")).unwrap_err();
        assert!(matches!(err, Error::Semantic(_)));
    }

    #[test]
    fn test_empty_groups_are_skipped() {
        let groups = vec![
            group(GroupOperator::And, vec![]),
            group(
                GroupOperator::And,
                vec![condition("severity_text", FilterOperator::Equals, json!("error"))],
            ),
        ];
        let query = build(groups, Options::new("logs")).unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM logs WHERE severity_text = ? ORDER BY timestamp DESC"
        );
    }

    #[test]
    fn test_no_conditions_yields_bare_scan() {
        let query = build(vec![], Options::new("logs").with_limit(10)).unwrap();
        assert_eq!(query.sql, "SELECT * FROM logs ORDER BY timestamp DESC LIMIT 10");
        assert!(query.args.is_empty());
    }

    #[test]
    fn test_sort_override_and_limit() {
        let groups = vec![group(
            GroupOperator::And,
            vec![condition("severity_text", FilterOperator::Equals, json!("error"))],
        )];
        let options = Options::new("logs")
            .with_sort("status_code", SortOrder::Asc)
            .with_limit(25);
        let query = build(groups, options).unwrap();
        assert!(query.sql.ends_with("ORDER BY status_code ASC LIMIT 25"));
    }

    #[test]
    fn test_placeholder_count_matches_args() {
        let groups = vec![
            group(
                GroupOperator::And,
                vec![
                    condition("service_name", FilterOperator::Equals, json!("api")),
                    condition("severity_text", FilterOperator::In, json!(["error", "fatal"])),
                    condition("trace_id", FilterOperator::IsNotNull, serde_json::Value::Null),
                ],
            ),
            group(
                GroupOperator::Or,
                vec![condition("body", FilterOperator::Contains, json!("panic"))],
            ),
        ];
        let query = build(groups, Options::new("logs")).unwrap();
        assert_eq!(query.sql.matches('?').count(), query.args.len());
        assert_eq!(query.args.len(), 4);
    }

    #[test]
    fn test_filter_group_deserializes_with_default_operator() {
        let raw = r#"{"conditions": [{"field": "severity_text", "operator": "equals", "value": "error"}]}"#;
        let parsed: FilterGroup = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.operator, GroupOperator::And);
        assert_eq!(parsed.conditions[0].operator, FilterOperator::Equals);
        assert_eq!(parsed.conditions[0].value, json!("error"));
    }
}
