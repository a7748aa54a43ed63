//! Normalization pass from JSON filter expressions to [`FilterNode`] trees.
//!
//! All default-operator resolution happens here: implicit AND between sibling
//! entries, implicit `EQ` for literals and implicit `IN` for lists. The
//! evaluator only ever sees explicit operators.

use serde_json::{Map, Value};

use crate::data::DataValue;
use crate::error::{QuarryError, Result};
use crate::filter::FilterNode;
use crate::filter::operator::{ComparisonOperator, FilterKey, LogicalOperator};

/// Parse a top-level filter expression. Returns `None` for the empty filter.
pub(crate) fn parse(expression: &Value) -> Result<Option<FilterNode>> {
    match expression {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(map) => Ok(Some(conjoin(parse_mapping(map, None)?))),
        _ => Err(QuarryError::filter(
            "filters must be a mapping of field names and operators",
        )),
    }
}

/// Fold a non-empty list of nodes into one: a single node stays as is,
/// several are AND-ed.
fn conjoin(mut nodes: Vec<FilterNode>) -> FilterNode {
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        FilterNode::and(nodes)
    }
}

/// Parse every entry of a mapping. `field` is the field in scope, if any.
fn parse_mapping(map: &Map<String, Value>, field: Option<&str>) -> Result<Vec<FilterNode>> {
    let mut nodes = Vec::with_capacity(map.len());
    for (key, value) in map {
        let node = match FilterKey::classify(key)? {
            FilterKey::Logical(op) => parse_logical(op, value, field)?,
            FilterKey::Comparison(op) => {
                let field = field.ok_or_else(|| {
                    QuarryError::filter(format!(
                        "comparison operator '{key}' must be nested under a field name"
                    ))
                })?;
                parse_comparison(field, op, value)?
            }
            FilterKey::Field(name) => {
                if let Some(parent) = field {
                    return Err(QuarryError::filter(format!(
                        "malformed filter: field '{name}' is nested under field '{parent}'"
                    )));
                }
                parse_field(name, value)?
            }
        };
        nodes.push(node);
    }
    Ok(nodes)
}

fn parse_logical(op: LogicalOperator, value: &Value, field: Option<&str>) -> Result<FilterNode> {
    let children = match (value, field) {
        (Value::Object(map), _) => parse_mapping(map, field)?,
        (Value::Array(items), _) => items
            .iter()
            .map(|item| parse_group(op, item, field))
            .collect::<Result<Vec<_>>>()?,
        (other, Some(field)) => vec![parse_shorthand(field, other)?],
        (_, None) => {
            return Err(QuarryError::filter(format!(
                "'{op}' expects a mapping or a list of mappings"
            )));
        }
    };

    if children.is_empty() {
        return Err(QuarryError::filter(format!(
            "'{op}' requires at least one condition"
        )));
    }
    if op == LogicalOperator::Not && children.len() != 1 {
        return Err(QuarryError::filter(format!(
            "'NOT' expects exactly one condition, got {}",
            children.len()
        )));
    }

    Ok(FilterNode::Logical { op, children })
}

/// One element of a logical operator's list: a mapping of AND-ed conditions,
/// or a literal when a field is in scope.
fn parse_group(op: LogicalOperator, item: &Value, field: Option<&str>) -> Result<FilterNode> {
    match (item, field) {
        (Value::Object(map), _) => {
            let nodes = parse_mapping(map, field)?;
            if nodes.is_empty() {
                return Err(QuarryError::filter(format!(
                    "'{op}' contains an empty condition group"
                )));
            }
            Ok(conjoin(nodes))
        }
        (other, Some(field)) => parse_shorthand(field, other),
        (_, None) => Err(QuarryError::filter(format!(
            "'{op}' lists must contain mappings"
        ))),
    }
}

fn parse_field(name: &str, value: &Value) -> Result<FilterNode> {
    match value {
        Value::Object(map) => {
            let nodes = parse_mapping(map, Some(name))?;
            if nodes.is_empty() {
                return Err(QuarryError::filter(format!(
                    "field '{name}' has no conditions"
                )));
            }
            Ok(conjoin(nodes))
        }
        other => parse_shorthand(name, other),
    }
}

/// A bare value under a field: `IN` for lists, `EQ` otherwise.
fn parse_shorthand(field: &str, value: &Value) -> Result<FilterNode> {
    let op = if value.is_array() {
        ComparisonOperator::In
    } else {
        ComparisonOperator::Eq
    };
    parse_comparison(field, op, value)
}

fn parse_comparison(field: &str, op: ComparisonOperator, value: &Value) -> Result<FilterNode> {
    let operand = DataValue::from_json(value).ok_or_else(|| {
        QuarryError::filter(format!(
            "operand of '{op}' on field '{field}' must be a value or a list of values"
        ))
    })?;
    if op.takes_list() && operand.as_list().is_none() {
        return Err(QuarryError::filter(format!(
            "'{op}' on field '{field}' expects a list of values"
        )));
    }
    Ok(FilterNode::Comparison {
        field: field.to_string(),
        op,
        operand,
    })
}
