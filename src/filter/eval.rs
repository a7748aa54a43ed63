//! Recursive evaluation of normalized filters against documents.

use std::borrow::Cow;

use crate::data::{Content, DataValue, Document, Table};
use crate::error::{QuarryError, Result};
use crate::filter::FilterNode;
use crate::filter::compare::{order, type_name, values_equal};
use crate::filter::operator::{ComparisonOperator, LogicalOperator};

/// A document's value for a filter field.
#[derive(Debug)]
enum FieldValue<'a> {
    Missing,
    Value(Cow<'a, DataValue>),
    Table(&'a Table),
}

/// Resolve `field` on `document`.
///
/// `id`, `content` and `content_type` are built in; `meta.<key>` and any
/// other name look up the metadata.
fn resolve<'a>(document: &'a Document, field: &str) -> FieldValue<'a> {
    match field {
        "id" => FieldValue::Value(Cow::Owned(DataValue::String(document.id().to_string()))),
        "content_type" => FieldValue::Value(Cow::Owned(DataValue::String(
            document.content_type().as_str().to_string(),
        ))),
        "content" => match document.content() {
            Content::Text(text) => FieldValue::Value(Cow::Owned(DataValue::String(text.clone()))),
            Content::Table(table) => FieldValue::Table(table),
        },
        _ => {
            let key = field.strip_prefix("meta.").unwrap_or(field);
            document
                .get_meta(key)
                .map(|value| FieldValue::Value(Cow::Borrowed(value)))
                .unwrap_or(FieldValue::Missing)
        }
    }
}

/// Evaluate `node` against `document` with short-circuit AND/OR.
pub fn evaluate(node: &FilterNode, document: &Document) -> Result<bool> {
    match node {
        FilterNode::Logical { op, children } => match op {
            LogicalOperator::And => {
                for child in children {
                    if !evaluate(child, document)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            LogicalOperator::Or => {
                for child in children {
                    if evaluate(child, document)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            LogicalOperator::Not => match children.as_slice() {
                [child] => Ok(!evaluate(child, document)?),
                _ => Err(QuarryError::filter(format!(
                    "'NOT' expects exactly one condition, got {}",
                    children.len()
                ))),
            },
        },
        FilterNode::Comparison { field, op, operand } => {
            compare(field, &resolve(document, field), *op, operand)
        }
    }
}

fn compare(
    field: &str,
    found: &FieldValue<'_>,
    op: ComparisonOperator,
    operand: &DataValue,
) -> Result<bool> {
    match op {
        ComparisonOperator::Eq => Ok(equals(found, operand)),
        ComparisonOperator::Ne => Ok(!equals(found, operand)),
        ComparisonOperator::In => Ok(is_member(found, candidates(field, op, operand)?)),
        ComparisonOperator::Nin => Ok(!is_member(found, candidates(field, op, operand)?)),
        ComparisonOperator::Gt
        | ComparisonOperator::Gte
        | ComparisonOperator::Lt
        | ComparisonOperator::Lte => {
            let value = match found {
                FieldValue::Missing => return Ok(false),
                FieldValue::Value(value) if value.is_null() => return Ok(false),
                FieldValue::Value(value) => &**value,
                FieldValue::Table(_) => {
                    return Err(QuarryError::filter(format!(
                        "field '{field}' holds a table and cannot be compared with '{op}'"
                    )));
                }
            };
            let ordering = order(value, operand).ok_or_else(|| {
                QuarryError::filter(format!(
                    "cannot compare field '{field}' ({}) with {} using '{op}'",
                    type_name(value),
                    type_name(operand)
                ))
            })?;
            Ok(match op {
                ComparisonOperator::Gt => ordering.is_gt(),
                ComparisonOperator::Gte => ordering.is_ge(),
                ComparisonOperator::Lt => ordering.is_lt(),
                _ => ordering.is_le(),
            })
        }
    }
}

/// A missing field equals only an explicit `null`; a table equals nothing.
fn equals(found: &FieldValue<'_>, operand: &DataValue) -> bool {
    match found {
        FieldValue::Missing => operand.is_null(),
        FieldValue::Value(value) => values_equal(value, operand),
        FieldValue::Table(_) => false,
    }
}

fn candidates<'o>(
    field: &str,
    op: ComparisonOperator,
    operand: &'o DataValue,
) -> Result<&'o [DataValue]> {
    operand.as_list().ok_or_else(|| {
        QuarryError::filter(format!(
            "'{op}' on field '{field}' expects a list of values"
        ))
    })
}

/// A missing field is never a member. A list field is a member if any of its
/// items is.
fn is_member(found: &FieldValue<'_>, candidates: &[DataValue]) -> bool {
    match found {
        FieldValue::Missing | FieldValue::Table(_) => false,
        FieldValue::Value(value) => match &**value {
            DataValue::List(items) => items
                .iter()
                .any(|item| candidates.iter().any(|c| values_equal(item, c))),
            single => candidates.iter().any(|c| values_equal(single, c)),
        },
    }
}
