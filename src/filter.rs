//! Structured metadata filters.
//!
//! A filter is written as nested JSON mappings. Keys are logical operators
//! (`AND`, `OR`, `NOT`), comparison operators (`EQ`, `NE`, `IN`, `NIN`, `GT`,
//! `GTE`, `LT`, `LTE`) or field names. The `$`-prefixed spelling (`$and`,
//! `$gte`) is accepted as well.
//!
//! Shorthand is resolved structurally when the filter is parsed:
//!
//! - sibling entries without a logical operator are AND-ed,
//! - a bare literal under a field means `EQ`,
//! - a bare list under a field means `IN`.
//!
//! ```
//! use quarry::filter::Filter;
//! use serde_json::json;
//!
//! let filter = Filter::parse(&json!({
//!     "type": "article",
//!     "date": {"GTE": "2015-01-01", "LT": "2021-01-01"},
//!     "rating": {"GTE": 3},
//!     "OR": {
//!         "genre": ["economy", "politics"],
//!         "publisher": "nytimes"
//!     }
//! }))
//! .unwrap();
//! assert!(!filter.is_empty());
//! ```
//!
//! To repeat a logical operator at the same level, give it a list of mappings:
//!
//! ```
//! use quarry::filter::Filter;
//! use serde_json::json;
//!
//! let filter = Filter::parse(&json!({
//!     "OR": [
//!         {"AND": {"type": "news", "date": {"LT": "2019-01-01"}}},
//!         {"AND": {"type": "blog", "date": {"GTE": "2019-01-01"}}}
//!     ]
//! }))
//! .unwrap();
//! assert!(!filter.is_empty());
//! ```
//!
//! Besides metadata keys, filters can address the built-in fields `id`,
//! `content` and `content_type`. `meta.<key>` always addresses metadata.

pub mod compare;
pub mod eval;
pub mod operator;
pub mod parser;

use serde::Deserialize;

use crate::data::{DataValue, Document};
use crate::error::Result;

pub use operator::{ComparisonOperator, LogicalOperator};

/// A normalized filter expression node.
///
/// Every shorthand form has been rewritten into explicit operators, so
/// evaluation never has to guess.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Logical {
        op: LogicalOperator,
        children: Vec<FilterNode>,
    },
    Comparison {
        field: String,
        op: ComparisonOperator,
        operand: DataValue,
    },
}

impl FilterNode {
    pub fn comparison(
        field: impl Into<String>,
        op: ComparisonOperator,
        operand: impl Into<DataValue>,
    ) -> Self {
        FilterNode::Comparison {
            field: field.into(),
            op,
            operand: operand.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::comparison(field, ComparisonOperator::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::comparison(field, ComparisonOperator::Ne, value)
    }

    pub fn is_in<V: Into<DataValue>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::comparison(field, ComparisonOperator::In, values)
    }

    pub fn not_in<V: Into<DataValue>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::comparison(field, ComparisonOperator::Nin, values)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::comparison(field, ComparisonOperator::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::comparison(field, ComparisonOperator::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::comparison(field, ComparisonOperator::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::comparison(field, ComparisonOperator::Lte, value)
    }

    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::Logical {
            op: LogicalOperator::And,
            children,
        }
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Logical {
            op: LogicalOperator::Or,
            children,
        }
    }

    pub fn not(child: FilterNode) -> Self {
        FilterNode::Logical {
            op: LogicalOperator::Not,
            children: vec![child],
        }
    }

    /// Evaluate this node against a document.
    pub fn matches(&self, document: &Document) -> Result<bool> {
        eval::evaluate(self, document)
    }
}

/// A parsed filter. The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Filter {
    root: Option<FilterNode>,
}

impl Filter {
    /// The empty filter.
    pub fn all() -> Self {
        Self { root: None }
    }

    /// Parse and normalize a JSON filter expression.
    ///
    /// `null` and `{}` yield the empty filter. Malformed expressions fail with
    /// [`QuarryError::Filter`](crate::QuarryError::Filter).
    pub fn parse(expression: &serde_json::Value) -> Result<Self> {
        Ok(Self {
            root: parser::parse(expression)?,
        })
    }

    pub fn from_node(node: FilterNode) -> Self {
        Self { root: Some(node) }
    }

    pub fn root(&self) -> Option<&FilterNode> {
        self.root.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Combine two filters with AND.
    pub fn and(self, other: Filter) -> Filter {
        match (self.root, other.root) {
            (None, None) => Filter::all(),
            (Some(node), None) | (None, Some(node)) => Filter::from_node(node),
            (Some(left), Some(right)) => Filter::from_node(FilterNode::and(vec![left, right])),
        }
    }

    /// Whether the document satisfies this filter.
    pub fn matches(&self, document: &Document) -> Result<bool> {
        match &self.root {
            Some(node) => eval::evaluate(node, document),
            None => Ok(true),
        }
    }
}

impl From<FilterNode> for Filter {
    fn from(node: FilterNode) -> Self {
        Filter::from_node(node)
    }
}

impl TryFrom<serde_json::Value> for Filter {
    type Error = crate::error::QuarryError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Filter::parse(&value)
    }
}

/// Parse `expression` and evaluate it against `document` in one step.
pub fn matches(expression: &serde_json::Value, document: &Document) -> Result<bool> {
    Filter::parse(expression)?.matches(document)
}
