//! Closed sets of logical and comparison operators.
//!
//! Operator keys are recognized in two spellings: the bare upper-case name
//! (`AND`, `GTE`) and the `$`-prefixed form (`$and`, `$gte`), the latter
//! case-insensitively. A bare key in any other case is a field name.

use std::fmt;

use crate::error::{QuarryError, Result};

/// Boolean combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    pub const ALL: [LogicalOperator; 3] = [
        LogicalOperator::And,
        LogicalOperator::Or,
        LogicalOperator::Not,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Not => "NOT",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    In,
    Nin,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 8] = [
        ComparisonOperator::Eq,
        ComparisonOperator::Ne,
        ComparisonOperator::In,
        ComparisonOperator::Nin,
        ComparisonOperator::Gt,
        ComparisonOperator::Gte,
        ComparisonOperator::Lt,
        ComparisonOperator::Lte,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "EQ",
            ComparisonOperator::Ne => "NE",
            ComparisonOperator::In => "IN",
            ComparisonOperator::Nin => "NIN",
            ComparisonOperator::Gt => "GT",
            ComparisonOperator::Gte => "GTE",
            ComparisonOperator::Lt => "LT",
            ComparisonOperator::Lte => "LTE",
        }
    }

    /// Whether the operand must be a sequence of candidates.
    pub fn takes_list(&self) -> bool {
        matches!(self, ComparisonOperator::In | ComparisonOperator::Nin)
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification of a key in a filter mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey<'a> {
    Logical(LogicalOperator),
    Comparison(ComparisonOperator),
    Field(&'a str),
}

impl<'a> FilterKey<'a> {
    /// Classify a mapping key.
    ///
    /// Fails for a `$`-prefixed key that names no known operator.
    pub fn classify(key: &'a str) -> Result<Self> {
        if let Some(name) = key.strip_prefix('$') {
            let upper = name.to_ascii_uppercase();
            return Self::lookup(&upper).ok_or_else(|| {
                QuarryError::filter(format!("unknown operator '{key}'"))
            });
        }
        Ok(Self::lookup(key).unwrap_or(FilterKey::Field(key)))
    }

    fn lookup<'k>(name: &str) -> Option<FilterKey<'k>> {
        if let Some(op) = LogicalOperator::ALL.iter().find(|op| op.name() == name) {
            return Some(FilterKey::Logical(*op));
        }
        ComparisonOperator::ALL
            .iter()
            .find(|op| op.name() == name)
            .map(|op| FilterKey::Comparison(*op))
    }
}
