//! Filters and the operator set
//!
//! A filter is one `(field, operator, value)` clause. Filter keys follow the
//! `FIELD("__"OP)?` grammar: `"year__ge"` compares the `year` field with
//! `ge`, a bare `"year"` means equality, and an unrecognized suffix after
//! `__` is treated as part of the field name with implicit equality.
//!
//! Values are compared strictly by kind: a filter whose value kind differs
//! from the stored field kind never matches, for equality and ordering
//! alike. No coercion is attempted.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::value::Value;

/// Set of row positions produced by a query.
pub type PosSet = BTreeSet<usize>;

/// The closed set of comparison operators usable in filters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Operator {
    /// Equality.
    Eq,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Membership in a candidate set.
    In,
}

/// Right-hand side of a filter: one value, or the candidate set for `in`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    One(Value),
    Many(Vec<Value>),
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        FilterValue::One(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::One(Value::Int(v))
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::One(Value::Int(v.into()))
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::One(Value::Float(v))
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::One(Value::Str(v.to_string()))
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::One(Value::Str(v))
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::One(Value::Bool(v))
    }
}

impl From<Vec<Value>> for FilterValue {
    fn from(vs: Vec<Value>) -> Self {
        FilterValue::Many(vs)
    }
}

/// One query clause. Clauses combine by intersection, in caller order.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: Operator,
    pub value: FilterValue,
}

impl Filter {
    /// Parse a `FIELD("__"OP)?` key. An unknown suffix after `__` folds back
    /// into the field name and the operator defaults to `eq`.
    pub fn parse(key: &str, value: impl Into<FilterValue>) -> Filter {
        if let Some((field, suffix)) = key.rsplit_once("__")
            && let Ok(op) = suffix.parse::<Operator>()
        {
            return Filter {
                field: field.to_string(),
                op,
                value: value.into(),
            };
        }
        Filter {
            field: key.to_string(),
            op: Operator::Eq,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Self::clause(field, Operator::Eq, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Self::clause(field, Operator::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Self::clause(field, Operator::Ge, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Self::clause(field, Operator::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Self::clause(field, Operator::Le, value)
    }

    /// Membership filter: matches rows whose field equals any candidate.
    pub fn is_in(field: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Filter {
        Filter {
            field: field.into(),
            op: Operator::In,
            value: FilterValue::Many(values.into_iter().collect()),
        }
    }

    fn clause(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Filter {
        Filter {
            field: field.into(),
            op,
            value: FilterValue::One(value.into()),
        }
    }

    /// Evaluate this clause against one stored value. Used by full scans;
    /// indexes answer the same question from their key maps.
    pub(crate) fn matches(&self, candidate: &Value) -> bool {
        match (self.op, &self.value) {
            (Operator::Eq, FilterValue::One(v)) => candidate == v,
            (Operator::Gt, FilterValue::One(v)) => {
                candidate.cmp_same_kind(v) == Some(Ordering::Greater)
            }
            (Operator::Ge, FilterValue::One(v)) => matches!(
                candidate.cmp_same_kind(v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            (Operator::Lt, FilterValue::One(v)) => {
                candidate.cmp_same_kind(v) == Some(Ordering::Less)
            }
            (Operator::Le, FilterValue::One(v)) => matches!(
                candidate.cmp_same_kind(v),
                Some(Ordering::Less | Ordering::Equal)
            ),
            (Operator::In, FilterValue::Many(vs)) => vs.iter().any(|v| candidate == v),
            // A single-value candidate set degenerates to equality.
            (Operator::In, FilterValue::One(v)) => candidate == v,
            // Ordering operators need a single right-hand value.
            (_, FilterValue::Many(_)) => false,
        }
    }
}
