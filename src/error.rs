//! Engine error taxonomy
//!
//! Every fallible engine operation surfaces one of these variants. The
//! index-level "operator not supported" signal is deliberately absent: it is
//! [`crate::index::IndexAnswer::Unsupported`], consumed by the query planner
//! to trigger a scan fallback, and never reaches callers.

use thiserror::Error;

use crate::constraint::ConstraintKind;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A value does not match the declared record type, or a schema input
    /// is otherwise malformed.
    #[error("type mismatch: {0}")]
    InvalidType(String),

    /// A dtype, table, or field is already registered under this name.
    #[error("name already in use: {0:?}")]
    DuplicateName(String),

    /// No dtype, table, or field with this name.
    #[error("unknown name: {0:?}")]
    UnknownName(String),

    /// Index-factory tag not recognized.
    #[error("unknown index type {0:?} (expected \"base\" or \"range\")")]
    UnknownIndexType(String),

    /// An index is already registered on this field.
    #[error("index already exists on field {0:?}")]
    IndexExists(String),

    /// Mutation or query issued before `Table::create`.
    #[error("table has not been created")]
    TableNotCreated,

    /// A uniqueness violation detected on append or update.
    #[error("{kind} constraint failed for field {field:?}: {value} is already present")]
    ConstraintFailed {
        kind: ConstraintKind,
        field: String,
        value: Value,
    },

    /// `begin` while a transaction is already open.
    #[error("a transaction is already in progress")]
    TransactionAlreadyOpen,

    /// `commit` or `rollback` without an open transaction.
    #[error("no transaction in progress")]
    NoTransaction,

    /// The constraint kind is reserved vocabulary without enforcement.
    #[error("constraint kind {0} is not enforced")]
    UnsupportedConstraint(ConstraintKind),
}
