//! Secondary indexes
//!
//! An index is bound to one field and maps each value of that field to the
//! set of row positions currently holding it. The table drives every index
//! through the observation interface below; queries ask an index for
//! positions and fall back to a full scan when the index reports the
//! operator unsupported.

mod equality;
mod range;

pub use equality::EqualityIndex;
pub use range::RangeIndex;

use crate::collection::Rows;
use crate::error::EngineError;
use crate::query::{FilterValue, Operator, PosSet};
use crate::record::Record;
use crate::value::Value;

/// Outcome of asking an index for positions.
///
/// `Unsupported` tells the planner to fall back to a scan; it never escapes
/// to callers as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexAnswer {
    Hit(PosSet),
    Unsupported,
}

/// Observation interface between a table and one of its indexes.
pub trait Index {
    /// Field this index is bound to.
    fn field(&self) -> &str;

    /// Discard all state and reinsert every `(row.field, position)` pair.
    fn rebuild(&mut self, rows: &Rows);

    /// Register `pos` under the appended row's key.
    fn on_append(&mut self, row: &Record, pos: usize);

    /// Move `pos` from the old row's key to the new one. A no-op when the
    /// indexed field did not change.
    fn on_update(&mut self, old: &Record, new: &Record, pos: usize);

    /// Remove `pos` from the removed row's key, dropping the bucket when it
    /// empties. Only valid for the last position; interior removals go
    /// through `rebuild`.
    fn on_pop(&mut self, row: &Record, pos: usize);

    /// Positions matching `op value`, or `Unsupported` to request a scan.
    fn lookup(&self, op: Operator, value: &FilterValue) -> IndexAnswer;

    /// Whether any live row currently holds `value` in the indexed field.
    fn contains_key(&self, value: &Value) -> bool;
}

/// Build an index by its string tag: `"base"` (equality) or `"range"`.
pub fn create(tag: &str, field: &str) -> Result<Box<dyn Index>, EngineError> {
    match tag {
        "base" => Ok(Box::new(EqualityIndex::new(field))),
        "range" => Ok(Box::new(RangeIndex::new(field))),
        other => Err(EngineError::UnknownIndexType(other.to_string())),
    }
}
