//! Row storage and immutable result views
//!
//! [`Rows`] is the dense, ordered collection behind a table: positions are
//! `0..len`, insertion order is preserved, and every write is policed
//! against the declared record type. [`Snapshot`] wraps rows materialized
//! by a query into a read-only view.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use serde::Serialize;
use serde::ser::SerializeSeq;

use crate::error::EngineError;
use crate::record::{Record, RecordType};

/// Typed, ordered, dense sequence of records.
#[derive(Debug, Clone)]
pub struct Rows {
    dtype: Arc<RecordType>,
    items: Vec<Record>,
}

impl PartialEq for Rows {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.dtype, &other.dtype) && self.items == other.items
    }
}

impl Rows {
    pub fn new(dtype: Arc<RecordType>) -> Self {
        Self {
            dtype,
            items: Vec::new(),
        }
    }

    pub fn dtype(&self) -> &Arc<RecordType> {
        &self.dtype
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Record> {
        self.items.get(pos)
    }

    fn police(&self, record: &Record) -> Result<(), EngineError> {
        if record.is_of(&self.dtype) {
            Ok(())
        } else {
            Err(EngineError::InvalidType(format!(
                "expected a record of type {:?}, got {:?}",
                self.dtype.name(),
                record.dtype().name()
            )))
        }
    }

    /// Overwrite the record at `pos`.
    ///
    /// Panics if `pos` is out of bounds, like indexed assignment on a `Vec`.
    pub fn set(&mut self, pos: usize, record: Record) -> Result<(), EngineError> {
        self.police(&record)?;
        self.items[pos] = record;
        Ok(())
    }

    pub fn push(&mut self, record: Record) -> Result<(), EngineError> {
        self.police(&record)?;
        self.items.push(record);
        Ok(())
    }

    /// Insert at `pos`, shifting everything after it.
    ///
    /// Panics if `pos > len`.
    pub fn insert(&mut self, pos: usize, record: Record) -> Result<(), EngineError> {
        self.police(&record)?;
        self.items.insert(pos, record);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Record> {
        self.items.pop()
    }

    /// Remove and return the record at `pos`, shifting everything after it.
    ///
    /// Panics if `pos` is out of bounds.
    pub fn pop_at(&mut self, pos: usize) -> Record {
        self.items.remove(pos)
    }

    /// Remove the first record equal to `record`. Returns whether one was
    /// found.
    pub fn remove_first(&mut self, record: &Record) -> bool {
        match self.position_of(record) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.items.contains(record)
    }

    pub fn position_of(&self, record: &Record) -> Option<usize> {
        self.items.iter().position(|r| r == record)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.items.iter()
    }
}

impl Index<usize> for Rows {
    type Output = Record;

    fn index(&self, pos: usize) -> &Record {
        &self.items[pos]
    }
}

impl<'a> IntoIterator for &'a Rows {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Read-only view over rows materialized by a query.
///
/// Supports length, positional access, iteration, membership, equality
/// against another snapshot or an ordered record sequence, and a
/// human-readable rendering.
#[derive(Debug, Clone)]
pub struct Snapshot {
    rows: Rows,
}

impl Snapshot {
    pub(crate) fn new(rows: Rows) -> Self {
        Self { rows }
    }

    pub fn dtype(&self) -> &Arc<RecordType> {
        self.rows.dtype()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Record> {
        self.rows.get(pos)
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.rows.contains(record)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }
}

impl Index<usize> for Snapshot {
    type Output = Record;

    fn index(&self, pos: usize) -> &Record {
        &self.rows[pos]
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl PartialEq<[Record]> for Snapshot {
    fn eq(&self, other: &[Record]) -> bool {
        self.rows.items == other
    }
}

impl PartialEq<Vec<Record>> for Snapshot {
    fn eq(&self, other: &Vec<Record>) -> bool {
        &self.rows.items == other
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, record) in self.rows.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{record}")?;
        }
        write!(f, "]")
    }
}

impl Serialize for Snapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for record in self.rows.iter() {
            seq.serialize_element(record)?;
        }
        seq.end()
    }
}
