//! Tables
//!
//! A table owns one row collection, the indexes bound to its fields, and its
//! constraint set. Every mutation flows through the collection first, then
//! fans out to every live index; queries consult indexes clause by clause
//! and fall back to scanning when an operator is unsupported.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::collection::Rows;
use crate::constraint::{ConstraintKind, ConstraintSet};
use crate::error::EngineError;
use crate::index::{self, Index, IndexAnswer};
use crate::query::{Filter, PosSet};
use crate::record::{Record, RecordType};
use crate::value::Value;

pub struct Table {
    rows: Rows,
    indexes: BTreeMap<String, Box<dyn Index>>,
    constraints: ConstraintSet,
    created: bool,
}

impl Table {
    pub fn new(rows: Rows, constraints: ConstraintSet) -> Self {
        Self {
            rows,
            indexes: BTreeMap::new(),
            constraints,
            created: false,
        }
    }

    pub fn dtype(&self) -> &Arc<RecordType> {
        self.rows.dtype()
    }

    pub fn is_created(&self) -> bool {
        self.created
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

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    pub fn has_index(&self, field: &str) -> bool {
        self.indexes.contains_key(field)
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    fn ensure_created(&self) -> Result<(), EngineError> {
        if self.created {
            Ok(())
        } else {
            Err(EngineError::TableNotCreated)
        }
    }

    /// Materialize an equality index on every UNIQUE field that lacks one,
    /// then mark the table created. Idempotent.
    pub fn create(&mut self) -> Result<(), EngineError> {
        if self.created {
            return Ok(());
        }
        let unique: Vec<String> = self
            .constraints
            .fields(ConstraintKind::Unique)
            .iter()
            .cloned()
            .collect();
        for field in unique {
            if !self.indexes.contains_key(&field) {
                self.create_index("base", &field)?;
            }
        }
        self.created = true;
        Ok(())
    }

    /// Build an index on `field` and load it from the current rows.
    pub fn create_index(&mut self, tag: &str, field: &str) -> Result<(), EngineError> {
        if self.indexes.contains_key(field) {
            return Err(EngineError::IndexExists(field.to_string()));
        }
        if !self.rows.dtype().has_field(field) {
            return Err(EngineError::UnknownName(field.to_string()));
        }
        let mut idx = index::create(tag, field)?;
        idx.rebuild(&self.rows);
        self.indexes.insert(field.to_string(), idx);
        Ok(())
    }

    /// Remove the index on `field` if present; quiet otherwise.
    pub fn drop_index(&mut self, field: &str) {
        self.indexes.remove(field);
    }

    /// Register a constraint over `fields`. UNIQUE fields get an implicit
    /// equality index when they lack one.
    pub fn create_constraint(
        &mut self,
        kind: ConstraintKind,
        fields: &[&str],
    ) -> Result<(), EngineError> {
        match kind {
            ConstraintKind::Unique => {
                for field in fields {
                    if !self.rows.dtype().has_field(field) {
                        return Err(EngineError::UnknownName((*field).to_string()));
                    }
                }
                self.constraints.add(kind, fields);
                for field in fields {
                    if !self.indexes.contains_key(*field) {
                        self.create_index("base", field)?;
                    }
                }
                Ok(())
            }
            ConstraintKind::ForeignKey => Err(EngineError::UnsupportedConstraint(kind)),
        }
    }

    /// Subtract `fields` from the constraint. For UNIQUE the implicit
    /// indexes go with them.
    pub fn drop_constraint(&mut self, kind: ConstraintKind, fields: &[&str]) {
        let removed = self.constraints.remove(kind, fields);
        if kind == ConstraintKind::Unique {
            for field in &removed {
                self.drop_index(field);
            }
        }
    }

    /// Check every UNIQUE field of `row` against current table contents,
    /// skipping fields where the old and new key are equal (updates).
    fn check_unique(&self, row: &Record, changed_only: Option<&Record>) -> Result<(), EngineError> {
        for field in self.constraints.fields(ConstraintKind::Unique) {
            let Some(key) = row.get(field) else { continue };
            if let Some(old) = changed_only
                && old.get(field) == Some(key)
            {
                continue;
            }
            // Unique fields normally carry an implicit equality index; fall
            // back to a scan if it was dropped out from under the constraint.
            let taken = match self.indexes.get(field) {
                Some(idx) => idx.contains_key(key),
                None => self.rows.iter().any(|r| r.get(field) == Some(key)),
            };
            if taken {
                return Err(EngineError::ConstraintFailed {
                    kind: ConstraintKind::Unique,
                    field: field.clone(),
                    value: key.clone(),
                });
            }
        }
        Ok(())
    }

    /// Append a row. Type check first, uniqueness second; on success every
    /// index observes the new position.
    pub fn append(&mut self, row: Record) -> Result<(), EngineError> {
        self.ensure_created()?;
        if !row.is_of(self.rows.dtype()) {
            return Err(EngineError::InvalidType(format!(
                "expected a record of type {:?}, got {:?}",
                self.rows.dtype().name(),
                row.dtype().name()
            )));
        }
        self.check_unique(&row, None)?;
        let pos = self.rows.len();
        self.rows.push(row)?;
        if let Some(row) = self.rows.get(pos) {
            for idx in self.indexes.values_mut() {
                idx.on_append(row, pos);
            }
        }
        Ok(())
    }

    /// Remove and return the last row, if any.
    pub fn pop(&mut self) -> Result<Option<Record>, EngineError> {
        self.ensure_created()?;
        let Some(row) = self.rows.pop() else {
            return Ok(None);
        };
        let pos = self.rows.len();
        for idx in self.indexes.values_mut() {
            idx.on_pop(&row, pos);
        }
        Ok(Some(row))
    }

    /// Remove the first row equal to `row`, then rebuild every index
    /// (positions after the removal point have shifted). Returns whether a
    /// row was removed.
    pub fn remove(&mut self, row: &Record) -> Result<bool, EngineError> {
        self.ensure_created()?;
        let removed = self.rows.remove_first(row);
        if removed {
            self.rebuild_indexes();
        }
        Ok(removed)
    }

    /// Remove and return the row at `pos`. With `auto_update` the indexes
    /// are rebuilt immediately; without it the caller must call
    /// [`Table::rebuild_indexes`] before the next query.
    ///
    /// Panics if `pos` is out of bounds.
    pub fn remove_at(&mut self, pos: usize, auto_update: bool) -> Result<Record, EngineError> {
        self.ensure_created()?;
        let row = self.rows.pop_at(pos);
        if auto_update {
            self.rebuild_indexes();
        }
        Ok(row)
    }

    /// Insert `row` at `pos`, shifting later rows. Same `auto_update`
    /// policy as [`Table::remove_at`].
    ///
    /// Panics if `pos > len`.
    pub fn insert_at(
        &mut self,
        row: Record,
        pos: usize,
        auto_update: bool,
    ) -> Result<(), EngineError> {
        self.ensure_created()?;
        self.rows.insert(pos, row)?;
        if auto_update {
            self.rebuild_indexes();
        }
        Ok(())
    }

    /// Replace the row at `pos` by functional field replacement. UNIQUE is
    /// checked only for updated fields whose value actually changes.
    ///
    /// Panics if `pos` is out of bounds.
    pub fn update_at(&mut self, pos: usize, updates: &[(&str, Value)]) -> Result<(), EngineError> {
        self.ensure_created()?;
        let old_row = self.rows[pos].clone();
        let new_row = old_row.with_updates(updates)?;
        self.check_unique(&new_row, Some(&old_row))?;
        self.rows.set(pos, new_row)?;
        let new_row = &self.rows[pos];
        for idx in self.indexes.values_mut() {
            idx.on_update(&old_row, new_row, pos);
        }
        Ok(())
    }

    /// Overwrite the row at `pos` verbatim and rebuild every index. Used by
    /// rollback to restore a logged row without re-checking constraints.
    pub(crate) fn restore_at(&mut self, pos: usize, row: Record) -> Result<(), EngineError> {
        self.ensure_created()?;
        self.rows.set(pos, row)?;
        self.rebuild_indexes();
        Ok(())
    }

    /// Reload every index from the current rows.
    pub fn rebuild_indexes(&mut self) {
        debug!(rows = self.rows.len(), indexes = self.indexes.len(), "rebuilding indexes");
        for idx in self.indexes.values_mut() {
            idx.rebuild(&self.rows);
        }
    }

    /// Resolve `filters` to the set of matching positions.
    ///
    /// Clauses are evaluated in caller order and combined by intersection.
    /// Each clause consults the field's index when one exists, scanning
    /// otherwise or when the index reports the operator unsupported. An
    /// empty clause result short-circuits to the empty set. No filters
    /// selects every position.
    pub fn query(&self, filters: &[Filter]) -> Result<PosSet, EngineError> {
        self.ensure_created()?;
        if filters.is_empty() {
            return Ok((0..self.rows.len()).collect());
        }
        let mut acc: Option<PosSet> = None;
        for filter in filters {
            let hits = match self.indexes.get(filter.field.as_str()) {
                Some(idx) => match idx.lookup(filter.op, &filter.value) {
                    IndexAnswer::Hit(set) => set,
                    IndexAnswer::Unsupported => self.scan(filter),
                },
                None => self.scan(filter),
            };
            if hits.is_empty() {
                return Ok(PosSet::new());
            }
            acc = Some(match acc {
                None => hits,
                Some(mut current) => {
                    current.retain(|pos| hits.contains(pos));
                    current
                }
            });
        }
        Ok(acc.unwrap_or_default())
    }

    fn scan(&self, filter: &Filter) -> PosSet {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                row.get(&filter.field)
                    .is_some_and(|value| filter.matches(value))
            })
            .map(|(pos, _)| pos)
            .collect()
    }
}
