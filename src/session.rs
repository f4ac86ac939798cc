//! Sessions and transactions
//!
//! A session is the public surface of the engine: a registry of named
//! record types and named tables, the CRUD and schema operations routed to
//! them, and the single transaction log. The log records one entry per
//! mutation with exactly what is needed to invert it; rollback applies the
//! inverses last-in-first-out.
//!
//! Sessions are single-writer and fully independent of each other. Wrap a
//! session in a mutex before sharing it across threads.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::collection::{Rows, Snapshot};
use crate::constraint::{ConstraintKind, ConstraintSet};
use crate::error::EngineError;
use crate::query::{Filter, PosSet};
use crate::record::{Record, RecordType};
use crate::table::Table;
use crate::value::Value;

/// One entry in the transaction log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// A row was appended at `pos`.
    Insert { table: String, pos: usize },
    /// The row at `pos` previously held `old_row`.
    Update {
        table: String,
        pos: usize,
        old_row: Record,
    },
    /// The row `row` was removed from `pos`.
    Delete {
        table: String,
        pos: usize,
        row: Record,
    },
}

#[derive(Default)]
pub struct Session {
    dtypes: HashMap<String, Arc<RecordType>>,
    tables: HashMap<String, Table>,
    transaction: Option<Vec<LogEntry>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // --- schema registry ---

    /// Register a record type under `name`.
    pub fn create_dtype(
        &mut self,
        name: &str,
        dtype: Arc<RecordType>,
        if_not_exists: bool,
    ) -> Result<(), EngineError> {
        if self.dtypes.contains_key(name) {
            if if_not_exists {
                return Ok(());
            }
            return Err(EngineError::DuplicateName(name.to_string()));
        }
        self.dtypes.insert(name.to_string(), dtype);
        Ok(())
    }

    /// Drop a record type, cascading to every table declared with exactly
    /// this descriptor.
    pub fn drop_dtype(&mut self, name: &str) -> Result<(), EngineError> {
        let Some(dtype) = self.dtypes.get(name).cloned() else {
            return Err(EngineError::UnknownName(name.to_string()));
        };
        let doomed: Vec<String> = self
            .tables
            .iter()
            .filter(|(_, table)| Arc::ptr_eq(table.dtype(), &dtype))
            .map(|(table_name, _)| table_name.clone())
            .collect();
        for table_name in doomed {
            debug!(table = %table_name, dtype = name, "dropping table with its dtype");
            self.tables.remove(&table_name);
        }
        self.dtypes.remove(name);
        Ok(())
    }

    pub fn has_dtype(&self, name: &str) -> bool {
        self.dtypes.contains_key(name)
    }

    /// Create a table of the named record type and run its `create` step.
    pub fn create_table(
        &mut self,
        name: &str,
        dtype_name: &str,
        constraints: ConstraintSet,
        if_not_exists: bool,
    ) -> Result<(), EngineError> {
        if self.tables.contains_key(name) {
            if if_not_exists {
                return Ok(());
            }
            return Err(EngineError::DuplicateName(name.to_string()));
        }
        let Some(dtype) = self.dtypes.get(dtype_name).cloned() else {
            return Err(EngineError::UnknownName(dtype_name.to_string()));
        };
        let mut table = Table::new(Rows::new(dtype), constraints);
        table.create()?;
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<(), EngineError> {
        if self.tables.remove(name).is_none() {
            return Err(EngineError::UnknownName(name.to_string()));
        }
        Ok(())
    }

    /// Read access to a table, mostly for inspection in tests and tooling.
    pub fn table(&self, name: &str) -> Result<&Table, EngineError> {
        self.tables
            .get(name)
            .ok_or_else(|| EngineError::UnknownName(name.to_string()))
    }

    fn table_mut<'a>(
        tables: &'a mut HashMap<String, Table>,
        name: &str,
    ) -> Result<&'a mut Table, EngineError> {
        tables
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownName(name.to_string()))
    }

    pub fn create_index(&mut self, table: &str, tag: &str, field: &str) -> Result<(), EngineError> {
        Self::table_mut(&mut self.tables, table)?.create_index(tag, field)
    }

    pub fn drop_index(&mut self, table: &str, field: &str) -> Result<(), EngineError> {
        Self::table_mut(&mut self.tables, table)?.drop_index(field);
        Ok(())
    }

    pub fn create_constraint(
        &mut self,
        table: &str,
        kind: ConstraintKind,
        fields: &[&str],
    ) -> Result<(), EngineError> {
        Self::table_mut(&mut self.tables, table)?.create_constraint(kind, fields)
    }

    pub fn drop_constraint(
        &mut self,
        table: &str,
        kind: ConstraintKind,
        fields: &[&str],
    ) -> Result<(), EngineError> {
        Self::table_mut(&mut self.tables, table)?.drop_constraint(kind, fields);
        Ok(())
    }

    // --- CRUD ---

    /// Append a row to the named table. Logged when a transaction is open.
    pub fn insert(&mut self, table: &str, row: Record) -> Result<(), EngineError> {
        let t = Self::table_mut(&mut self.tables, table)?;
        t.append(row)?;
        let pos = t.len() - 1;
        if let Some(log) = self.transaction.as_mut() {
            log.push(LogEntry::Insert {
                table: table.to_string(),
                pos,
            });
        }
        Ok(())
    }

    /// Resolve `filters` to matching positions in the named table.
    pub fn select(&self, table: &str, filters: &[Filter]) -> Result<PosSet, EngineError> {
        self.table(table)?.query(filters)
    }

    /// Materialize the matching rows into an immutable snapshot.
    pub fn select_rows(&self, table: &str, filters: &[Filter]) -> Result<Snapshot, EngineError> {
        let t = self.table(table)?;
        let positions = t.query(filters)?;
        let mut rows = Rows::new(t.dtype().clone());
        for pos in positions {
            if let Some(row) = t.get(pos) {
                rows.push(row.clone())?;
            }
        }
        Ok(Snapshot::new(rows))
    }

    /// Update every matching row by functional field replacement. Each
    /// per-row update is logged before it runs, so a mid-batch constraint
    /// failure can still be undone by rollback.
    pub fn update(
        &mut self,
        table: &str,
        values: &[(&str, Value)],
        filters: &[Filter],
    ) -> Result<(), EngineError> {
        let positions = self.select(table, filters)?;
        let t = Self::table_mut(&mut self.tables, table)?;
        for pos in positions {
            let Some(old_row) = t.get(pos).cloned() else {
                continue;
            };
            if let Some(log) = self.transaction.as_mut() {
                log.push(LogEntry::Update {
                    table: table.to_string(),
                    pos,
                    old_row,
                });
            }
            t.update_at(pos, values)?;
        }
        Ok(())
    }

    /// Remove every matching row. Positions are removed in descending order
    /// so earlier positions stay valid, with one index rebuild at the end.
    pub fn delete(&mut self, table: &str, filters: &[Filter]) -> Result<(), EngineError> {
        let positions = self.select(table, filters)?;
        let t = Self::table_mut(&mut self.tables, table)?;
        debug!(table, hits = positions.len(), "batch delete");
        for pos in positions.into_iter().rev() {
            let row = t.remove_at(pos, false)?;
            if let Some(log) = self.transaction.as_mut() {
                log.push(LogEntry::Delete {
                    table: table.to_string(),
                    pos,
                    row,
                });
            }
        }
        t.rebuild_indexes();
        Ok(())
    }

    // --- transactions ---

    /// Open the transaction log.
    pub fn begin(&mut self) -> Result<(), EngineError> {
        if self.transaction.is_some() {
            return Err(EngineError::TransactionAlreadyOpen);
        }
        debug!("transaction begin");
        self.transaction = Some(Vec::new());
        Ok(())
    }

    /// Discard the log, keeping every change.
    pub fn commit(&mut self) -> Result<(), EngineError> {
        let Some(log) = self.transaction.take() else {
            return Err(EngineError::NoTransaction);
        };
        debug!(entries = log.len(), "transaction commit");
        Ok(())
    }

    /// Undo every logged operation in reverse order, then discard the log.
    pub fn rollback(&mut self) -> Result<(), EngineError> {
        let Some(log) = self.transaction.take() else {
            return Err(EngineError::NoTransaction);
        };
        debug!(entries = log.len(), "transaction rollback");
        for entry in log.into_iter().rev() {
            self.undo(entry)?;
        }
        Ok(())
    }

    fn undo(&mut self, entry: LogEntry) -> Result<(), EngineError> {
        match entry {
            LogEntry::Insert { table, pos } => {
                Self::table_mut(&mut self.tables, &table)?.remove_at(pos, true)?;
            }
            LogEntry::Delete { table, pos, row } => {
                Self::table_mut(&mut self.tables, &table)?.insert_at(row, pos, true)?;
            }
            LogEntry::Update {
                table,
                pos,
                old_row,
            } => {
                Self::table_mut(&mut self.tables, &table)?.restore_at(pos, old_row)?;
            }
        }
        Ok(())
    }

    /// Run `f` inside a transaction scope: commit when it returns `Ok`,
    /// roll back and propagate when it returns `Err`.
    ///
    /// This is the only supported way to get automatic rollback.
    pub fn transaction<R>(
        &mut self,
        f: impl FnOnce(&mut Session) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                self.rollback()?;
                Err(err)
            }
        }
    }
}
