//! Record types and record values
//!
//! A [`RecordType`] is the runtime descriptor of a user-declared aggregate:
//! an ordered list of named, typed fields. Descriptors are immutable once
//! built and shared by `Arc`; two tables carry the same type only when they
//! share the same allocation, which is what makes dtype drops cascade to
//! exactly the tables declared with that descriptor.
//!
//! A [`Record`] is one immutable row value: the descriptor plus a value per
//! field, positionally aligned. Updates never mutate in place; they go
//! through [`Record::with_updates`], which produces a fresh record.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::error::EngineError;
use crate::value::{FieldType, Value};

/// One named, typed field of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
}

/// Runtime descriptor of a record aggregate.
#[derive(Debug)]
pub struct RecordType {
    name: String,
    fields: Vec<FieldDef>,
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    /// Build a record of this type, validating arity and per-field kinds.
    pub fn record(self: &Arc<Self>, values: Vec<Value>) -> Result<Record, EngineError> {
        if values.len() != self.fields.len() {
            return Err(EngineError::InvalidType(format!(
                "record type {:?} has {} fields, got {} values",
                self.name,
                self.fields.len(),
                values.len()
            )));
        }
        for (def, value) in self.fields.iter().zip(&values) {
            if value.field_type() != def.ty {
                return Err(EngineError::InvalidType(format!(
                    "field {:?} expects {}, got {}",
                    def.name,
                    def.ty,
                    value.field_type()
                )));
            }
        }
        Ok(Record {
            dtype: Arc::clone(self),
            values,
        })
    }
}

/// Fluent construction of a [`RecordType`].
///
/// ```
/// use reltab::{FieldType, RecordType};
///
/// let dtype = RecordType::builder("book")
///     .field("title", FieldType::Str)
///     .field("year", FieldType::Int)
///     .build()
///     .unwrap();
/// assert!(dtype.has_field("year"));
/// ```
pub struct RecordTypeBuilder {
    name: String,
    fields: Vec<FieldDef>,
}

impl RecordTypeBuilder {
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
        });
        self
    }

    /// Finalize the descriptor. A descriptor must have at least one field
    /// and no duplicate field names.
    pub fn build(self) -> Result<Arc<RecordType>, EngineError> {
        if self.fields.is_empty() {
            return Err(EngineError::InvalidType(format!(
                "record type {:?} declares no fields",
                self.name
            )));
        }
        for (i, def) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|d| d.name == def.name) {
                return Err(EngineError::DuplicateName(def.name.clone()));
            }
        }
        Ok(Arc::new(RecordType {
            name: self.name,
            fields: self.fields,
        }))
    }
}

/// An immutable row value of some [`RecordType`].
#[derive(Debug, Clone)]
pub struct Record {
    dtype: Arc<RecordType>,
    values: Vec<Value>,
}

impl Record {
    pub fn dtype(&self) -> &Arc<RecordType> {
        &self.dtype
    }

    /// Whether this record was built from exactly the given descriptor.
    pub fn is_of(&self, dtype: &Arc<RecordType>) -> bool {
        Arc::ptr_eq(&self.dtype, dtype)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.dtype.field_index(field).map(|i| &self.values[i])
    }

    /// Functional field replacement: a fresh record with the named fields
    /// overridden and every other field carried over. Unknown field names
    /// and kind mismatches are rejected before anything is copied.
    pub fn with_updates(&self, updates: &[(&str, Value)]) -> Result<Record, EngineError> {
        for (field, value) in updates {
            let Some(def) = self.dtype.field(field) else {
                return Err(EngineError::UnknownName((*field).to_string()));
            };
            if value.field_type() != def.ty {
                return Err(EngineError::InvalidType(format!(
                    "field {:?} expects {}, got {}",
                    field,
                    def.ty,
                    value.field_type()
                )));
            }
        }
        let mut values = self.values.clone();
        for (field, value) in updates {
            if let Some(i) = self.dtype.field_index(field) {
                values[i] = value.clone();
            }
        }
        Ok(Record {
            dtype: Arc::clone(&self.dtype),
            values,
        })
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.dtype, &other.dtype) && self.values == other.values
    }
}

impl Eq for Record {}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ", self.dtype.name())?;
        for (i, (def, value)) in self.dtype.fields().iter().zip(&self.values).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", def.name, value)?;
        }
        write!(f, " }}")
    }
}

// Serialized as a field-name → value map so snapshots dump as plain objects.
impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (def, value) in self.dtype.fields().iter().zip(&self.values) {
            map.serialize_entry(&def.name, value)?;
        }
        map.end()
    }
}
