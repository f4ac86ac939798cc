//! reltab: embeddable in-process, in-memory relational table engine
//!
//! Typed tables over runtime-described record types, secondary indexes
//! (hashed equality and ordered range), per-field uniqueness, a small filter
//! query language with an index-or-scan planner, and a single-writer
//! transaction log with exact-inverse rollback. All state lives in memory
//! and vanishes with the session.
//!
//! ```
//! use reltab::{ConstraintSet, FieldType, Filter, RecordType, Session, Value};
//!
//! let dtype = RecordType::builder("book")
//!     .field("title", FieldType::Str)
//!     .field("isbn", FieldType::Int)
//!     .build()?;
//!
//! let mut session = Session::new();
//! session.create_dtype("book", dtype.clone(), false)?;
//! session.create_table("library", "book", ConstraintSet::unique(&["isbn"]), false)?;
//! session.insert(
//!     "library",
//!     dtype.record(vec![Value::from("Dune"), Value::from(1234567890123_i64)])?,
//! )?;
//!
//! let hits = session.select("library", &[Filter::parse("isbn", 1234567890123_i64)])?;
//! assert_eq!(hits.len(), 1);
//! # Ok::<(), reltab::EngineError>(())
//! ```

pub mod collection;
pub mod config;
pub mod constraint;
pub mod error;
pub mod index;
pub mod query;
pub mod record;
pub mod session;
pub mod simulation;
pub mod table;
pub mod value;

// Re-export commonly used types
pub use collection::{Rows, Snapshot};
pub use config::Config;
pub use constraint::{ConstraintKind, ConstraintSet};
pub use error::EngineError;
pub use query::{Filter, FilterValue, Operator, PosSet};
pub use record::{Record, RecordType, RecordTypeBuilder};
pub use session::{LogEntry, Session};
pub use table::Table;
pub use value::{FieldType, Value};
