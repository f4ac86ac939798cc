//! Stochastic library workload
//!
//! Drives a session with a seeded mix of inserts, deletes, updates, and
//! queries against a `library` table of books. The binary runs it as a demo;
//! tests use it as a determinism harness: the same seed must produce the
//! same final snapshot and event history.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use tracing::{info, warn};

use crate::collection::Snapshot;
use crate::config::LibraryConfig;
use crate::constraint::ConstraintSet;
use crate::error::EngineError;
use crate::query::Filter;
use crate::record::{Record, RecordType};
use crate::session::Session;
use crate::value::{FieldType, Value};

const TABLE: &str = "library";
const ISBN_MIN: i64 = 1_000_000_000_000;
const ISBN_MAX: i64 = 9_999_999_999_999;

/// Kind of workload event. The random stream draws uniformly from these,
/// in declaration order, so the stream is stable for a given seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumIter)]
pub enum EventKind {
    AddBook,
    RemoveBook,
    ReadBook,
    RunQuery,
    EmptyQuery,
    UpdateBook,
}

/// One recorded workload step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub detail: String,
    pub ok: bool,
}

/// Final state and full history of one workload run.
#[derive(Debug, PartialEq, Serialize)]
pub struct SimulationReport {
    pub books: Snapshot,
    pub history: Vec<Event>,
}

/// The record type driven by the workload.
pub fn book_type() -> Result<Arc<RecordType>, EngineError> {
    RecordType::builder("book")
        .field("title", FieldType::Str)
        .field("author", FieldType::Str)
        .field("year", FieldType::Int)
        .field("genre", FieldType::Str)
        .field("isbn", FieldType::Int)
        .field("pages", FieldType::Int)
        .build()
}

pub fn make_book(
    dtype: &Arc<RecordType>,
    title: &str,
    author: &str,
    year: i64,
    genre: &str,
    isbn: i64,
    pages: i64,
) -> Result<Record, EngineError> {
    dtype.record(vec![
        Value::Str(title.to_string()),
        Value::Str(author.to_string()),
        Value::Int(year),
        Value::Str(genre.to_string()),
        Value::Int(isbn),
        Value::Int(pages),
    ])
}


fn pick(pool: &[String], rng: &mut StdRng) -> String {
    pool.choose(rng).cloned().unwrap_or_default()
}

pub struct LibrarySimulation {
    session: Session,
    history: Vec<Event>,
    rng: StdRng,
    library: LibraryConfig,
    book_type: Arc<RecordType>,
}

impl LibrarySimulation {
    pub fn new(library: LibraryConfig) -> Result<Self, EngineError> {
        Ok(Self {
            session: Session::new(),
            history: Vec::new(),
            rng: StdRng::from_entropy(),
            library,
            book_type: book_type()?,
        })
    }

    /// Run `steps` workload events against a fresh session.
    pub fn run(&mut self, steps: usize, seed: Option<u64>) -> Result<SimulationReport, EngineError> {
        self.rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.session = Session::new();
        self.history.clear();
        self.init_table()?;

        let kinds: Vec<EventKind> = EventKind::iter().collect();
        for _ in 0..steps {
            let kind = kinds[self.rng.gen_range(0..kinds.len())];
            match kind {
                EventKind::AddBook => self.process_add()?,
                EventKind::RemoveBook => self.process_remove()?,
                EventKind::ReadBook => self.process_read()?,
                EventKind::RunQuery => self.process_query()?,
                EventKind::EmptyQuery => self.process_empty_query()?,
                EventKind::UpdateBook => self.process_update()?,
            }
        }

        let books = self.session.select_rows(TABLE, &[])?;
        Ok(SimulationReport {
            books,
            history: self.history.clone(),
        })
    }

    fn init_table(&mut self) -> Result<(), EngineError> {
        self.session
            .create_dtype("book", self.book_type.clone(), false)?;
        self.session
            .create_table(TABLE, "book", ConstraintSet::unique(&["isbn"]), false)?;
        self.session.create_index(TABLE, "base", "genre")?;
        self.session.create_index(TABLE, "base", "author")?;
        self.session.create_index(TABLE, "range", "year")?;

        let initial = [
            ("Title 1", "Author 1", 2000, "Genre 1", 1_234_567_890_123, 100),
            ("Title 2", "Author 2", 2015, "Genre 1", 1_234_567_890_124, 150),
            ("Title 3", "Author 2", 2010, "Genre 2", 1_234_567_890_125, 125),
        ];
        for (title, author, year, genre, isbn, pages) in initial {
            let book = make_book(&self.book_type, title, author, year, genre, isbn, pages)?;
            self.session.transaction(|s| s.insert(TABLE, book))?;
        }
        info!("library table initialized");
        Ok(())
    }

    fn record_event(&mut self, kind: EventKind, detail: String, ok: bool) {
        if ok {
            info!(%kind, %detail, "event");
        } else {
            warn!(%kind, %detail, "event failed");
        }
        self.history.push(Event { kind, detail, ok });
    }

    fn random_book(&mut self) -> Result<Option<Record>, EngineError> {
        let books = self.session.select_rows(TABLE, &[])?;
        if books.is_empty() {
            return Ok(None);
        }
        let pick = self.rng.gen_range(0..books.len());
        Ok(Some(books[pick].clone()))
    }

    fn process_add(&mut self) -> Result<(), EngineError> {
        let title = pick(&self.library.titles, &mut self.rng);
        let author = pick(&self.library.authors, &mut self.rng);
        let genre = pick(&self.library.genres, &mut self.rng);
        let year = self
            .rng
            .gen_range(self.library.years.min..=self.library.years.max);
        let pages = self
            .rng
            .gen_range(self.library.pages.min..=self.library.pages.max);
        let isbn = self.rng.gen_range(ISBN_MIN..=ISBN_MAX);

        let book = make_book(&self.book_type, &title, &author, year, &genre, isbn, pages)?;
        let detail = format!("isbn={isbn} title={title:?}");
        match self.session.transaction(|s| s.insert(TABLE, book)) {
            Ok(()) => self.record_event(EventKind::AddBook, detail, true),
            Err(EngineError::ConstraintFailed { .. }) => {
                self.record_event(EventKind::AddBook, detail, false);
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    fn process_remove(&mut self) -> Result<(), EngineError> {
        let Some(book) = self.random_book()? else {
            self.record_event(EventKind::RemoveBook, "no books present".to_string(), false);
            return Ok(());
        };
        let Some(Value::Int(isbn)) = book.get("isbn").cloned() else {
            return Ok(());
        };
        self.session
            .transaction(|s| s.delete(TABLE, &[Filter::eq("isbn", isbn)]))?;
        self.record_event(EventKind::RemoveBook, format!("isbn={isbn}"), true);
        Ok(())
    }

    fn process_read(&mut self) -> Result<(), EngineError> {
        let Some(book) = self.random_book()? else {
            self.record_event(EventKind::ReadBook, "no books present".to_string(), false);
            return Ok(());
        };
        info!(book = %book, "reading");
        let isbn = book.get("isbn").cloned().unwrap_or(Value::Int(0));
        self.record_event(EventKind::ReadBook, format!("isbn={isbn}"), true);
        Ok(())
    }

    fn process_query(&mut self) -> Result<(), EngineError> {
        let action = self.rng.gen_range(0..3);
        let (detail, hits) = match action {
            0 => {
                let hits = self
                    .session
                    .select(TABLE, &[Filter::ge("year", 2000), Filter::lt("year", 2011)])?;
                ("year in [2000, 2011)".to_string(), hits.len())
            }
            1 => {
                let min_pages = self.library.pages.min;
                let hits = self
                    .session
                    .select(TABLE, &[Filter::gt("pages", min_pages)])?;
                (format!("pages > {min_pages}"), hits.len())
            }
            _ => {
                let Some(book) = self.random_book()? else {
                    self.record_event(EventKind::RunQuery, "no books present".to_string(), false);
                    return Ok(());
                };
                let isbn = book.get("isbn").cloned().unwrap_or(Value::Int(0));
                let hits = self
                    .session
                    .select(TABLE, &[Filter::parse("isbn", isbn.clone())])?;
                (format!("isbn={isbn}"), hits.len())
            }
        };
        self.record_event(EventKind::RunQuery, format!("{detail} -> {hits}"), true);
        Ok(())
    }

    fn process_empty_query(&mut self) -> Result<(), EngineError> {
        let threshold = self.library.pages.min - 1;
        let hits = self
            .session
            .select(TABLE, &[Filter::lt("pages", threshold)])?;
        self.record_event(
            EventKind::EmptyQuery,
            format!("pages < {threshold} -> {}", hits.len()),
            hits.is_empty(),
        );
        Ok(())
    }

    fn process_update(&mut self) -> Result<(), EngineError> {
        let Some(book) = self.random_book()? else {
            self.record_event(EventKind::UpdateBook, "no books present".to_string(), false);
            return Ok(());
        };
        let Some(Value::Int(isbn)) = book.get("isbn").cloned() else {
            return Ok(());
        };
        let title = pick(&self.library.titles, &mut self.rng);
        let author = pick(&self.library.authors, &mut self.rng);
        let detail = format!("isbn={isbn} title={title:?} author={author:?}");
        let updates = [
            ("title", Value::Str(title.clone())),
            ("author", Value::Str(author.clone())),
        ];
        match self
            .session
            .transaction(|s| s.update(TABLE, &updates, &[Filter::eq("isbn", isbn)]))
        {
            Ok(()) => self.record_event(EventKind::UpdateBook, detail, true),
            Err(EngineError::ConstraintFailed { .. }) => {
                self.record_event(EventKind::UpdateBook, detail, false);
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }
}
