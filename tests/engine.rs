//! End-to-end scenarios against a library table.

use std::sync::Arc;

use reltab::{
    ConstraintKind, ConstraintSet, EngineError, FieldType, Filter, Record, RecordType, Session,
    Value,
};

fn book_type() -> Arc<RecordType> {
    RecordType::builder("book")
        .field("title", FieldType::Str)
        .field("author", FieldType::Str)
        .field("year", FieldType::Int)
        .field("genre", FieldType::Str)
        .field("isbn", FieldType::Int)
        .field("pages", FieldType::Int)
        .build()
        .expect("book type builds")
}

fn book(
    dtype: &Arc<RecordType>,
    title: &str,
    author: &str,
    year: i64,
    genre: &str,
    isbn: i64,
    pages: i64,
) -> Record {
    dtype
        .record(vec![
            Value::from(title),
            Value::from(author),
            Value::Int(year),
            Value::from(genre),
            Value::Int(isbn),
            Value::Int(pages),
        ])
        .expect("book record builds")
}

/// Session with an empty `library` table: UNIQUE isbn, equality indexes on
/// genre and author, range index on year.
fn library_session() -> (Session, Arc<RecordType>) {
    let mut session = Session::new();
    let dtype = book_type();
    session.create_dtype("book", dtype.clone(), false).unwrap();
    session
        .create_table("library", "book", ConstraintSet::unique(&["isbn"]), false)
        .unwrap();
    session.create_index("library", "base", "genre").unwrap();
    session.create_index("library", "base", "author").unwrap();
    session.create_index("library", "range", "year").unwrap();
    (session, dtype)
}

/// Library session seeded with three books.
fn seeded_session() -> (Session, Arc<RecordType>) {
    let (mut session, dtype) = library_session();
    let initial = [
        ("Title 1", "Author 1", 2000, "Genre 2", 1234567890123, 100),
        ("Title 2", "Author 2", 2015, "Genre 1", 1234567890124, 150),
        ("Title 3", "Author 2", 2010, "Genre 1", 1234567890125, 125),
    ];
    for (title, author, year, genre, isbn, pages) in initial {
        session
            .insert("library", book(&dtype, title, author, year, genre, isbn, pages))
            .unwrap();
    }
    (session, dtype)
}

#[test]
fn test_insert_select_delete_by_unique_field() {
    let (mut session, _) = seeded_session();
    assert_eq!(session.select_rows("library", &[]).unwrap().len(), 3);

    session
        .delete("library", &[Filter::eq("isbn", 1234567890123_i64)])
        .unwrap();

    assert_eq!(session.select_rows("library", &[]).unwrap().len(), 2);
    assert!(
        session
            .select("library", &[Filter::eq("isbn", 1234567890123_i64)])
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_batch_delete_by_equality() {
    let (mut session, _) = seeded_session();
    session
        .delete("library", &[Filter::eq("genre", "Genre 1")])
        .unwrap();

    let remaining = session.select_rows("library", &[]).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].get("genre"), Some(&Value::from("Genre 2")));
}

#[test]
fn test_delete_with_no_matches_changes_nothing() {
    let (mut session, _) = seeded_session();
    session
        .delete("library", &[Filter::eq("isbn", 9999999999999_i64)])
        .unwrap();
    assert_eq!(session.select_rows("library", &[]).unwrap().len(), 3);
}

#[test]
fn test_range_queries_and_intersection() {
    let (session, _) = seeded_session();

    let hits = session
        .select(
            "library",
            &[Filter::eq("genre", "Genre 1"), Filter::parse("year__ge", 2010)],
        )
        .unwrap();
    assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![1, 2]);

    assert_eq!(
        session
            .select("library", &[Filter::parse("year__gt", 2010)])
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        session
            .select("library", &[Filter::parse("pages__lt", 120)])
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        session
            .select(
                "library",
                &[Filter::is_in(
                    "author",
                    [Value::from("Author 1"), Value::from("Author 2")],
                )],
            )
            .unwrap()
            .len(),
        3
    );
}

#[test]
fn test_select_without_filters_returns_every_position() {
    let (session, _) = seeded_session();
    let all = session.select("library", &[]).unwrap();
    assert_eq!(all.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn test_duplicate_insert_is_rejected() {
    let (mut session, _) = seeded_session();
    let existing = session.select_rows("library", &[]).unwrap()[0].clone();
    let err = session.insert("library", existing).unwrap_err();
    assert_eq!(
        err,
        EngineError::ConstraintFailed {
            kind: ConstraintKind::Unique,
            field: "isbn".to_string(),
            value: Value::Int(1234567890123),
        }
    );

    // A record of a foreign descriptor is rejected as a type error.
    let stray_type = book_type();
    let stray = book(&stray_type, "T", "A", 2000, "G", 1, 1);
    assert!(matches!(
        session.insert("library", stray),
        Err(EngineError::InvalidType(_))
    ));
}

#[test]
fn test_rollback_on_error_inside_transaction_scope() {
    let (mut session, dtype) = seeded_session();
    let fresh = book(&dtype, "Title 9", "Author 2", 2010, "Genre 2", 1234567890130, 100);
    let duplicate = session.select_rows("library", &[]).unwrap()[0].clone();

    let err = session
        .transaction(|s| {
            s.insert("library", fresh.clone())?;
            s.insert("library", duplicate)
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::ConstraintFailed { .. }));

    let rows = session.select_rows("library", &[]).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(!rows.contains(&fresh));
    assert!(
        session
            .select("library", &[Filter::eq("isbn", 1234567890130_i64)])
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_update_preserves_untouched_fields_and_respects_unique() {
    let (mut session, _) = seeded_session();

    session
        .update(
            "library",
            &[("title", Value::from("Renamed"))],
            &[Filter::eq("isbn", 1234567890124_i64)],
        )
        .unwrap();

    let rows = session
        .select_rows("library", &[Filter::eq("isbn", 1234567890124_i64)])
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("title"), Some(&Value::from("Renamed")));
    assert_eq!(rows[0].get("author"), Some(&Value::from("Author 2")));

    // Stealing another row's isbn must fail.
    let err = session
        .update(
            "library",
            &[("isbn", Value::Int(1234567890123))],
            &[Filter::eq("isbn", 1234567890124_i64)],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ConstraintFailed { field, .. } if field == "isbn"
    ));
}

#[test]
fn test_update_with_no_matches_changes_nothing() {
    let (mut session, _) = seeded_session();
    session
        .update(
            "library",
            &[("title", Value::from("No Change"))],
            &[Filter::eq("isbn", 9999999999999_i64)],
        )
        .unwrap();
    let rows = session.select_rows("library", &[]).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.get("title") != Some(&Value::from("No Change"))));
}

#[test]
fn test_queries_keep_working_after_deletes_shift_positions() {
    let (mut session, dtype) = seeded_session();
    session
        .delete("library", &[Filter::eq("isbn", 1234567890123_i64)])
        .unwrap();

    // Former positions 1 and 2 are now 0 and 1; every index must agree.
    let hits = session
        .select("library", &[Filter::eq("genre", "Genre 1")])
        .unwrap();
    assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![0, 1]);
    let hits = session
        .select("library", &[Filter::parse("year__ge", 2000)])
        .unwrap();
    assert_eq!(hits.len(), 2);

    // The freed isbn can be inserted again and found.
    session
        .insert(
            "library",
            book(&dtype, "Back", "Author 3", 1999, "Genre 3", 1234567890123, 310),
        )
        .unwrap();
    assert_eq!(
        session
            .select("library", &[Filter::eq("isbn", 1234567890123_i64)])
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_index_ddl_through_the_session() {
    let (mut session, _) = library_session();
    assert_eq!(
        session.create_index("library", "base", "genre"),
        Err(EngineError::IndexExists("genre".to_string()))
    );
    assert_eq!(
        session.create_index("library", "hash", "pages"),
        Err(EngineError::UnknownIndexType("hash".to_string()))
    );
    session.drop_index("library", "genre").unwrap();
    session.create_index("library", "range", "genre").unwrap();

    assert_eq!(
        session.create_constraint("library", ConstraintKind::ForeignKey, &["author"]),
        Err(EngineError::UnsupportedConstraint(ConstraintKind::ForeignKey))
    );
    session
        .create_constraint("library", ConstraintKind::Unique, &["title"])
        .unwrap();
    assert!(session.table("library").unwrap().has_index("title"));
    session
        .drop_constraint("library", ConstraintKind::Unique, &["title"])
        .unwrap();
    assert!(!session.table("library").unwrap().has_index("title"));
}

#[test]
fn test_dropping_the_dtype_drops_the_table() {
    let (mut session, _) = seeded_session();
    session.drop_dtype("book").unwrap();
    assert!(matches!(
        session.select("library", &[]),
        Err(EngineError::UnknownName(_))
    ));
}

#[test]
fn test_snapshot_is_a_stable_materialized_copy() {
    let (mut session, _) = seeded_session();
    let before = session.select_rows("library", &[]).unwrap();
    // Mutating the table afterwards must not change the snapshot.
    session
        .delete("library", &[Filter::eq("genre", "Genre 1")])
        .unwrap();
    assert_eq!(before.len(), 3);
    let after = session.select_rows("library", &[]).unwrap();
    assert_eq!(after.len(), 1);
    assert_ne!(before, after);
}
