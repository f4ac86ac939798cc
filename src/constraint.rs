//! Constraint vocabulary
//!
//! Constraints bind a kind to a set of field names. Uniqueness is enforced
//! per field, not as a composite key. `ForeignKey` is reserved vocabulary:
//! the tag exists so schemas can name it, but creating one is rejected until
//! referential integrity is implemented.

use std::collections::{BTreeSet, HashMap};

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Kind of table constraint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
pub enum ConstraintKind {
    #[strum(serialize = "UNIQUE")]
    Unique,
    #[strum(serialize = "FOREIGN_KEY")]
    ForeignKey,
}

/// Kind → constrained field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    entries: HashMap<ConstraintKind, BTreeSet<String>>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for the common case of a table declared with
    /// UNIQUE fields.
    pub fn unique(fields: &[&str]) -> Self {
        let mut set = Self::new();
        set.add(ConstraintKind::Unique, fields);
        set
    }

    pub fn add(&mut self, kind: ConstraintKind, fields: &[&str]) {
        self.entries
            .entry(kind)
            .or_default()
            .extend(fields.iter().map(|f| f.to_string()));
    }

    /// Set-subtract `fields` from the kind's entry, dropping the entry when
    /// it empties. Returns the fields that were actually removed.
    pub fn remove(&mut self, kind: ConstraintKind, fields: &[&str]) -> BTreeSet<String> {
        let Some(existing) = self.entries.get_mut(&kind) else {
            return BTreeSet::new();
        };
        let mut removed = BTreeSet::new();
        for field in fields {
            if existing.remove(*field) {
                removed.insert(field.to_string());
            }
        }
        if existing.is_empty() {
            self.entries.remove(&kind);
        }
        removed
    }

    /// Fields currently constrained under `kind`. Empty if the kind has no
    /// entry.
    pub fn fields(&self, kind: ConstraintKind) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        self.entries.get(&kind).unwrap_or(&EMPTY)
    }

    pub fn contains(&self, kind: ConstraintKind, field: &str) -> bool {
        self.fields(kind).contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_string_forms() {
        assert_eq!(ConstraintKind::Unique.to_string(), "UNIQUE");
        assert_eq!(ConstraintKind::ForeignKey.to_string(), "FOREIGN_KEY");
        assert_eq!("UNIQUE".parse::<ConstraintKind>(), Ok(ConstraintKind::Unique));
        assert!("PRIMARY_KEY".parse::<ConstraintKind>().is_err());
    }

    #[test]
    fn test_add_accumulates_fields() {
        let mut set = ConstraintSet::new();
        set.add(ConstraintKind::Unique, &["isbn"]);
        set.add(ConstraintKind::Unique, &["title", "isbn"]);
        let fields: Vec<&str> = set
            .fields(ConstraintKind::Unique)
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(fields, vec!["isbn", "title"]);
    }

    #[test]
    fn test_remove_is_set_subtraction() {
        let mut set = ConstraintSet::unique(&["isbn", "title"]);
        let removed = set.remove(ConstraintKind::Unique, &["title", "missing"]);
        assert_eq!(removed.len(), 1);
        assert!(removed.contains("title"));
        assert!(set.contains(ConstraintKind::Unique, "isbn"));
        assert!(!set.contains(ConstraintKind::Unique, "title"));
    }

    #[test]
    fn test_empty_entry_is_dropped() {
        let mut set = ConstraintSet::unique(&["isbn"]);
        set.remove(ConstraintKind::Unique, &["isbn"]);
        assert!(set.is_empty());
        // Removing from an absent kind is a quiet no-op.
        assert!(set.remove(ConstraintKind::Unique, &["isbn"]).is_empty());
    }
}
