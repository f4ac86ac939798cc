//! Hash-backed equality index
//!
//! Answers `eq` and `in` lookups from a hash map; every other operator is
//! reported unsupported so the planner scans instead.

use std::collections::HashMap;

use crate::collection::Rows;
use crate::index::{Index, IndexAnswer};
use crate::query::{FilterValue, Operator, PosSet};
use crate::record::Record;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct EqualityIndex {
    field: String,
    buckets: HashMap<Value, PosSet>,
}

impl EqualityIndex {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            buckets: HashMap::new(),
        }
    }

    fn add(&mut self, key: Value, pos: usize) {
        self.buckets.entry(key).or_default().insert(pos);
    }

    fn drop_position(&mut self, key: &Value, pos: usize) {
        if let Some(bucket) = self.buckets.get_mut(key) {
            bucket.remove(&pos);
            if bucket.is_empty() {
                self.buckets.remove(key);
            }
        }
    }

    fn positions_for(&self, value: &Value) -> PosSet {
        self.buckets.get(value).cloned().unwrap_or_default()
    }
}

impl Index for EqualityIndex {
    fn field(&self) -> &str {
        &self.field
    }

    fn rebuild(&mut self, rows: &Rows) {
        self.buckets.clear();
        for (pos, row) in rows.iter().enumerate() {
            if let Some(key) = row.get(&self.field) {
                self.add(key.clone(), pos);
            }
        }
    }

    fn on_append(&mut self, row: &Record, pos: usize) {
        if let Some(key) = row.get(&self.field) {
            self.add(key.clone(), pos);
        }
    }

    fn on_update(&mut self, old: &Record, new: &Record, pos: usize) {
        let (Some(old_key), Some(new_key)) = (old.get(&self.field), new.get(&self.field)) else {
            return;
        };
        if old_key == new_key {
            return;
        }
        self.drop_position(old_key, pos);
        self.add(new_key.clone(), pos);
    }

    fn on_pop(&mut self, row: &Record, pos: usize) {
        if let Some(key) = row.get(&self.field) {
            self.drop_position(key, pos);
        }
    }

    fn lookup(&self, op: Operator, value: &FilterValue) -> IndexAnswer {
        match (op, value) {
            (Operator::Eq, FilterValue::One(v)) => IndexAnswer::Hit(self.positions_for(v)),
            (Operator::In, FilterValue::Many(vs)) => {
                let mut hits = PosSet::new();
                for v in vs {
                    hits.extend(self.positions_for(v));
                }
                IndexAnswer::Hit(hits)
            }
            (Operator::In, FilterValue::One(v)) => IndexAnswer::Hit(self.positions_for(v)),
            _ => IndexAnswer::Unsupported,
        }
    }

    fn contains_key(&self, value: &Value) -> bool {
        self.buckets.contains_key(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordType;
    use crate::value::FieldType;
    use std::sync::Arc;

    fn dtype() -> Arc<RecordType> {
        RecordType::builder("entry")
            .field("genre", FieldType::Str)
            .field("n", FieldType::Int)
            .build()
            .unwrap()
    }

    fn entry(dtype: &Arc<RecordType>, genre: &str, n: i64) -> Record {
        dtype
            .record(vec![Value::Str(genre.to_string()), Value::Int(n)])
            .unwrap()
    }

    fn hits(answer: IndexAnswer) -> Vec<usize> {
        match answer {
            IndexAnswer::Hit(set) => set.into_iter().collect(),
            IndexAnswer::Unsupported => panic!("expected a hit"),
        }
    }

    #[test]
    fn test_rebuild_groups_positions_by_key() {
        let dtype = dtype();
        let mut rows = Rows::new(dtype.clone());
        for (genre, n) in [("a", 1), ("b", 2), ("a", 3)] {
            rows.push(entry(&dtype, genre, n)).unwrap();
        }
        let mut idx = EqualityIndex::new("genre");
        idx.rebuild(&rows);
        assert_eq!(
            hits(idx.lookup(Operator::Eq, &FilterValue::from("a"))),
            vec![0, 2]
        );
        assert!(idx.contains_key(&Value::from("b")));
        assert!(!idx.contains_key(&Value::from("c")));
    }

    #[test]
    fn test_append_update_pop_keep_buckets_coherent() {
        let dtype = dtype();
        let mut idx = EqualityIndex::new("genre");

        let first = entry(&dtype, "a", 1);
        idx.on_append(&first, 0);
        let second = entry(&dtype, "a", 2);
        idx.on_append(&second, 1);

        // Moving position 0 from "a" to "b" must not disturb position 1.
        let moved = entry(&dtype, "b", 1);
        idx.on_update(&first, &moved, 0);
        assert_eq!(hits(idx.lookup(Operator::Eq, &FilterValue::from("a"))), vec![1]);
        assert_eq!(hits(idx.lookup(Operator::Eq, &FilterValue::from("b"))), vec![0]);

        // Popping the last "b" row drops its bucket entirely.
        idx.on_pop(&moved, 0);
        assert!(!idx.contains_key(&Value::from("b")));
    }

    #[test]
    fn test_update_with_unchanged_key_is_a_no_op() {
        let dtype = dtype();
        let mut idx = EqualityIndex::new("genre");
        let before = entry(&dtype, "a", 1);
        idx.on_append(&before, 0);
        let after = entry(&dtype, "a", 99);
        idx.on_update(&before, &after, 0);
        assert_eq!(hits(idx.lookup(Operator::Eq, &FilterValue::from("a"))), vec![0]);
    }

    #[test]
    fn test_membership_lookup_unions_candidates() {
        let dtype = dtype();
        let mut rows = Rows::new(dtype.clone());
        for (genre, n) in [("a", 1), ("b", 2), ("c", 3)] {
            rows.push(entry(&dtype, genre, n)).unwrap();
        }
        let mut idx = EqualityIndex::new("genre");
        idx.rebuild(&rows);
        let answer = idx.lookup(
            Operator::In,
            &FilterValue::Many(vec![Value::from("a"), Value::from("c"), Value::from("zz")]),
        );
        assert_eq!(hits(answer), vec![0, 2]);
    }

    #[test]
    fn test_ordering_operators_are_unsupported() {
        let idx = EqualityIndex::new("n");
        for op in [Operator::Gt, Operator::Ge, Operator::Lt, Operator::Le] {
            assert_eq!(idx.lookup(op, &FilterValue::from(1)), IndexAnswer::Unsupported);
        }
    }
}
