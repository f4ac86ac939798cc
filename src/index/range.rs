//! Ordered range index
//!
//! Keys live in an ordered map, so `eq` and `in` are joined by the four
//! ordering operators. Equal keys still coalesce into one position bucket.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::collection::Rows;
use crate::index::{Index, IndexAnswer};
use crate::query::{FilterValue, Operator, PosSet};
use crate::record::Record;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct RangeIndex {
    field: String,
    buckets: BTreeMap<Value, PosSet>,
}

impl RangeIndex {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            buckets: BTreeMap::new(),
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

    /// Union of the buckets whose keys fall inside `bounds`.
    ///
    /// Keys of another kind can land inside the bound window because
    /// cross-kind ordering is by kind tag; a scan would never match them,
    /// so they are skipped here to keep indexed and scanned results equal.
    fn collect_range(
        &self,
        bounds: (Bound<&Value>, Bound<&Value>),
        probe: &Value,
    ) -> PosSet {
        let mut out = PosSet::new();
        for (key, bucket) in self.buckets.range::<Value, _>(bounds) {
            if !key.same_kind(probe) {
                continue;
            }
            out.extend(bucket.iter().copied());
        }
        out
    }
}

impl Index for RangeIndex {
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
            (Operator::Gt, FilterValue::One(v)) => {
                IndexAnswer::Hit(self.collect_range((Bound::Excluded(v), Bound::Unbounded), v))
            }
            (Operator::Ge, FilterValue::One(v)) => {
                IndexAnswer::Hit(self.collect_range((Bound::Included(v), Bound::Unbounded), v))
            }
            (Operator::Lt, FilterValue::One(v)) => {
                IndexAnswer::Hit(self.collect_range((Bound::Unbounded, Bound::Excluded(v)), v))
            }
            (Operator::Le, FilterValue::One(v)) => {
                IndexAnswer::Hit(self.collect_range((Bound::Unbounded, Bound::Included(v)), v))
            }
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
            .field("year", FieldType::Int)
            .build()
            .unwrap()
    }

    fn index_of(years: &[i64]) -> RangeIndex {
        let dtype = dtype();
        let mut rows = Rows::new(dtype.clone());
        for year in years {
            rows.push(dtype.record(vec![Value::Int(*year)]).unwrap()).unwrap();
        }
        let mut idx = RangeIndex::new("year");
        idx.rebuild(&rows);
        idx
    }

    fn hits(answer: IndexAnswer) -> Vec<usize> {
        match answer {
            IndexAnswer::Hit(set) => set.into_iter().collect(),
            IndexAnswer::Unsupported => panic!("expected a hit"),
        }
    }

    #[test]
    fn test_bound_inclusivity() {
        let idx = index_of(&[2000, 2015, 2010]);
        assert_eq!(hits(idx.lookup(Operator::Gt, &FilterValue::from(2010))), vec![1]);
        assert_eq!(hits(idx.lookup(Operator::Ge, &FilterValue::from(2010))), vec![1, 2]);
        assert_eq!(hits(idx.lookup(Operator::Lt, &FilterValue::from(2010))), vec![0]);
        assert_eq!(hits(idx.lookup(Operator::Le, &FilterValue::from(2010))), vec![0, 2]);
    }

    #[test]
    fn test_bound_value_need_not_be_a_key() {
        let idx = index_of(&[2000, 2015, 2010]);
        assert_eq!(hits(idx.lookup(Operator::Ge, &FilterValue::from(2011))), vec![1]);
        assert_eq!(
            hits(idx.lookup(Operator::Le, &FilterValue::from(2024))),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_equal_keys_share_one_bucket() {
        let idx = index_of(&[2010, 2010, 2020]);
        assert_eq!(hits(idx.lookup(Operator::Eq, &FilterValue::from(2010))), vec![0, 1]);
        assert_eq!(
            hits(idx.lookup(Operator::Lt, &FilterValue::from(2020))),
            vec![0, 1]
        );
    }

    #[test]
    fn test_cross_kind_probe_matches_nothing() {
        let idx = index_of(&[2000, 2015]);
        assert!(hits(idx.lookup(Operator::Gt, &FilterValue::from("1999"))).is_empty());
        assert!(hits(idx.lookup(Operator::Eq, &FilterValue::from("2000"))).is_empty());
    }

    #[test]
    fn test_membership_and_unsupported() {
        let idx = index_of(&[2000, 2015, 2010]);
        let answer = idx.lookup(
            Operator::In,
            &FilterValue::Many(vec![Value::Int(2000), Value::Int(2010)]),
        );
        assert_eq!(hits(answer), vec![0, 2]);
        assert_eq!(
            idx.lookup(Operator::Gt, &FilterValue::Many(vec![Value::Int(1)])),
            IndexAnswer::Unsupported
        );
    }
}
