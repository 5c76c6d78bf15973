//! The constraint index (spec.md §4.3).
//!
//! Internal representation: a map from the de-duplication key
//! `(conType, rb_a, rb_b, aid)` to the full constraint record, plus an
//! inverted index `body -> set<key>` for O(k) lookup by body, the same
//! "foreign key to another table" shape the document store generalizes
//! from a relational index to a physics constraint graph.

pub mod error;

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use azrael_types::{ConstraintMeta, ConstraintType, ObjectId};
use tracing::debug;

pub use error::IgorError;

type DedupKey = (ConstraintType, ObjectId, ObjectId, String);

fn dedup_key(c: &ConstraintMeta) -> DedupKey {
    let (t, a, b, aid) = c.dedup_key();
    (t, a, b, aid.to_string())
}

#[derive(Default)]
struct Index {
    records: HashMap<DedupKey, ConstraintMeta>,
    by_body: HashMap<ObjectId, HashSet<DedupKey>>,
}

/// The constraint index. Interior-mutable, intended to be shared
/// behind an `Arc` the way `Store` is.
pub struct Igor {
    index: RwLock<Index>,
}

impl Igor {
    pub fn new() -> Self {
        Igor {
            index: RwLock::new(Index::default()),
        }
    }

    /// Adds every constraint in `constraints`, de-duplicating both
    /// within the batch and against what is already indexed. Returns
    /// the number of distinct constraints this call resolved
    /// (newly inserted or already present) — re-adding an identical
    /// constraint is a no-op but still counts toward the total.
    pub fn add_constraints(&self, constraints: Vec<ConstraintMeta>) -> Result<usize, IgorError> {
        let mut guard = self.index.write().map_err(|_| IgorError::LockPoisoned)?;
        let mut seen_this_call = HashSet::new();
        let mut count = 0;
        for c in constraints {
            let key = dedup_key(&c);
            if !seen_this_call.insert(key.clone()) {
                continue;
            }
            if !guard.records.contains_key(&key) {
                guard.by_body.entry(c.rb_a).or_default().insert(key.clone());
                guard.by_body.entry(c.rb_b).or_default().insert(key.clone());
                guard.records.insert(key.clone(), c);
            }
            count += 1;
        }
        debug!(count, "constraints added");
        Ok(count)
    }

    /// Removes every constraint in `constraints` that is currently
    /// indexed. Returns the count actually removed.
    pub fn delete_constraints(&self, constraints: &[ConstraintMeta]) -> Result<usize, IgorError> {
        let mut guard = self.index.write().map_err(|_| IgorError::LockPoisoned)?;
        let mut removed = 0;
        for c in constraints {
            let key = dedup_key(c);
            if guard.records.remove(&key).is_some() {
                if let Some(set) = guard.by_body.get_mut(&c.rb_a) {
                    set.remove(&key);
                }
                if let Some(set) = guard.by_body.get_mut(&c.rb_b) {
                    set.remove(&key);
                }
                removed += 1;
            }
        }
        debug!(removed, "constraints deleted");
        Ok(removed)
    }

    /// Returns every constraint touching any body in `bodies`, or
    /// every constraint if `bodies` is `None`.
    pub fn get_constraints(&self, bodies: Option<&[ObjectId]>) -> Result<Vec<ConstraintMeta>, IgorError> {
        let guard = self.index.read().map_err(|_| IgorError::LockPoisoned)?;
        match bodies {
            None => Ok(guard.records.values().cloned().collect()),
            Some(bodies) => {
                let mut keys: HashSet<DedupKey> = HashSet::new();
                for body in bodies {
                    if let Some(set) = guard.by_body.get(body) {
                        keys.extend(set.iter().cloned());
                    }
                }
                Ok(keys.into_iter().filter_map(|k| guard.records.get(&k).cloned()).collect())
            }
        }
    }

    pub fn count(&self) -> Result<usize, IgorError> {
        let guard = self.index.read().map_err(|_| IgorError::LockPoisoned)?;
        Ok(guard.records.len())
    }

    /// Drops every constraint touching `body`, used when an instance is removed.
    pub fn remove_body(&self, body: ObjectId) -> Result<usize, IgorError> {
        let touching = self.get_constraints(Some(&[body]))?;
        self.delete_constraints(&touching)
    }

    pub fn reset(&self) -> Result<(), IgorError> {
        let mut guard = self.index.write().map_err(|_| IgorError::LockPoisoned)?;
        guard.records.clear();
        guard.by_body.clear();
        Ok(())
    }
}

impl Default for Igor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azrael_types::ConstraintType;

    fn c(aid: &str, a: u64, b: u64) -> ConstraintMeta {
        ConstraintMeta::new(
            aid.to_string(),
            ConstraintType::P2P,
            ObjectId::new(a),
            ObjectId::new(b),
            serde_json::json!({}),
        )
    }

    #[test]
    fn add_deduplicates_identical_constraint_within_a_batch() {
        let igor = Igor::new();
        let added = igor.add_constraints(vec![c("link", 1, 2), c("link", 1, 2)]).unwrap();
        assert_eq!(added, 1);
        assert_eq!(igor.count().unwrap(), 1);
    }

    #[test]
    fn readding_an_existing_constraint_is_a_noop_still_counted() {
        let igor = Igor::new();
        igor.add_constraints(vec![c("link", 1, 2)]).unwrap();
        let added = igor.add_constraints(vec![c("link", 1, 2)]).unwrap();
        assert_eq!(added, 1);
        assert_eq!(igor.count().unwrap(), 1);
    }

    #[test]
    fn get_constraints_by_body_returns_touching_only() {
        let igor = Igor::new();
        igor.add_constraints(vec![c("a", 1, 2), c("b", 3, 4)]).unwrap();
        let touching_one = igor.get_constraints(Some(&[ObjectId::new(1)])).unwrap();
        assert_eq!(touching_one.len(), 1);
        assert_eq!(touching_one[0].aid, "a");
    }

    #[test]
    fn get_constraints_none_returns_all() {
        let igor = Igor::new();
        igor.add_constraints(vec![c("a", 1, 2), c("b", 3, 4)]).unwrap();
        assert_eq!(igor.get_constraints(None).unwrap().len(), 2);
    }

    #[test]
    fn delete_constraints_removes_from_both_bodies_index() {
        let igor = Igor::new();
        igor.add_constraints(vec![c("a", 1, 2)]).unwrap();
        let removed = igor.delete_constraints(&[c("a", 1, 2)]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(igor.get_constraints(Some(&[ObjectId::new(1)])).unwrap().len(), 0);
        assert_eq!(igor.get_constraints(Some(&[ObjectId::new(2)])).unwrap().len(), 0);
    }

    #[test]
    fn remove_body_drops_everything_touching_it() {
        let igor = Igor::new();
        igor.add_constraints(vec![c("a", 1, 2), c("b", 1, 3)]).unwrap();
        let removed = igor.remove_body(ObjectId::new(1)).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(igor.count().unwrap(), 0);
    }
}
