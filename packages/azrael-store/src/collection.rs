//! A single named collection of JSON documents (spec.md §4.2).

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::path::FieldPath;

/// One `put` request: insert `data` under `aid` iff no document with
/// that `aid` currently exists.
#[derive(Debug, Clone)]
pub struct PutOp {
    pub aid: String,
    pub data: Value,
}

/// One `mod` request: check every `exists` precondition, then apply
/// every mutation, atomically with respect to this one document.
#[derive(Debug, Clone, Default)]
pub struct ModOp {
    pub aid: String,
    pub exists: Vec<(FieldPath, bool)>,
    pub inc: Vec<(FieldPath, f64)>,
    pub set: Vec<(FieldPath, Value)>,
    pub unset: Vec<FieldPath>,
}

impl ModOp {
    pub fn new(aid: impl Into<String>) -> Self {
        ModOp {
            aid: aid.into(),
            ..Default::default()
        }
    }
}

/// A projection: a list of field paths to keep, or `None` for the whole document.
pub type Projection = Option<Vec<FieldPath>>;

fn project(doc: &Value, projection: &Projection) -> Value {
    let Some(paths) = projection else {
        return doc.clone();
    };
    let mut out = Value::Object(serde_json::Map::new());
    for path in paths {
        if let Some(v) = path.get(doc) {
            path.set(&mut out, v.clone());
        }
    }
    out
}

/// A named collection of JSON documents, keyed by `aid`.
///
/// Every method here is atomic with respect to a single document; a
/// multi-document request makes its own per-document decisions under
/// one lock acquisition and reports success per `aid` rather than
/// promising cross-document atomicity (spec.md §4.2 concurrency note).
pub struct Collection {
    name: String,
    docs: RwLock<HashMap<String, Value>>,
}

impl Collection {
    pub fn new(name: impl Into<String>, initial_capacity: usize) -> Self {
        Collection {
            name: name.into(),
            docs: RwLock::new(HashMap::with_capacity(initial_capacity)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn put(&self, ops: Vec<PutOp>) -> Result<HashMap<String, bool>, StoreError> {
        let mut guard = self.docs.write().map_err(|_| {
            error!(collection = %self.name, "document store lock poisoned");
            StoreError::LockPoisoned
        })?;
        let mut results = HashMap::with_capacity(ops.len());
        for op in ops {
            let inserted = if guard.contains_key(&op.aid) {
                false
            } else {
                guard.insert(op.aid.clone(), op.data);
                true
            };
            debug!(collection = %self.name, aid = %op.aid, inserted, "put");
            results.insert(op.aid, inserted);
        }
        Ok(results)
    }

    pub fn modify(&self, ops: Vec<ModOp>) -> Result<HashMap<String, bool>, StoreError> {
        let mut guard = self.docs.write().map_err(|_| {
            error!(collection = %self.name, "document store lock poisoned");
            StoreError::LockPoisoned
        })?;
        let mut results = HashMap::with_capacity(ops.len());
        for op in ops {
            let ok = match guard.get_mut(&op.aid) {
                None => false,
                Some(doc) => {
                    let preconditions_hold = op.exists.iter().all(|(path, want)| path.exists(doc) == *want);
                    if !preconditions_hold {
                        false
                    } else {
                        let mut scratch = doc.clone();
                        let mut failed = false;
                        for (path, delta) in &op.inc {
                            if path.inc(&mut scratch, *delta, &op.aid).is_err() {
                                failed = true;
                                break;
                            }
                        }
                        if !failed {
                            for (path, value) in &op.set {
                                path.set(&mut scratch, value.clone());
                            }
                            for path in &op.unset {
                                path.unset(&mut scratch);
                            }
                            *doc = scratch;
                        }
                        !failed
                    }
                }
            };
            debug!(collection = %self.name, aid = %op.aid, ok, "mod");
            results.insert(op.aid, ok);
        }
        Ok(results)
    }

    pub fn get_one(&self, aid: &str, projection: &Projection) -> Result<Option<Value>, StoreError> {
        let guard = self.docs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.get(aid).map(|doc| project(doc, projection)))
    }

    pub fn get_multi(&self, aids: &[String], projection: &Projection) -> Result<HashMap<String, Value>, StoreError> {
        let guard = self.docs.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut out = HashMap::with_capacity(aids.len());
        for aid in aids {
            if let Some(doc) = guard.get(aid) {
                out.insert(aid.clone(), project(doc, projection));
            }
        }
        Ok(out)
    }

    pub fn get_all(&self, projection: &Projection) -> Result<HashMap<String, Value>, StoreError> {
        let guard = self.docs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard
            .iter()
            .map(|(aid, doc)| (aid.clone(), project(doc, projection)))
            .collect())
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let guard = self.docs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.len())
    }

    pub fn remove(&self, aid: &str) -> Result<bool, StoreError> {
        let mut guard = self.docs.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.remove(aid).is_some())
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        let mut guard = self.docs.write().map_err(|_| StoreError::LockPoisoned)?;
        guard.clear();
        Ok(())
    }

    /// Snapshots every document for persistence (spec.md §4.2 ambient addition).
    pub fn snapshot(&self) -> Result<HashMap<String, Value>, StoreError> {
        self.get_all(&None)
    }

    /// Restores documents from a persisted snapshot, replacing current contents.
    pub fn restore(&self, docs: HashMap<String, Value>) -> Result<(), StoreError> {
        let mut guard = self.docs.write().map_err(|_| StoreError::LockPoisoned)?;
        *guard = docs;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_is_insert_if_absent() {
        let c = Collection::new("Instances", 4);
        let results = c
            .put(vec![PutOp {
                aid: "1".into(),
                data: json!({"x": 1}),
            }])
            .unwrap();
        assert_eq!(results["1"], true);

        let results = c
            .put(vec![PutOp {
                aid: "1".into(),
                data: json!({"x": 2}),
            }])
            .unwrap();
        assert_eq!(results["1"], false);
        assert_eq!(c.get_one("1", &None).unwrap().unwrap(), json!({"x": 1}));
    }

    #[test]
    fn modify_rejects_all_mutations_when_precondition_fails() {
        let c = Collection::new("Instances", 4);
        c.put(vec![PutOp {
            aid: "1".into(),
            data: json!({"rbs": {"version": 0}}),
        }])
        .unwrap();

        let mut op = ModOp::new("1");
        op.exists.push((FieldPath::parse("missing").unwrap(), true));
        op.inc.push((FieldPath::parse("rbs.version").unwrap(), 1.0));
        let results = c.modify(vec![op]).unwrap();
        assert_eq!(results["1"], false);
        assert_eq!(c.get_one("1", &None).unwrap().unwrap()["rbs"]["version"], json!(0));
    }

    #[test]
    fn modify_applies_inc_set_unset_atomically() {
        let c = Collection::new("Instances", 4);
        c.put(vec![PutOp {
            aid: "1".into(),
            data: json!({"rbs": {"version": 0}, "custom": "old"}),
        }])
        .unwrap();

        let mut op = ModOp::new("1");
        op.inc.push((FieldPath::parse("rbs.version").unwrap(), 1.0));
        op.set.push((FieldPath::parse("custom").unwrap(), json!("new")));
        op.unset.push(FieldPath::parse("rbs.version").unwrap());
        let results = c.modify(vec![op]).unwrap();
        assert_eq!(results["1"], true);
        let doc = c.get_one("1", &None).unwrap().unwrap();
        assert_eq!(doc["custom"], json!("new"));
        assert!(doc["rbs"].get("version").is_none());
    }

    #[test]
    fn projection_keeps_only_named_paths() {
        let c = Collection::new("Instances", 4);
        c.put(vec![PutOp {
            aid: "1".into(),
            data: json!({"rbs": {"position": {"x": 1, "y": 2}}, "custom": "secret"}),
        }])
        .unwrap();

        let projection = Some(vec![FieldPath::parse("rbs.position").unwrap()]);
        let doc = c.get_one("1", &projection).unwrap().unwrap();
        assert_eq!(doc, json!({"rbs": {"position": {"x": 1, "y": 2}}}));
    }

    #[test]
    fn remove_is_idempotent() {
        let c = Collection::new("Instances", 4);
        c.put(vec![PutOp {
            aid: "1".into(),
            data: json!({}),
        }])
        .unwrap();
        assert_eq!(c.remove("1").unwrap(), true);
        assert_eq!(c.remove("1").unwrap(), false);
    }
}
