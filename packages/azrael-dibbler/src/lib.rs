//! The asset store (spec.md §4.4).
//!
//! Backed by a `BTreeMap<String, Bytes>` keyed on the full URL path, so
//! prefix-range scans are contiguous and a naive `starts_with` can't
//! confuse `/instances/1` with `/instances/11` — every boundary check
//! here requires an exact match or a match followed by `'/'`.

pub mod error;

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use azrael_types::{Fragment, FragmentData, FragmentMeta, ObjectId};
use bytes::Bytes;
use tracing::debug;

pub use error::DibblerError;

fn template_prefix(name: &str) -> String {
    format!("/templates/{name}")
}

fn instance_prefix(obj_id: ObjectId) -> String {
    format!("/instances/{obj_id}")
}

/// True if `key` is `prefix` itself or lives under it, never a bare
/// numeric-string overlap (`/instances/1` must not match `/instances/11`).
fn under_prefix(key: &str, prefix: &str) -> bool {
    key == prefix || key.starts_with(&format!("{prefix}/"))
}

/// A per-fragment update: either replace the pose/type meta, or
/// replace the fragment's raw file payload. A caller sends one or the
/// other so untouched fragments stay untouched and a meta-only edit
/// never rewrites file bytes.
#[derive(Debug, Clone)]
pub enum FragmentUpdate {
    Meta(FragmentMeta),
    Data(FragmentData),
}

/// The asset store. Interior-mutable, shared behind an `Arc` like `Store`.
pub struct Dibbler {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl Dibbler {
    pub fn new() -> Self {
        Dibbler {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Writes every fragment's files under `/templates/<name>/<frag>/...`
    /// plus a per-fragment meta document. Returns the template's URL.
    pub fn add_template(&self, name: &str, fragments: &BTreeMap<String, Fragment>) -> Result<String, DibblerError> {
        let prefix = template_prefix(name);
        let mut guard = self.objects.write().map_err(|_| DibblerError::LockPoisoned)?;
        if guard.keys().any(|k| under_prefix(k, &prefix)) {
            return Err(DibblerError::AlreadyExists { path: prefix });
        }
        for (frag_name, fragment) in fragments {
            write_fragment(&mut guard, &prefix, frag_name, fragment)?;
        }
        debug!(template = name, fragments = fragments.len(), "template added");
        Ok(prefix)
    }

    /// Copies the entire asset subtree of `name` to `/instances/<objID>/...`.
    pub fn spawn_template(&self, name: &str, obj_id: ObjectId) -> Result<String, DibblerError> {
        let template_pfx = template_prefix(name);
        let instance_pfx = instance_prefix(obj_id);
        let mut guard = self.objects.write().map_err(|_| DibblerError::LockPoisoned)?;
        if guard.keys().any(|k| under_prefix(k, &instance_pfx)) {
            return Err(DibblerError::AlreadyExists { path: instance_pfx });
        }
        let copied: Vec<(String, Bytes)> = guard
            .iter()
            .filter(|(k, _)| under_prefix(k, &template_pfx))
            .map(|(k, v)| (k.replacen(&template_pfx, &instance_pfx, 1), v.clone()))
            .collect();
        if copied.is_empty() {
            return Err(DibblerError::NotFound { path: template_pfx });
        }
        for (key, value) in copied {
            guard.insert(key, value);
        }
        debug!(template = name, obj_id = %obj_id, "template spawned");
        Ok(instance_pfx)
    }

    /// Rewrites only the named fragments of a live instance. Fragments
    /// not present in `updates` are left untouched.
    pub fn update_fragments(
        &self,
        obj_id: ObjectId,
        updates: HashMap<String, FragmentUpdate>,
    ) -> Result<(), DibblerError> {
        let instance_pfx = instance_prefix(obj_id);
        let mut guard = self.objects.write().map_err(|_| DibblerError::LockPoisoned)?;
        if !guard.keys().any(|k| under_prefix(k, &instance_pfx)) {
            return Err(DibblerError::NotFound { path: instance_pfx });
        }
        for (frag_name, update) in updates {
            let frag_pfx = format!("{instance_pfx}/{frag_name}");
            match update {
                FragmentUpdate::Meta(meta) => {
                    let meta_key = format!("{frag_pfx}/meta.json");
                    let bytes = serde_json::to_vec(&meta).map_err(|_| DibblerError::LockPoisoned)?;
                    guard.insert(meta_key, Bytes::from(bytes));
                }
                FragmentUpdate::Data(data) => {
                    let files_pfx = format!("{frag_pfx}/files");
                    let stale: Vec<String> = guard
                        .keys()
                        .filter(|k| under_prefix(k, &files_pfx))
                        .cloned()
                        .collect();
                    for key in stale {
                        guard.remove(&key);
                    }
                    for (filename, bytes) in data.0 {
                        guard.insert(format!("{files_pfx}/{filename}"), Bytes::from(bytes));
                    }
                }
            }
        }
        debug!(obj_id = %obj_id, "fragments updated");
        Ok(())
    }

    pub fn del_template(&self, name: &str) -> Result<(), DibblerError> {
        self.delete_subtree(&template_prefix(name))
    }

    pub fn del_instance(&self, obj_id: ObjectId) -> Result<(), DibblerError> {
        self.delete_subtree(&instance_prefix(obj_id))
    }

    /// Removes a single fragment's subtree from a live instance
    /// (spec.md §4.5.1 tombstone updates), without touching its siblings.
    pub fn del_fragment(&self, obj_id: ObjectId, frag_name: &str) -> Result<(), DibblerError> {
        self.delete_subtree(&format!("{}/{frag_name}", instance_prefix(obj_id)))
    }

    fn delete_subtree(&self, prefix: &str) -> Result<(), DibblerError> {
        let mut guard = self.objects.write().map_err(|_| DibblerError::LockPoisoned)?;
        let keys: Vec<String> = guard.keys().filter(|k| under_prefix(k, prefix)).cloned().collect();
        if keys.is_empty() {
            return Err(DibblerError::NotFound {
                path: prefix.to_string(),
            });
        }
        for key in keys {
            guard.remove(&key);
        }
        Ok(())
    }

    /// Reads the raw bytes at an exact URL path, if present.
    pub fn get(&self, path: &str) -> Result<Option<Bytes>, DibblerError> {
        let guard = self.objects.read().map_err(|_| DibblerError::LockPoisoned)?;
        Ok(guard.get(path).cloned())
    }

    pub fn reset(&self) -> Result<(), DibblerError> {
        let mut guard = self.objects.write().map_err(|_| DibblerError::LockPoisoned)?;
        guard.clear();
        Ok(())
    }
}

impl Default for Dibbler {
    fn default() -> Self {
        Self::new()
    }
}

fn write_fragment(
    guard: &mut BTreeMap<String, Bytes>,
    prefix: &str,
    frag_name: &str,
    fragment: &Fragment,
) -> Result<(), DibblerError> {
    let frag_pfx = format!("{prefix}/{frag_name}");
    let meta_bytes = serde_json::to_vec(&fragment.meta).map_err(|_| DibblerError::LockPoisoned)?;
    guard.insert(format!("{frag_pfx}/meta.json"), Bytes::from(meta_bytes));
    for (filename, bytes) in &fragment.fragdata.0 {
        guard.insert(format!("{frag_pfx}/files/{filename}"), Bytes::from(bytes.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use azrael_types::FragmentType;

    fn sample_fragments() -> BTreeMap<String, Fragment> {
        let mut map = BTreeMap::new();
        map.insert(
            "frag_1".to_string(),
            Fragment::raw(FragmentData::single("model.raw", vec![1, 2, 3])),
        );
        map
    }

    #[test]
    fn add_template_then_spawn_copies_subtree() {
        let dibbler = Dibbler::new();
        dibbler.add_template("box", &sample_fragments()).unwrap();
        let url = dibbler.spawn_template("box", ObjectId::new(1)).unwrap();
        assert_eq!(url, "/instances/1");
        assert!(dibbler.get("/instances/1/frag_1/files/model.raw").unwrap().is_some());
    }

    #[test]
    fn instances_one_and_eleven_do_not_collide() {
        let dibbler = Dibbler::new();
        dibbler.add_template("box", &sample_fragments()).unwrap();
        dibbler.spawn_template("box", ObjectId::new(1)).unwrap();
        dibbler.spawn_template("box", ObjectId::new(11)).unwrap();
        dibbler.del_instance(ObjectId::new(1)).unwrap();
        assert!(dibbler.get("/instances/11/frag_1/files/model.raw").unwrap().is_some());
    }

    #[test]
    fn duplicate_template_name_is_rejected() {
        let dibbler = Dibbler::new();
        dibbler.add_template("box", &sample_fragments()).unwrap();
        assert!(dibbler.add_template("box", &sample_fragments()).is_err());
    }

    #[test]
    fn spawn_of_unknown_template_is_not_found() {
        let dibbler = Dibbler::new();
        assert!(dibbler.spawn_template("missing", ObjectId::new(1)).is_err());
    }

    #[test]
    fn update_fragments_data_replaces_files_without_touching_other_fragments() {
        let dibbler = Dibbler::new();
        let mut fragments = sample_fragments();
        fragments.insert(
            "frag_2".to_string(),
            Fragment::raw(FragmentData::single("other.raw", vec![9])),
        );
        dibbler.add_template("box", &fragments).unwrap();
        dibbler.spawn_template("box", ObjectId::new(1)).unwrap();

        let mut updates = HashMap::new();
        updates.insert(
            "frag_1".to_string(),
            FragmentUpdate::Data(FragmentData::single("model.raw", vec![7, 7])),
        );
        dibbler.update_fragments(ObjectId::new(1), updates).unwrap();

        assert_eq!(
            dibbler.get("/instances/1/frag_1/files/model.raw").unwrap().unwrap().as_ref(),
            &[7, 7][..]
        );
        assert!(dibbler.get("/instances/1/frag_2/files/other.raw").unwrap().is_some());
    }

    #[test]
    fn del_instance_is_not_found_on_missing_instance() {
        let dibbler = Dibbler::new();
        assert!(matches!(
            dibbler.del_instance(ObjectId::new(99)),
            Err(DibblerError::NotFound { .. })
        ));
    }

    #[test]
    fn fragment_type_round_trips_through_meta_json() {
        let dibbler = Dibbler::new();
        dibbler.add_template("box", &sample_fragments()).unwrap();
        let raw = dibbler.get("/templates/box/frag_1/meta.json").unwrap().unwrap();
        let meta: FragmentMeta = serde_json::from_slice(&raw).unwrap();
        assert_eq!(meta.fragtype, FragmentType::Raw);
    }
}
