//! The `Templates`/`Instances` document store (spec.md §4.2, §6).

use azrael_types::{
    CollisionShape, Fragment, FragmentMeta, RigidBodyState, Template,
};

use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::id_allocator::IdAllocator;

/// The two named collections plus the ID allocator, wired together the
/// way the teacher's `Database` owns one `RwLock<HashMap<...>>` per
/// table behind a single struct.
pub struct Store {
    pub templates: Collection,
    pub instances: Collection,
    pub ids: IdAllocator,
    config: StoreConfig,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        let store = Store {
            templates: Collection::new("Templates", config.initial_collection_capacity),
            instances: Collection::new("Instances", config.initial_collection_capacity),
            ids: IdAllocator::new(),
            config,
        };
        store.install_default_templates();
        store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Clears both collections, resets the ID allocator, then
    /// reinstalls the four default templates (spec.md §6).
    pub fn reset(&self) -> Result<(), StoreError> {
        self.templates.reset()?;
        self.instances.reset()?;
        self.ids.reset();
        self.install_default_templates();
        Ok(())
    }

    fn install_default_templates(&self) {
        for template in default_templates() {
            let data = serde_json::to_value(&template).expect("Template always serializes");
            let _ = self.templates.put(vec![crate::collection::PutOp {
                aid: template.aid.clone(),
                data,
            }]);
        }
    }
}

/// The four built-in templates every fresh store starts with
/// (`_templateEmpty`, `_templateSphere`, `_templateBox`,
/// `_templatePlane`), matching the fixtures in the upstream Python
/// test suite's `azrael/config.py` and `test_clerk.py`.
pub fn default_templates() -> Vec<Template> {
    let mut empty = Template::new("_templateEmpty");
    empty.rbs = RigidBodyState::default();
    empty.fragments.insert(
        "frag_1".to_string(),
        FragmentMeta::new(azrael_types::FragmentType::Raw),
    );

    let mut sphere = Template::new("_templateSphere");
    sphere
        .rbs
        .cshapes
        .insert("csphere".to_string(), CollisionShape::unit_sphere());
    sphere.fragments.insert(
        "frag_1".to_string(),
        FragmentMeta::new(azrael_types::FragmentType::Raw),
    );

    let mut cube = Template::new("_templateBox");
    cube.rbs
        .cshapes
        .insert("cbox".to_string(), CollisionShape::unit_box());
    cube.fragments.insert(
        "frag_1".to_string(),
        FragmentMeta::new(azrael_types::FragmentType::Raw),
    );

    let mut plane = Template::new("_templatePlane");
    plane
        .rbs
        .cshapes
        .insert("cplane".to_string(), CollisionShape::ground_plane());
    plane.fragments.insert(
        "frag_1".to_string(),
        FragmentMeta::new(azrael_types::FragmentType::Raw),
    );

    vec![empty, sphere, cube, plane]
}

/// A placeholder RAW fragment body for `_templateSphere`/`_templateBox`,
/// kept separate from the document-store template record since
/// fragment *data* belongs to the asset store, never the document
/// store (spec.md §3).
pub fn default_fragment_payload() -> Fragment {
    Fragment::raw(azrael_types::FragmentData::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_has_four_default_templates() {
        let store = Store::new(StoreConfig::default());
        assert_eq!(store.templates.count().unwrap(), 4);
        assert!(store.templates.get_one("_templateEmpty", &None).unwrap().is_some());
        assert!(store.templates.get_one("_templateSphere", &None).unwrap().is_some());
        assert!(store.templates.get_one("_templateBox", &None).unwrap().is_some());
        assert!(store.templates.get_one("_templatePlane", &None).unwrap().is_some());
    }

    #[test]
    fn reset_reinstalls_default_templates_and_clears_instances() {
        let store = Store::new(StoreConfig::default());
        store
            .instances
            .put(vec![crate::collection::PutOp {
                aid: "1".into(),
                data: serde_json::json!({}),
            }])
            .unwrap();
        store.ids.allocate(5);

        store.reset().unwrap();

        assert_eq!(store.instances.count().unwrap(), 0);
        assert_eq!(store.templates.count().unwrap(), 4);
        assert_eq!(store.ids.allocate(1), (1, 1));
    }
}
