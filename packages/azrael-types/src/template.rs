//! Templates and instances (spec.md §3).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fragment::FragmentMeta;
use crate::id::ObjectId;
use crate::parts::{Booster, Factory};
use crate::rigid_body::RigidBodyState;

/// An immutable blueprint a rigid body is spawned from.
///
/// `fragments` holds *meta only* — type and pose. Fragment data lives
/// in the asset store (spec.md §4.4) and is never duplicated into the
/// document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub aid: String,
    #[serde(default)]
    pub rbs: RigidBodyState,
    #[serde(default)]
    pub fragments: BTreeMap<String, FragmentMeta>,
    #[serde(default)]
    pub boosters: BTreeMap<String, Booster>,
    #[serde(default)]
    pub factories: BTreeMap<String, Factory>,
}

impl Template {
    pub fn new(aid: impl Into<String>) -> Self {
        Template {
            aid: aid.into(),
            rbs: RigidBodyState::default(),
            fragments: BTreeMap::new(),
            boosters: BTreeMap::new(),
            factories: BTreeMap::new(),
        }
    }

    /// A template name must not contain `/` or `.` (spec.md §3): both
    /// are reserved by the asset store's URL namespace.
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && !name.contains('/') && !name.contains('.')
    }
}

/// A live body in the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(rename = "objID")]
    pub obj_id: ObjectId,
    #[serde(rename = "templateID")]
    pub template_id: String,
    pub rbs: RigidBodyState,
    #[serde(default)]
    pub fragments: BTreeMap<String, FragmentMeta>,
    #[serde(default)]
    pub custom: String,
}

impl Instance {
    /// Spawns an instance from `template`, applying `rbs_patch` as a
    /// shallow merge onto a clone of the template `rbs` (spec.md §3:
    /// "initialised by deep-copying the template rbs with
    /// client-supplied overrides"). Only the keys present in the
    /// patch are overridden; every other field — `cshapes`,
    /// `axesLockLin`/`axesLockRot`, etc. — is inherited from the
    /// template untouched.
    pub fn spawn(
        obj_id: ObjectId,
        template: &Template,
        rbs_patch: Option<serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        let mut rbs = match rbs_patch {
            Some(patch) => merge_rbs_patch(&template.rbs, &patch)?,
            None => template.rbs.clone(),
        };
        rbs.version = 0;
        Ok(Instance {
            obj_id,
            template_id: template.aid.clone(),
            rbs,
            fragments: template.fragments.clone(),
            custom: String::new(),
        })
    }
}

/// Merges `patch`'s top-level keys onto a JSON rendering of `base`,
/// then decodes the result back into a `RigidBodyState`. A patch key
/// absent from `base`'s own field set is passed straight through to
/// the decode step, which rejects it the same way any other unknown
/// field would.
fn merge_rbs_patch(base: &RigidBodyState, patch: &serde_json::Value) -> Result<RigidBodyState, serde_json::Error> {
    let mut value = serde_json::to_value(base)?;
    if let (Some(target), Some(overrides)) = (value.as_object_mut(), patch.as_object()) {
        for (key, v) in overrides {
            target.insert(key.clone(), v.clone());
        }
    }
    serde_json::from_value(value)
}
