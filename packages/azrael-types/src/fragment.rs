//! Fragment meta and data (spec.md §3, §4.5.1).
//!
//! A fragment's *meta* (type and pose) lives in the document store
//! alongside the owning template/instance's `rbs`; its *data* (the
//! actual renderable bytes) lives in the asset store under the
//! fragment's URL. Keeping them separate is what makes "pose-only
//! edits don't bump `rbs.version`" (spec.md I4) a one-line check: a
//! patch that never touches `FragmentData` never touches the asset
//! store either.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::math::{Quaternion, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragmentType {
    #[serde(rename = "RAW")]
    Raw,
    #[serde(rename = "DAE")]
    Dae,
    #[serde(rename = "NONE")]
    None,
}

/// Opaque file payload for one fragment: filename to raw bytes.
///
/// A `RAW` fragment carries a single `model.json`; a `DAE` fragment
/// carries its primary `.dae` file plus zero or more textures. Bytes
/// are base64-wrapped crossing the wire codec (spec.md §4.5.5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentData(pub BTreeMap<String, Vec<u8>>);

impl FragmentData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(name.into(), bytes);
        FragmentData(map)
    }
}

impl Serialize for FragmentData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, bytes) in &self.0 {
            map.serialize_entry(name, &BASE64.encode(bytes))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FragmentData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let encoded: BTreeMap<String, String> = BTreeMap::deserialize(deserializer)?;
        let mut decoded = BTreeMap::new();
        for (name, b64) in encoded {
            let bytes = BASE64
                .decode(b64.as_bytes())
                .map_err(serde::de::Error::custom)?;
            decoded.insert(name, bytes);
        }
        Ok(FragmentData(decoded))
    }
}

/// Pose and type of a fragment, as stored next to `rbs` in a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FragmentMeta {
    pub fragtype: FragmentType,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quaternion,
}

fn default_scale() -> f64 {
    1.0
}

impl FragmentMeta {
    pub fn new(fragtype: FragmentType) -> Self {
        FragmentMeta {
            fragtype,
            scale: 1.0,
            position: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
        }
    }
}

/// A full fragment as supplied in `add_templates`/full-replacement
/// `set_fragments` requests: meta plus its data payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(flatten)]
    pub meta: FragmentMeta,
    #[serde(default)]
    pub fragdata: FragmentData,
}

impl Fragment {
    pub fn raw(data: FragmentData) -> Self {
        Fragment {
            meta: FragmentMeta::new(FragmentType::Raw),
            fragdata: data,
        }
    }
}
