//! Live and default rigid-body state (spec.md §3, `rbs`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{Quaternion, Vec3};
use crate::shape::CollisionShape;

/// Per-axis lock flags, e.g. to pin an object's rotation to a plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisLock {
    #[serde(default)]
    pub x: bool,
    #[serde(default)]
    pub y: bool,
    #[serde(default)]
    pub z: bool,
}

/// Rigid body defaults (on a `Template`) or live state (on an `Instance`).
///
/// `version` is the only client-visible handshake for fragment-data
/// cache invalidation (spec.md §9): it must be strictly monotone and
/// bumped only when fragment *data* changes, never on a pose-only
/// edit (spec.md I4/P5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyState {
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub imass: f64,
    #[serde(default)]
    pub restitution: f64,
    #[serde(default)]
    pub rotation: Quaternion,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default, rename = "velocityLin")]
    pub velocity_lin: Vec3,
    #[serde(default, rename = "velocityRot")]
    pub velocity_rot: Vec3,
    #[serde(default)]
    pub cshapes: BTreeMap<String, CollisionShape>,
    #[serde(default, rename = "axesLockLin")]
    pub axes_lock_lin: AxisLock,
    #[serde(default, rename = "axesLockRot")]
    pub axes_lock_rot: AxisLock,
    #[serde(default)]
    pub version: u64,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for RigidBodyState {
    fn default() -> Self {
        RigidBodyState {
            scale: 1.0,
            imass: 1.0,
            restitution: 0.9,
            rotation: Quaternion::IDENTITY,
            position: Vec3::ZERO,
            velocity_lin: Vec3::ZERO,
            velocity_rot: Vec3::ZERO,
            cshapes: BTreeMap::new(),
            axes_lock_lin: AxisLock::default(),
            axes_lock_rot: AxisLock::default(),
            version: 0,
        }
    }
}
