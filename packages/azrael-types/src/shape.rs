//! Collision shape descriptors (spec.md §3, `cshapes`).

use serde::{Deserialize, Serialize};

use crate::math::{Quaternion, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionShapeType {
    Empty,
    Sphere,
    Box,
    Plane,
}

/// A named collision primitive attached to a template or instance.
///
/// `csdata` is kind-specific: one radius for `Sphere`, three half-extents
/// for `Box`, a `[nx, ny, nz, offset]` plane equation for `Plane`, empty
/// for `Empty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionShape {
    pub cstype: CollisionShapeType,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quaternion,
    #[serde(default)]
    pub csdata: Vec<f64>,
}

impl CollisionShape {
    pub fn empty() -> Self {
        CollisionShape {
            cstype: CollisionShapeType::Empty,
            position: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
            csdata: Vec::new(),
        }
    }

    pub fn unit_sphere() -> Self {
        CollisionShape {
            cstype: CollisionShapeType::Sphere,
            position: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
            csdata: vec![1.0],
        }
    }

    pub fn unit_box() -> Self {
        CollisionShape {
            cstype: CollisionShapeType::Box,
            position: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
            csdata: vec![1.0, 1.0, 1.0],
        }
    }

    pub fn ground_plane() -> Self {
        CollisionShape {
            cstype: CollisionShapeType::Plane,
            position: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
            csdata: vec![0.0, 0.0, 1.0, 0.0],
        }
    }
}
