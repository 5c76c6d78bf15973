//! Vector and quaternion primitives.
//!
//! No example in the retrieval pack pulls in a vector-math crate, so
//! these are hand-rolled: plain `f64` fields, the handful of operations
//! the rest of the crate needs, nothing more.

use serde::{Deserialize, Serialize};

/// A position, velocity, or direction in 3-space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, s: f64) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Returns the unit vector, or `Vec3::ZERO` if `self` is (near) zero.
    pub fn normalize(self) -> Vec3 {
        let len = self.length();
        if len < 1e-12 {
            Vec3::ZERO
        } else {
            self.scale(1.0 / len)
        }
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Vec3::ZERO
    }
}

/// A body or fragment orientation. Scalar-last on the wire,
/// `[x, y, z, w]`: e.g. a 180-degree rotation about X is `[1, 0, 0,
/// 0]`, identity is `[0, 0, 0, 1]`, matching the source fixtures this
/// service's wire protocol was distilled from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Serialize for Quaternion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        [self.x, self.y, self.z, self.w].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Quaternion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let [x, y, z, w] = <[f64; 4]>::deserialize(deserializer)?;
        Ok(Quaternion::new(w, x, y, z))
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn normalize(self) -> Quaternion {
        let len = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if len < 1e-12 {
            Quaternion::IDENTITY
        } else {
            Quaternion::new(self.w / len, self.x / len, self.y / len, self.z / len)
        }
    }

    /// Hamilton product `self * other`.
    pub fn mul(self, other: Quaternion) -> Quaternion {
        Quaternion::new(
            self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        )
    }

    /// Rotates `v` by this (unit) quaternion.
    pub fn rotate_vec3(self, v: Vec3) -> Vec3 {
        let q = self;
        let qv = Quaternion::new(0.0, v.x, v.y, v.z);
        let conj = Quaternion::new(q.w, -q.x, -q.y, -q.z);
        let rotated = q.mul(qv).mul(conj);
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_product_of_orthogonal_axes() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn normalize_of_zero_vector_is_zero() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
    }

    #[test]
    fn identity_quaternion_does_not_rotate() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(Quaternion::IDENTITY.rotate_vec3(v), v);
    }

    #[test]
    fn half_turn_about_x_flips_yz() {
        // 180 degrees about the X axis: w=0, x=1, y=0, z=0
        let q = Quaternion::new(0.0, 1.0, 0.0, 0.0);
        let v = Vec3::new(0.0, 0.0, 3.0);
        let rotated = q.rotate_vec3(v);
        assert!((rotated.x).abs() < 1e-9);
        assert!((rotated.y).abs() < 1e-9);
        assert!((rotated.z + 3.0).abs() < 1e-9);
    }

    #[test]
    fn wire_array_is_scalar_last() {
        let q = Quaternion::new(0.0, 1.0, 0.0, 0.0);
        assert_eq!(serde_json::to_value(q).unwrap(), serde_json::json!([1.0, 0.0, 0.0, 0.0]));

        let identity: Quaternion = serde_json::from_value(serde_json::json!([0.0, 0.0, 0.0, 1.0])).unwrap();
        assert_eq!(identity, Quaternion::IDENTITY);

        let half_turn_x: Quaternion = serde_json::from_value(serde_json::json!([1.0, 0.0, 0.0, 0.0])).unwrap();
        assert_eq!(half_turn_x, q);
    }
}
