//! Booster and factory part definitions (spec.md §3, §4.5.2).

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// A part that applies a clamped force along a local direction when commanded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Booster {
    pub pos: Vec3,
    pub direction: Vec3,
    pub minval: f64,
    pub maxval: f64,
    #[serde(default)]
    pub force: f64,
}

/// The inclusive range a factory's commanded exit speed is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitSpeedRange {
    pub min: f64,
    pub max: f64,
}

/// A part that spawns a new instance of `template_id` when commanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    pub pos: Vec3,
    pub direction: Vec3,
    #[serde(rename = "templateID")]
    pub template_id: String,
    pub exit_speed: ExitSpeedRange,
}
