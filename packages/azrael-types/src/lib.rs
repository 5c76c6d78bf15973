//! Data model shared by every component of the Azrael world-state service.
//!
//! Types in this crate cross the wire unchanged: they are the `rbs`,
//! `fragments`, `cshapes`, `boosters`, and `factories` of templates and
//! instances, plus the constraint records Igor indexes.

pub mod constraint;
pub mod fragment;
pub mod id;
pub mod math;
pub mod parts;
pub mod rigid_body;
pub mod shape;
pub mod template;

pub use constraint::{ConstraintMeta, ConstraintType};
pub use fragment::{Fragment, FragmentData, FragmentMeta, FragmentType};
pub use id::ObjectId;
pub use math::{Quaternion, Vec3};
pub use parts::{Booster, ExitSpeedRange, Factory};
pub use rigid_body::RigidBodyState;
pub use shape::{CollisionShape, CollisionShapeType};
pub use template::{Instance, Template};
