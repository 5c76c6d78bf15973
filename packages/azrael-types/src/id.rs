//! Object ID newtype.
//!
//! `objID` values are allocated once by the ID allocator (spec.md
//! §4.1) and never reused. They travel on the wire both as plain JSON
//! numbers and as string keys of JSON objects (e.g. `{objID: rbs}`
//! payloads) — `Display`/`FromStr` make the latter recoverable as an
//! integer, per spec.md §4.5.5.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub fn new(id: u64) -> Self {
        ObjectId(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(ObjectId)
    }
}

impl From<u64> for ObjectId {
    fn from(id: u64) -> Self {
        ObjectId(id)
    }
}
