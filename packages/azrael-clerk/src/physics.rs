//! The physics command queue (spec.md §6).
//!
//! Write-shared, single-consumer: Clerk only ever pushes. The
//! consuming stepping engine is out of scope for this repository, so
//! `InMemoryPhysicsQueue` is the only sink this crate ships — the
//! teacher's equivalent is `ProcedureRegistry` owning the dispatch
//! table while leaving the procedure bodies to callers.

use std::collections::VecDeque;
use std::sync::Mutex;

use azrael_types::{ObjectId, RigidBodyState, Vec3};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PhysicsCommand {
    SpawnBody {
        #[serde(rename = "objID")]
        obj_id: ObjectId,
        rbs: RigidBodyState,
    },
    RemoveBody {
        #[serde(rename = "objID")]
        obj_id: ObjectId,
    },
    SetBody {
        #[serde(rename = "objID")]
        obj_id: ObjectId,
        patch: Value,
    },
    SetForce {
        #[serde(rename = "objID")]
        obj_id: ObjectId,
        force: Vec3,
        #[serde(rename = "relPos")]
        rel_pos: Vec3,
    },
    DirectForceAndTorque {
        #[serde(rename = "objID")]
        obj_id: ObjectId,
        force: Vec3,
        torque: Vec3,
    },
}

/// Write-only handle to the physics command queue.
pub trait PhysicsCommandSink: Send + Sync {
    fn push(&self, command: PhysicsCommand);
}

/// The only `PhysicsCommandSink` this repository implements: an
/// in-process FIFO. Nothing in production code ever drains it; only
/// tests inspect what Clerk enqueued.
#[derive(Default)]
pub struct InMemoryPhysicsQueue {
    queue: Mutex<VecDeque<PhysicsCommand>>,
}

impl InMemoryPhysicsQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test-only accessor: returns every command pushed so far, in order.
    pub fn snapshot(&self) -> Vec<PhysicsCommand> {
        self.queue.lock().expect("queue lock poisoned").iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().expect("queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PhysicsCommandSink for InMemoryPhysicsQueue {
    fn push(&self, command: PhysicsCommand) {
        self.queue.lock().expect("queue lock poisoned").push_back(command);
    }
}
