//! Clerk: the command dispatcher that wires the document store, the
//! constraint index, the asset store, and the physics command queue
//! together behind the single-command interface (spec.md §4.5).

mod clerk;
mod config;
mod error;
mod physics;

pub use clerk::Clerk;
pub use config::ClerkConfig;
pub use error::ClerkError;
pub use physics::{InMemoryPhysicsQueue, PhysicsCommand, PhysicsCommandSink};
