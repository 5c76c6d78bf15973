//! Constraint index error types.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum IgorError {
    /// The internal index lock was poisoned by a panicking holder.
    #[error("constraint index lock poisoned")]
    LockPoisoned,
}
