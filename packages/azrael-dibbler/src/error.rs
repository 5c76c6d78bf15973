//! Asset store error types.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DibblerError {
    #[error("'{path}' not found")]
    NotFound { path: String },

    #[error("'{path}' already exists")]
    AlreadyExists { path: String },

    #[error("asset store lock poisoned")]
    LockPoisoned,
}
