//! Clerk error taxonomy (spec.md §7).

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ClerkError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Store(#[from] azrael_store::StoreError),

    #[error("{0}")]
    Igor(#[from] azrael_igor::IgorError),

    #[error("{0}")]
    Dibbler(#[from] azrael_dibbler::DibblerError),
}

impl ClerkError {
    /// Maps a collaborator/validation error to the wire response,
    /// mirroring the teacher's `map_db_error_to_router_error`: each
    /// variant decides its own human-readable message, and no variant
    /// implies a state change already happened.
    pub fn to_response(&self) -> azrael_protocol::Response {
        azrael_protocol::Response::err(self.to_string())
    }
}
