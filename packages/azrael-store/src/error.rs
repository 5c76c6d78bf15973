//! Document store error types.

use thiserror::Error;

/// Document store operation errors (spec.md §7).
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Referenced document does not exist.
    #[error("document '{aid}' not found in {collection}")]
    DocumentNotFound { collection: String, aid: String },

    /// `put` target already exists.
    #[error("document '{aid}' already exists in {collection}")]
    DocumentAlreadyExists { collection: String, aid: String },

    /// A `mod` precondition (`exists`) did not hold.
    #[error("precondition failed for document '{aid}' in {collection}")]
    PreconditionFailed { collection: String, aid: String },

    /// An `inc` mutation targeted a field that is not a number.
    #[error("field {path:?} of document '{aid}' is not numeric")]
    FieldNotNumeric { aid: String, path: Vec<String> },

    /// A field path component contained `'.'`.
    #[error("invalid field path component: {0:?}")]
    InvalidFieldPath(String),

    /// A request argument was out of range (e.g. a negative `allocate` count).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A bounded field (e.g. `custom`) exceeded its byte limit.
    #[error("payload of {actual} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge { actual: usize, limit: usize },

    /// An internal `RwLock` was poisoned by a panicking holder.
    #[error("document store lock poisoned")]
    LockPoisoned,

    /// A document failed to (de)serialize.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Persistence snapshot I/O failed.
    #[error("persistence I/O error: {0}")]
    IoError(String),
}
