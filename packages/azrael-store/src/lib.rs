//! The document store backing `Templates` and `Instances`.
//!
//! Provides a JSON document collection with field-path mutation, an
//! ID allocator, and a snapshot persistence layer.

pub mod collection;
pub mod config;
pub mod error;
pub mod id_allocator;
pub mod path;
pub mod persistence;
pub mod store;

pub use collection::{Collection, ModOp, Projection, PutOp};
pub use config::StoreConfig;
pub use error::StoreError;
pub use id_allocator::IdAllocator;
pub use path::FieldPath;
pub use store::{default_templates, Store};
