//! # membank-core
//!
//! Core types, traits, and abstractions for the memory bank.
//!
//! This crate provides the value objects (tags, document paths, branch
//! scopes), the document model, and the collaborator traits that the
//! storage and tag index crates build on.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod path;
pub mod scope;
pub mod tags;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{IndexLayout, MemoryBankConfig};
pub use error::{Error, Result};
pub use models::*;
pub use path::DocumentPath;
pub use scope::{BranchName, IndexScope, IndexType};
pub use tags::Tag;
pub use traits::*;
