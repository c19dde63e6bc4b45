//! # membank-store
//!
//! Filesystem layer for the memory bank.
//!
//! This crate provides:
//! - `LocalFileSystem`, a `FileSystem` implementation with atomic writes
//! - `FileDocumentStore`, a `DocumentStore` over the branch/global
//!   directory tree holding JSON and Markdown documents
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use membank_core::{IndexScope, MemoryBankConfig};
//! use membank_store::{FileDocumentStore, LocalFileSystem};
//!
//! let config = MemoryBankConfig::with_root("docs");
//! let store = FileDocumentStore::new(Arc::new(LocalFileSystem::new()), config);
//! let paths = store.list_documents(&IndexScope::Global).await?;
//! ```

pub mod documents;
pub mod fs;
pub mod markdown;

pub use documents::FileDocumentStore;
pub use fs::LocalFileSystem;

// Re-export core types
pub use membank_core::*;
