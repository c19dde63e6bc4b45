//! # membank-index
//!
//! Tag index for the memory bank.
//!
//! This crate provides:
//! - `TagIndex`, the canonical per-scope mapping of tag to document references
//! - Reading v1 (map) and v2 (array) index files, writing v2
//! - `IndexCache`, a TTL cache with write-through and invalidation
//! - Full rebuilds from a `DocumentStore` and incremental add/remove
//! - AND/OR tag queries
//! - `TagIndexService`, which ties these together with per-scope locking
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use membank_index::{IndexScope, MemoryBankConfig, Tag, TagIndexService};
//! use membank_store::{FileDocumentStore, LocalFileSystem};
//!
//! let config = MemoryBankConfig::with_root("docs");
//! let fs = Arc::new(LocalFileSystem::new());
//! let documents = Arc::new(FileDocumentStore::new(fs.clone(), config.clone()));
//! let service = TagIndexService::new(fs, documents, config);
//!
//! let tags = Tag::parse_all(["architecture", "decision"])?;
//! let paths = service
//!     .find_documents_by_tags(&IndexScope::Global, &tags, true)
//!     .await?;
//! ```

pub mod builder;
pub mod cache;
pub mod format;
pub mod locks;
pub mod model;
pub mod query;
pub mod service;
pub mod store;
pub mod updater;

// Re-export core types
pub use membank_core::*;

pub use builder::{index_from_documents, IndexBuilder, RebuildReport};
pub use cache::{CacheStats, IndexCache};
pub use format::WireFormat;
pub use locks::ScopeLocks;
pub use model::{IndexMetadata, TagIndex, TagIndexEntry};
pub use query::{find_paths, TagMatch};
pub use service::{TagIndexService, TagSummary, UpdateIndexOptions, UpdateIndexResult, UpdateInfo};
pub use store::TagIndexStore;
pub use updater::{apply_document, remove_path, DocumentIdentity, IncrementalUpdater, RemoveOutcome};
