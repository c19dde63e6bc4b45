//! Collaborator traits consumed by the tag index.
//!
//! These define the seams between the index and whatever owns documents
//! and bytes on disk, so both can be swapped for in-memory versions in
//! tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Document;
use crate::path::DocumentPath;
use crate::scope::IndexScope;

/// Authoritative owner of memory bank documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every document path in a scope. A missing scope yields an
    /// empty list.
    async fn list_documents(&self, scope: &IndexScope) -> Result<Vec<DocumentPath>>;

    /// Load one document, `Ok(None)` if it does not exist.
    async fn get_document(&self, scope: &IndexScope, path: &DocumentPath)
        -> Result<Option<Document>>;
}

/// Minimal filesystem surface used by the index and document stores.
///
/// Implementations report I/O failures as `Error::Persistence`.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Check whether a file exists.
    async fn file_exists(&self, path: &Path) -> Result<bool>;

    /// Read a whole file as UTF-8.
    async fn read_file(&self, path: &Path) -> Result<String>;

    /// Replace a file's content so readers never observe a partial write.
    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    /// Create a directory and its parents; succeeds if it already exists.
    async fn create_directory(&self, path: &Path) -> Result<()>;

    /// Recursively list regular files below `dir`, relative to `dir`.
    /// A missing directory yields an empty list.
    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Delete a file; succeeds if it is already gone.
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Last modification time, `Ok(None)` if the file does not exist.
    async fn modified(&self, path: &Path) -> Result<Option<DateTime<Utc>>>;
}
