//! File-backed document store.
//!
//! Documents live below a scope directory (`<branch_root>/<safe_name>/` or
//! `<global_root>/`) as either structured JSON (`memory_document_v2`) or
//! Markdown. Index files and in-flight temporary files are never listed.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use membank_core::defaults::{DOCUMENT_SCHEMA_V2, TEMP_FILE_SUFFIX};
use membank_core::{
    Document, DocumentPath, DocumentStore, Error, FileSystem, IndexLayout, IndexScope,
    MemoryBankConfig, Result, Tag,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::markdown;

/// On-disk shape of a structured JSON document.
#[derive(Debug, Serialize, Deserialize)]
struct JsonDocumentFile {
    schema: String,
    metadata: JsonDocumentMetadata,
    #[serde(default)]
    content: JsonValue,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocumentMetadata {
    id: String,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<u64>,
}

/// `DocumentStore` over the memory bank directory tree.
pub struct FileDocumentStore {
    fs: Arc<dyn FileSystem>,
    config: MemoryBankConfig,
}

impl FileDocumentStore {
    pub fn new(fs: Arc<dyn FileSystem>, config: MemoryBankConfig) -> Self {
        Self { fs, config }
    }

    pub fn config(&self) -> &MemoryBankConfig {
        &self.config
    }

    fn full_path(&self, scope: &IndexScope, path: &DocumentPath) -> PathBuf {
        path.to_fs_path(&self.config.scope_dir(scope))
    }

    /// Write a document to disk in the format implied by its extension.
    pub async fn save_document(&self, scope: &IndexScope, document: &Document) -> Result<()> {
        let target = self.full_path(scope, &document.path);
        let serialized = if document.path.is_markdown() {
            let body = document.content.as_str().unwrap_or_default();
            markdown::render(&document.title, &document.tags, body)
        } else if document.path.is_json() {
            let file = JsonDocumentFile {
                schema: DOCUMENT_SCHEMA_V2.to_string(),
                metadata: JsonDocumentMetadata {
                    id: document.id.clone(),
                    title: document.title.clone(),
                    document_type: document.document_type.clone(),
                    path: Some(document.path.to_string()),
                    tags: document.tags.iter().map(Tag::to_string).collect(),
                    last_modified: Some(document.last_modified),
                    created_at: None,
                    version: None,
                },
                content: document.content.clone(),
            };
            serde_json::to_string_pretty(&file)?
        } else {
            return Err(Error::InvalidInput(format!(
                "unsupported document type: {}",
                document.path
            )));
        };

        debug!(
            subsystem = "store",
            component = "document_store",
            op = "save",
            scope = %scope,
            path = %document.path,
            "Saving document"
        );
        self.fs.write_file(&target, &serialized).await
    }

    /// Delete a document. Returns whether a file was removed.
    pub async fn delete_document(&self, scope: &IndexScope, path: &DocumentPath) -> Result<bool> {
        let target = self.full_path(scope, path);
        if !self.fs.file_exists(&target).await? {
            return Ok(false);
        }
        self.fs.remove_file(&target).await?;
        debug!(
            subsystem = "store",
            component = "document_store",
            op = "delete",
            scope = %scope,
            path = %path,
            "Deleted document"
        );
        Ok(true)
    }

    /// Build a fresh JSON document with a generated id.
    pub fn new_json_document<S: AsRef<str>>(
        path: DocumentPath,
        title: &str,
        tags: &[S],
        content: JsonValue,
    ) -> Result<Document> {
        Ok(Document::new(Uuid::now_v7().to_string(), path, title, tags)?.with_content(content))
    }

    fn parse_json(&self, path: &DocumentPath, raw: &str, mtime: Option<DateTime<Utc>>) -> Result<Document> {
        let file: JsonDocumentFile = serde_json::from_str(raw).map_err(|e| Error::InvalidDocument {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        if file.schema != DOCUMENT_SCHEMA_V2 {
            debug!(path = %path, schema = %file.schema, "Reading document with non-default schema");
        }
        if let Some(declared) = file.metadata.path.as_deref() {
            if declared != path.as_str() {
                debug!(path = %path, declared = %declared, "Document metadata path differs from location");
            }
        }

        let last_modified = file
            .metadata
            .last_modified
            .or(mtime)
            .ok_or_else(|| Error::InvalidDocument {
                path: path.to_string(),
                reason: "missing lastModified".to_string(),
            })?;

        Ok(Document {
            id: file.metadata.id,
            path: path.clone(),
            title: file.metadata.title,
            document_type: file.metadata.document_type,
            tags: sanitize_tags(path, &file.metadata.tags),
            last_modified,
            content: file.content,
        })
    }

    fn parse_markdown(&self, path: &DocumentPath, raw: &str, mtime: Option<DateTime<Utc>>) -> Document {
        Document {
            id: path.to_string(),
            path: path.clone(),
            title: markdown::extract_title(raw).unwrap_or_else(|| path.file_stem().to_string()),
            document_type: Some("markdown".to_string()),
            tags: markdown::extract_tags(raw),
            last_modified: mtime.unwrap_or_else(Utc::now),
            content: JsonValue::String(markdown::body(raw)),
        }
    }
}

/// Sanitize tags read from disk, dropping values that cannot be salvaged.
fn sanitize_tags(path: &DocumentPath, raw: &[String]) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::with_capacity(raw.len());
    for value in raw {
        match Tag::sanitize(value) {
            Some(tag) => {
                if tag.as_str() != value {
                    warn!(path = %path, raw = %value, sanitized = %tag, "Sanitized invalid tag in document");
                }
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            None => warn!(path = %path, raw = %value, "Dropped unusable tag in document"),
        }
    }
    tags
}

fn is_document_file(relative: &std::path::Path) -> bool {
    let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || name.ends_with(TEMP_FILE_SUFFIX) {
        return false;
    }
    if IndexLayout::is_index_file_name(name) {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".json") || lower.ends_with(".md")
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn list_documents(&self, scope: &IndexScope) -> Result<Vec<DocumentPath>> {
        let dir = self.config.scope_dir(scope);
        let files = self.fs.list_files(&dir).await?;

        let mut paths = Vec::with_capacity(files.len());
        for relative in files.iter().filter(|f| is_document_file(f)) {
            match DocumentPath::from_relative(relative) {
                Ok(path) => paths.push(path),
                Err(e) => warn!(file = %relative.display(), error = %e, "Skipping unlistable document"),
            }
        }
        paths.sort();
        trace!(scope = %scope, document_count = paths.len(), "Listed documents");
        Ok(paths)
    }

    async fn get_document(
        &self,
        scope: &IndexScope,
        path: &DocumentPath,
    ) -> Result<Option<Document>> {
        let target = self.full_path(scope, path);
        if !self.fs.file_exists(&target).await? {
            return Ok(None);
        }
        let raw = self.fs.read_file(&target).await?;
        let mtime = self.fs.modified(&target).await?;

        if path.is_json() {
            self.parse_json(path, &raw, mtime).map(Some)
        } else if path.is_markdown() {
            Ok(Some(self.parse_markdown(path, &raw, mtime)))
        } else {
            Err(Error::InvalidDocument {
                path: path.to_string(),
                reason: "unsupported file extension".to_string(),
            })
        }
    }
}
