//! Document models shared by the document store and the tag index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::path::DocumentPath;
use crate::tags::Tag;

/// A memory bank document as returned by a `DocumentStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique document identifier.
    pub id: String,
    /// Path relative to the scope root.
    pub path: DocumentPath,
    pub title: String,
    /// Free-form type label ("core", "progress", "generic", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub last_modified: DateTime<Utc>,
    /// Structured JSON content, or a string for Markdown documents.
    #[serde(default)]
    pub content: JsonValue,
}

impl Document {
    /// Build a document from caller-supplied raw tags.
    ///
    /// Invalid tags are rejected with `Error::InvalidTag`; duplicates are
    /// collapsed while keeping first-seen order.
    pub fn new<S: AsRef<str>>(
        id: impl Into<String>,
        path: DocumentPath,
        title: impl Into<String>,
        tags: &[S],
    ) -> Result<Self> {
        let mut parsed: Vec<Tag> = Vec::with_capacity(tags.len());
        for tag in Tag::parse_all(tags)? {
            if !parsed.contains(&tag) {
                parsed.push(tag);
            }
        }
        Ok(Self {
            id: id.into(),
            path,
            title: title.into(),
            document_type: None,
            tags: parsed,
            last_modified: Utc::now(),
            content: JsonValue::Null,
        })
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn with_content(mut self, content: JsonValue) -> Self {
        self.content = content;
        self
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Denormalized snapshot used inside index entries.
    pub fn reference(&self) -> DocumentReference {
        DocumentReference {
            id: self.id.clone(),
            path: self.path.clone(),
            title: self.title.clone(),
            last_modified: self.last_modified,
        }
    }
}

/// Lightweight identity of a document stored inside a tag index entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub id: String,
    pub path: DocumentPath,
    pub title: String,
    pub last_modified: DateTime<Utc>,
}
