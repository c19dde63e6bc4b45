//! Single-document index maintenance.
//!
//! Updates diff a document's current tags against whatever the index holds
//! for its path, so replaying the same document converges on the same
//! index. No previous tag list is stored.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use membank_core::{Document, DocumentPath, IndexScope, Result, Tag};
use tracing::{debug, info};

use crate::builder::IndexBuilder;
use crate::cache::IndexCache;
use crate::model::{TagIndex, TagIndexEntry};

/// How a caller names the document to drop from an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentIdentity {
    Id(String),
    Path(DocumentPath),
}

impl DocumentIdentity {
    /// Path this identity refers to in `index`, if indexed at all.
    pub fn resolve<'a>(&'a self, index: &'a TagIndex) -> Option<&'a DocumentPath> {
        match self {
            Self::Id(id) => index.resolve_id(id),
            Self::Path(path) => index.contains_path(path).then_some(path),
        }
    }
}

impl From<&Document> for DocumentIdentity {
    fn from(document: &Document) -> Self {
        Self::Path(document.path.clone())
    }
}

impl From<DocumentPath> for DocumentIdentity {
    fn from(path: DocumentPath) -> Self {
        Self::Path(path)
    }
}

impl std::fmt::Display for DocumentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id:{}", id),
            Self::Path(path) => write!(f, "path:{}", path),
        }
    }
}

/// Result of a removal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(DocumentPath),
    NotIndexed,
}

/// `index` with `document`'s references brought in line with its tags.
pub fn apply_document(index: &TagIndex, document: &Document) -> TagIndex {
    let (metadata, entries) = index.clone().into_parts();
    let mut by_tag: BTreeMap<Tag, TagIndexEntry> =
        entries.into_iter().map(|e| (e.tag.clone(), e)).collect();

    for (tag, entry) in by_tag.iter_mut() {
        if !document.has_tag(tag) {
            entry.remove_path(&document.path);
        }
    }
    for tag in &document.tags {
        by_tag
            .entry(tag.clone())
            .or_insert_with(|| TagIndexEntry::new(tag.clone()))
            .upsert(document.reference());
    }

    TagIndex::from_parts(metadata, by_tag.into_values().collect())
}

/// `index` without any reference to `path`, or `None` if it has none.
pub fn remove_path(index: &TagIndex, path: &DocumentPath) -> Option<TagIndex> {
    if !index.contains_path(path) {
        return None;
    }
    let (metadata, mut entries) = index.clone().into_parts();
    for entry in entries.iter_mut() {
        entry.remove_path(path);
    }
    Some(TagIndex::from_parts(metadata, entries))
}

/// Applies add/update/remove of one document and writes the result through
/// the cache. Callers serialize calls per scope.
pub struct IncrementalUpdater {
    cache: Arc<IndexCache>,
    builder: Arc<IndexBuilder>,
}

impl IncrementalUpdater {
    pub fn new(cache: Arc<IndexCache>, builder: Arc<IndexBuilder>) -> Self {
        Self { cache, builder }
    }

    /// Reflect `document`'s current tags in the scope's index.
    ///
    /// When no usable index exists, the scope is rebuilt from the document
    /// store with `document` applied on top. Nothing is written when the
    /// index already matches the document.
    pub async fn add_or_update_document(
        &self,
        scope: &IndexScope,
        document: &Document,
    ) -> Result<Arc<TagIndex>> {
        let current = self.cache.get(scope).await?;

        let next = match current {
            None => {
                info!(
                    subsystem = "index",
                    component = "updater",
                    scope = %scope,
                    path = %document.path,
                    "No usable index for scope, rebuilding"
                );
                let (built, scanned, skipped) = self.builder.build(scope).await?;
                debug!(
                    subsystem = "index",
                    component = "updater",
                    scope = %scope,
                    scanned,
                    skipped_count = skipped,
                    "Seeded index from document store"
                );
                apply_document(&built, document)
            }
            Some(current) => {
                let mut next = apply_document(&current, document);
                if next.same_content(&current) {
                    debug!(
                        subsystem = "index",
                        component = "updater",
                        op = "add_or_update",
                        scope = %scope,
                        path = %document.path,
                        "Index already up to date"
                    );
                    return Ok(current);
                }
                next.touch(Utc::now());
                next
            }
        };

        let index = self.cache.write_through(scope, next).await?;
        debug!(
            subsystem = "index",
            component = "updater",
            op = "add_or_update",
            scope = %scope,
            path = %document.path,
            document_id = %document.id,
            tag_count = index.metadata().tag_count,
            "Index updated"
        );
        Ok(index)
    }

    /// Drop every reference to the identified document.
    ///
    /// An identity that is not in the index is a no-op and nothing is
    /// written.
    pub async fn remove_document(
        &self,
        scope: &IndexScope,
        identity: &DocumentIdentity,
    ) -> Result<RemoveOutcome> {
        let Some(current) = self.cache.get(scope).await? else {
            debug!(subsystem = "index", component = "updater", scope = %scope, identity = %identity, "No index, nothing to remove");
            return Ok(RemoveOutcome::NotIndexed);
        };

        let Some(path) = identity.resolve(&current).cloned() else {
            debug!(subsystem = "index", component = "updater", scope = %scope, identity = %identity, "Document not indexed, nothing to remove");
            return Ok(RemoveOutcome::NotIndexed);
        };

        let Some(mut next) = remove_path(&current, &path) else {
            return Ok(RemoveOutcome::NotIndexed);
        };
        next.touch(Utc::now());
        self.cache.write_through(scope, next).await?;

        debug!(
            subsystem = "index",
            component = "updater",
            op = "remove",
            scope = %scope,
            path = %path,
            "Document removed from index"
        );
        Ok(RemoveOutcome::Removed(path))
    }
}
