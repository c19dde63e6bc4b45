//! Full index rebuild from the document store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use membank_core::{Document, DocumentStore, IndexScope, Result, Tag};
use tracing::{debug, info, trace, warn};

use crate::cache::IndexCache;
use crate::model::{IndexMetadata, TagIndex, TagIndexEntry};

/// Outcome of a full rebuild.
#[derive(Debug, Clone)]
pub struct RebuildReport {
    pub index: Arc<TagIndex>,
    /// Paths listed by the document store.
    pub scanned: usize,
    /// Documents loaded and indexed.
    pub loaded: usize,
    /// Documents that failed to load or were missing.
    pub skipped: usize,
    pub duration: Duration,
}

/// Build an index for `scope` from already loaded documents.
pub fn index_from_documents<'a, I>(scope: &IndexScope, documents: I) -> TagIndex
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut entries: BTreeMap<Tag, TagIndexEntry> = BTreeMap::new();
    for document in documents {
        for tag in &document.tags {
            entries
                .entry(tag.clone())
                .or_insert_with(|| TagIndexEntry::new(tag.clone()))
                .upsert(document.reference());
        }
    }
    TagIndex::from_parts(
        IndexMetadata::for_scope(scope, Utc::now()),
        entries.into_values().collect(),
    )
}

/// Rebuilds a scope's index by loading every document in it.
pub struct IndexBuilder {
    documents: Arc<dyn DocumentStore>,
    cache: Arc<IndexCache>,
}

impl IndexBuilder {
    pub fn new(documents: Arc<dyn DocumentStore>, cache: Arc<IndexCache>) -> Self {
        Self { documents, cache }
    }

    /// Load every document in `scope` and build a fresh index, without
    /// persisting it. Returns `(index, scanned, skipped)`.
    ///
    /// Documents that fail to load are logged and skipped; only a failure
    /// to list the scope aborts the build.
    pub async fn build(&self, scope: &IndexScope) -> Result<(TagIndex, usize, usize)> {
        let paths = self.documents.list_documents(scope).await?;
        let mut loaded: Vec<Document> = Vec::with_capacity(paths.len());
        let mut skipped = 0usize;

        for path in &paths {
            match self.documents.get_document(scope, path).await {
                Ok(Some(document)) => {
                    trace!(scope = %scope, path = %path, tags = document.tags.len(), "Indexed document");
                    loaded.push(document);
                }
                Ok(None) => {
                    debug!(scope = %scope, path = %path, "Document vanished during rebuild, skipping");
                    skipped += 1;
                }
                Err(e) => {
                    warn!(
                        subsystem = "index",
                        component = "builder",
                        scope = %scope,
                        path = %path,
                        error = %e,
                        "Failed to load document, skipping"
                    );
                    skipped += 1;
                }
            }
        }

        Ok((index_from_documents(scope, &loaded), paths.len(), skipped))
    }

    /// Build and write through, replacing any previous index for `scope`.
    pub async fn rebuild(&self, scope: &IndexScope) -> Result<RebuildReport> {
        let start = Instant::now();
        let (index, scanned, skipped) = self.build(scope).await?;
        let index = self.cache.write_through(scope, index).await?;
        let duration = start.elapsed();
        let loaded = scanned - skipped;

        info!(
            subsystem = "index",
            component = "builder",
            op = "rebuild",
            scope = %scope,
            document_count = loaded,
            tag_count = index.metadata().tag_count,
            skipped_count = skipped,
            duration_ms = duration.as_millis() as u64,
            "Index rebuilt"
        );

        Ok(RebuildReport {
            index,
            scanned,
            loaded,
            skipped,
            duration,
        })
    }
}
