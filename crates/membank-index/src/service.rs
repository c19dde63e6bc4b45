//! Tag index facade used by search and document write paths.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use membank_core::{
    Document, DocumentPath, DocumentStore, FileSystem, IndexScope, IndexType, MemoryBankConfig,
    Result, Tag,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::builder::{IndexBuilder, RebuildReport};
use crate::cache::{CacheStats, IndexCache};
use crate::locks::ScopeLocks;
use crate::model::TagIndex;
use crate::query::{find_paths, TagMatch};
use crate::store::TagIndexStore;
use crate::updater::{DocumentIdentity, IncrementalUpdater, RemoveOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateIndexOptions {
    pub full_rebuild: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    /// Whether a full rebuild was requested.
    pub full_rebuild: bool,
    /// Whether the index was actually rebuilt.
    pub rebuilt: bool,
    pub index_type: IndexType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub skipped_documents: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIndexResult {
    pub document_count: usize,
    pub tags: Vec<Tag>,
    pub update_info: UpdateInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    pub tag: Tag,
    pub document_count: usize,
}

/// Store, cache, builder and updater for every scope of one memory bank.
///
/// Index mutations are serialized per scope; queries never take the lock
/// unless they have to build a missing index.
pub struct TagIndexService {
    documents: Arc<dyn DocumentStore>,
    cache: Arc<IndexCache>,
    builder: Arc<IndexBuilder>,
    updater: IncrementalUpdater,
    locks: ScopeLocks,
}

impl TagIndexService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        documents: Arc<dyn DocumentStore>,
        config: MemoryBankConfig,
    ) -> Self {
        let store = Arc::new(TagIndexStore::new(fs, config));
        let cache = Arc::new(IndexCache::new(store));
        let builder = Arc::new(IndexBuilder::new(Arc::clone(&documents), Arc::clone(&cache)));
        Self {
            updater: IncrementalUpdater::new(Arc::clone(&cache), Arc::clone(&builder)),
            builder,
            documents,
            cache,
            locks: ScopeLocks::new(),
        }
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Paths of documents in `scope` carrying any (or, with `match_all`,
    /// every) tag in `tags`.
    pub async fn find_documents_by_tags(
        &self,
        scope: &IndexScope,
        tags: &[Tag],
        match_all: bool,
    ) -> Result<Vec<DocumentPath>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.load_or_rebuild(scope).await?;
        let paths = find_paths(&index, tags, TagMatch::from_match_all(match_all));

        debug!(
            subsystem = "index",
            component = "query",
            scope = %scope,
            tag_count = tags.len(),
            match_all,
            result_count = paths.len(),
            "Tag query evaluated"
        );
        Ok(paths)
    }

    /// Like [`find_documents_by_tags`](Self::find_documents_by_tags), but
    /// loads each match. Matches whose document no longer exists are
    /// dropped.
    pub async fn search_documents(
        &self,
        scope: &IndexScope,
        tags: &[Tag],
        match_all: bool,
    ) -> Result<Vec<Document>> {
        let paths = self.find_documents_by_tags(scope, tags, match_all).await?;
        let mut documents = Vec::with_capacity(paths.len());

        for path in &paths {
            match self.documents.get_document(scope, path).await {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => {
                    debug!(scope = %scope, path = %path, "Indexed document no longer exists");
                }
                Err(e) if e.is_persistence() => return Err(e),
                Err(e) => {
                    warn!(
                        subsystem = "index",
                        component = "query",
                        scope = %scope,
                        path = %path,
                        error = %e,
                        "Skipping unreadable search result"
                    );
                }
            }
        }

        Ok(documents)
    }

    /// Rebuild the index, or with `full_rebuild = false` report the
    /// existing one and only build when none is usable.
    pub async fn update_index(
        &self,
        scope: &IndexScope,
        options: UpdateIndexOptions,
    ) -> Result<UpdateIndexResult> {
        let _guard = self.locks.lock(scope).await;

        if !options.full_rebuild {
            if let Some(index) = self.cache.get(scope).await? {
                return Ok(update_result(&index, options, None));
            }
            info!(subsystem = "index", scope = %scope, "No usable index, rebuilding");
        }

        let report = self.builder.rebuild(scope).await?;
        Ok(update_result(&report.index, options, Some(&report)))
    }

    /// Incremental hook for a created or modified document.
    pub async fn document_saved(&self, scope: &IndexScope, document: &Document) -> Result<Arc<TagIndex>> {
        let _guard = self.locks.lock(scope).await;
        self.updater.add_or_update_document(scope, document).await
    }

    /// Incremental hook for a deleted document.
    pub async fn document_removed(
        &self,
        scope: &IndexScope,
        identity: &DocumentIdentity,
    ) -> Result<RemoveOutcome> {
        let _guard = self.locks.lock(scope).await;
        self.updater.remove_document(scope, identity).await
    }

    /// Every tag in the scope with the number of documents carrying it.
    pub async fn list_tags(&self, scope: &IndexScope) -> Result<Vec<TagSummary>> {
        let index = self.load_or_rebuild(scope).await?;
        Ok(index
            .entries()
            .iter()
            .map(|entry| TagSummary {
                tag: entry.tag.clone(),
                document_count: entry.documents.len(),
            })
            .collect())
    }

    pub async fn invalidate(&self, scope: Option<&IndexScope>) {
        self.cache.invalidate(scope).await;
    }

    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all().await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    async fn load_or_rebuild(&self, scope: &IndexScope) -> Result<Arc<TagIndex>> {
        if let Some(index) = self.cache.get(scope).await? {
            return Ok(index);
        }

        let _guard = self.locks.lock(scope).await;
        // Another task may have built it while we waited
        if let Some(index) = self.cache.get(scope).await? {
            return Ok(index);
        }
        Ok(self.builder.rebuild(scope).await?.index)
    }
}

fn update_result(
    index: &TagIndex,
    options: UpdateIndexOptions,
    report: Option<&RebuildReport>,
) -> UpdateIndexResult {
    let metadata = index.metadata();
    UpdateIndexResult {
        document_count: report.map_or(metadata.document_count, |r| r.loaded),
        tags: index.tags().cloned().collect(),
        update_info: UpdateInfo {
            full_rebuild: options.full_rebuild,
            rebuilt: report.is_some(),
            index_type: metadata.index_type,
            branch_name: metadata.branch_name.clone(),
            last_updated: metadata.last_updated,
            skipped_documents: report.map_or(0, |r| r.skipped),
        },
    }
}
