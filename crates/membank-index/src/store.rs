//! Tag index persistence: one JSON file per scope.

use std::path::PathBuf;
use std::sync::Arc;

use membank_core::{Error, FileSystem, IndexScope, MemoryBankConfig, Result};
use tracing::{debug, info, warn};

use crate::format::{self, WireFormat};
use crate::model::TagIndex;

/// Reads and writes the on-disk index for a scope.
///
/// Writes go to the configured layout's file name. Reads also fall back to
/// the other layout so banks created under either naming stay readable.
pub struct TagIndexStore {
    fs: Arc<dyn FileSystem>,
    config: MemoryBankConfig,
}

impl TagIndexStore {
    pub fn new(fs: Arc<dyn FileSystem>, config: MemoryBankConfig) -> Self {
        Self { fs, config }
    }

    pub fn config(&self) -> &MemoryBankConfig {
        &self.config
    }

    /// Path written by [`TagIndexStore::write`].
    pub fn index_path(&self, scope: &IndexScope) -> PathBuf {
        self.config
            .scope_dir(scope)
            .join(self.config.index_layout.file_name(scope))
    }

    fn candidate_paths(&self, scope: &IndexScope) -> [PathBuf; 2] {
        let dir = self.config.scope_dir(scope);
        let layout = self.config.index_layout;
        [
            dir.join(layout.file_name(scope)),
            dir.join(layout.other().file_name(scope)),
        ]
    }

    /// Load the index for `scope`.
    ///
    /// Candidates are tried in order, skipping any that is absent or cannot
    /// be parsed. Returns `Ok(None)` when none is usable. Other I/O failures
    /// are returned as `Error::Persistence`.
    pub async fn read(&self, scope: &IndexScope) -> Result<Option<TagIndex>> {
        for path in self.candidate_paths(scope) {
            if !self.fs.file_exists(&path).await? {
                continue;
            }

            let content = match self.fs.read_file(&path).await {
                Ok(content) => content,
                Err(Error::Persistence { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    // Removed between the existence check and the read
                    continue;
                }
                Err(e) => return Err(e),
            };

            match format::decode(&content, scope) {
                Ok((mut index, wire)) => {
                    index.rescope(scope);
                    if wire == WireFormat::V1 {
                        info!(
                            subsystem = "index",
                            component = "tag_index_store",
                            scope = %scope,
                            path = %path.display(),
                            "Read v1 index; next write upgrades it to v2"
                        );
                    }
                    debug!(
                        subsystem = "index",
                        component = "tag_index_store",
                        op = "read",
                        scope = %scope,
                        tag_count = index.metadata().tag_count,
                        document_count = index.metadata().document_count,
                        "Index loaded"
                    );
                    return Ok(Some(index));
                }
                Err(e) => {
                    warn!(
                        subsystem = "index",
                        component = "tag_index_store",
                        op = "read",
                        scope = %scope,
                        path = %path.display(),
                        error = %e,
                        "Malformed index file, treating as missing"
                    );
                }
            }
        }

        debug!(subsystem = "index", component = "tag_index_store", scope = %scope, "No usable index file");
        Ok(None)
    }

    /// Persist `index` for `scope`, replacing any previous file.
    pub async fn write(&self, scope: &IndexScope, index: &TagIndex) -> Result<()> {
        let dir = self.config.scope_dir(scope);
        self.fs.create_directory(&dir).await?;

        let path = self.index_path(scope);
        let content = format::encode(index)?;
        self.fs.write_file(&path, &content).await?;

        debug!(
            subsystem = "index",
            component = "tag_index_store",
            op = "write",
            scope = %scope,
            path = %path.display(),
            tag_count = index.metadata().tag_count,
            document_count = index.metadata().document_count,
            "Index written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use membank_core::{
        BranchName, DocumentPath, DocumentReference, IndexLayout, IndexType, Tag,
    };
    use membank_store::LocalFileSystem;
    use tempfile::TempDir;

    use crate::model::{IndexMetadata, TagIndexEntry};

    fn store_in(dir: &TempDir, layout: IndexLayout) -> TagIndexStore {
        let mut config = MemoryBankConfig::with_root(dir.path());
        config.index_layout = layout;
        TagIndexStore::new(Arc::new(LocalFileSystem::new()), config)
    }

    fn branch(name: &str) -> IndexScope {
        IndexScope::Branch(BranchName::new(name).unwrap())
    }

    fn sample(scope: &IndexScope) -> TagIndex {
        let reference = DocumentReference {
            id: "a".to_string(),
            path: DocumentPath::new("a.json").unwrap(),
            title: "A".to_string(),
            last_modified: Utc::now(),
        };
        TagIndex::from_parts(
            IndexMetadata::for_scope(scope, Utc::now()),
            vec![TagIndexEntry {
                tag: Tag::new("x").unwrap(),
                documents: vec![reference],
            }],
        )
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, IndexLayout::Standard);
        assert!(store.read(&branch("main")).await.unwrap().is_none());
        assert!(store.read(&IndexScope::Global).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, IndexLayout::Standard);
        let scope = branch("feature/login");
        let index = sample(&scope);

        store.write(&scope, &index).await.unwrap();

        let expected = dir.path().join("branch-memory-bank/feature-login/tag-index.json");
        assert_eq!(store.index_path(&scope), expected);
        assert!(expected.is_file());
        assert_eq!(store.read(&scope).await.unwrap(), Some(index));
    }

    #[tokio::test]
    async fn test_legacy_layout_file_names() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, IndexLayout::Legacy);

        store.write(&branch("main"), &sample(&branch("main"))).await.unwrap();
        store.write(&IndexScope::Global, &sample(&IndexScope::Global)).await.unwrap();

        assert!(dir.path().join("branch-memory-bank/main/_index.json").is_file());
        assert!(dir.path().join("global-memory-bank/_global_index.json").is_file());
    }

    #[tokio::test]
    async fn test_reads_other_layout() {
        let dir = TempDir::new().unwrap();
        let legacy = store_in(&dir, IndexLayout::Legacy);
        legacy.write(&IndexScope::Global, &sample(&IndexScope::Global)).await.unwrap();

        let standard = store_in(&dir, IndexLayout::Standard);
        let index = standard.read(&IndexScope::Global).await.unwrap().unwrap();
        assert_eq!(index.metadata().tag_count, 1);
    }

    #[tokio::test]
    async fn test_malformed_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, IndexLayout::Standard);
        let path = store.index_path(&IndexScope::Global);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{\"index\": [trunc").unwrap();

        assert!(store.read(&IndexScope::Global).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_file_falls_back_to_other_layout() {
        let dir = TempDir::new().unwrap();
        let legacy = store_in(&dir, IndexLayout::Legacy);
        let scope = branch("main");
        legacy.write(&scope, &sample(&scope)).await.unwrap();

        let standard = store_in(&dir, IndexLayout::Standard);
        std::fs::write(standard.index_path(&scope), "{\"index\": [trunc").unwrap();

        let index = standard.read(&scope).await.unwrap().unwrap();
        assert_eq!(index.metadata().tag_count, 1);
    }

    #[tokio::test]
    async fn test_read_rescopes_metadata() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, IndexLayout::Standard);
        let scope = branch("dev");
        // File claims to be global but lives in a branch directory
        store.write(&scope, &sample(&IndexScope::Global)).await.unwrap();

        let index = store.read(&scope).await.unwrap().unwrap();
        assert_eq!(index.metadata().index_type, IndexType::Branch);
        assert_eq!(index.metadata().branch_name.as_deref(), Some("dev"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_failure_is_persistence_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, IndexLayout::Standard);
        let global = dir.path().join("global-memory-bank");
        std::fs::create_dir_all(&global).unwrap();
        std::fs::set_permissions(&global, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores directory permissions
        let probe = global.join(".probe");
        if std::fs::write(&probe, "x").is_ok() {
            std::fs::remove_file(&probe).unwrap();
            return;
        }

        let err = store
            .write(&IndexScope::Global, &sample(&IndexScope::Global))
            .await
            .unwrap_err();
        assert!(err.is_persistence());

        std::fs::set_permissions(&global, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
