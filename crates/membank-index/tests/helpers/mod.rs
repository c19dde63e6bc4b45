//! Test helpers for tag index integration tests.
//!
//! Provides an in-memory document store, a filesystem wrapper that counts
//! I/O and can fail or pause it, and a fixture that wires them into a
//! `TagIndexService` rooted in a temporary directory.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use membank_core::{
    BranchName, Document, DocumentPath, DocumentStore, Error, FileSystem, IndexScope,
    MemoryBankConfig, Result, Tag,
};
use membank_index::{TagIndex, TagIndexService};
use membank_store::LocalFileSystem;
use tempfile::TempDir;
use tokio::sync::oneshot;

/// Fixed timestamp so rebuilt references compare equal.
pub fn stamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn doc(path: &str, tags: &[&str]) -> Document {
    Document::new(
        format!("id-{}", path),
        DocumentPath::new(path).unwrap(),
        path,
        tags,
    )
    .unwrap()
    .with_last_modified(stamp())
}

pub fn tags(values: &[&str]) -> Vec<Tag> {
    values.iter().map(|v| Tag::new(v).unwrap()).collect()
}

pub fn path(value: &str) -> DocumentPath {
    DocumentPath::new(value).unwrap()
}

pub fn branch(name: &str) -> IndexScope {
    IndexScope::Branch(BranchName::new(name).unwrap())
}

pub fn names(paths: &[DocumentPath]) -> Vec<&str> {
    paths.iter().map(DocumentPath::as_str).collect()
}

/// Tag to sorted paths, ignoring metadata and reference details.
pub fn canonical(index: &TagIndex) -> BTreeMap<String, BTreeSet<String>> {
    index
        .entries()
        .iter()
        .map(|e| {
            (
                e.tag.to_string(),
                e.paths().map(|p| p.to_string()).collect(),
            )
        })
        .collect()
}

/// `DocumentStore` held in memory, keyed by scope.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, BTreeMap<DocumentPath, Document>>>,
    /// Paths whose `get_document` fails.
    broken: Mutex<BTreeSet<DocumentPath>>,
    /// Paths listed but returning `None`.
    ghosts: Mutex<BTreeSet<DocumentPath>>,
    pub gets: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn insert(&self, scope: &IndexScope, document: Document) {
        self.documents
            .lock()
            .unwrap()
            .entry(scope.cache_key())
            .or_default()
            .insert(document.path.clone(), document);
    }

    pub fn remove(&self, scope: &IndexScope, path: &DocumentPath) {
        if let Some(docs) = self.documents.lock().unwrap().get_mut(&scope.cache_key()) {
            docs.remove(path);
        }
    }

    pub fn break_document(&self, path: &DocumentPath) {
        self.broken.lock().unwrap().insert(path.clone());
    }

    pub fn add_ghost(&self, path: &DocumentPath) {
        self.ghosts.lock().unwrap().insert(path.clone());
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_documents(&self, scope: &IndexScope) -> Result<Vec<DocumentPath>> {
        let mut paths: BTreeSet<DocumentPath> = self
            .documents
            .lock()
            .unwrap()
            .get(&scope.cache_key())
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default();
        paths.extend(self.broken.lock().unwrap().iter().cloned());
        paths.extend(self.ghosts.lock().unwrap().iter().cloned());
        Ok(paths.into_iter().collect())
    }

    async fn get_document(
        &self,
        scope: &IndexScope,
        path: &DocumentPath,
    ) -> Result<Option<Document>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.broken.lock().unwrap().contains(path) {
            return Err(Error::InvalidDocument {
                path: path.to_string(),
                reason: "corrupt".to_string(),
            });
        }
        Ok(self
            .documents
            .lock()
            .unwrap()
            .get(&scope.cache_key())
            .and_then(|docs| docs.get(path).cloned()))
    }
}

/// Held by a paused `read_file` until released.
struct ReadPause {
    reached: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

/// Local filesystem that counts reads and writes, can refuse either, and
/// can hold one read open after it has loaded the file.
#[derive(Default)]
pub struct CountingFs {
    inner: LocalFileSystem,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pause: Mutex<Option<ReadPause>>,
}

impl CountingFs {
    /// Pause the next `read_file` after it has read the content.
    ///
    /// The first receiver fires once the read is paused; sending on the
    /// returned sender lets it finish.
    pub fn pause_next_read(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (reached_tx, reached_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.pause.lock().unwrap() = Some(ReadPause {
            reached: reached_tx,
            release: release_rx,
        });
        (reached_rx, release_tx)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileSystem for CountingFs {
    async fn file_exists(&self, path: &Path) -> Result<bool> {
        self.inner.file_exists(path).await
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::persistence(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "unreadable"),
            ));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        let content = self.inner.read_file(path).await?;

        let pause = self.pause.lock().unwrap().take();
        if let Some(pause) = pause {
            let _ = pause.reached.send(());
            let _ = pause.release.await;
        }
        Ok(content)
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::persistence(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_file(path, content).await
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        self.inner.create_directory(path).await
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.inner.list_files(dir).await
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        self.inner.remove_file(path).await
    }

    async fn modified(&self, path: &Path) -> Result<Option<DateTime<Utc>>> {
        self.inner.modified(path).await
    }
}

/// A service over an in-memory document store and a temp directory.
pub struct Bank {
    pub dir: TempDir,
    pub config: MemoryBankConfig,
    pub fs: Arc<CountingFs>,
    pub docs: Arc<MemoryDocumentStore>,
    pub service: TagIndexService,
}

impl Bank {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = MemoryBankConfig::with_root(dir.path());
        let fs = Arc::new(CountingFs::default());
        let docs = Arc::new(MemoryDocumentStore::default());
        let service = TagIndexService::new(fs.clone(), docs.clone(), config.clone());
        Self {
            dir,
            config,
            fs,
            docs,
            service,
        }
    }

    /// Store a document and run the incremental hook, as a save would.
    pub async fn save(&self, scope: &IndexScope, document: Document) {
        self.docs.insert(scope, document.clone());
        self.service.document_saved(scope, &document).await.unwrap();
    }

    pub fn index_file(&self, scope: &IndexScope) -> PathBuf {
        self.config.scope_dir(scope).join("tag-index.json")
    }

    pub fn index_bytes(&self, scope: &IndexScope) -> Option<String> {
        std::fs::read_to_string(self.index_file(scope)).ok()
    }

    pub async fn current(&self, scope: &IndexScope) -> Arc<TagIndex> {
        self.service.cache().get(scope).await.unwrap().unwrap()
    }
}
