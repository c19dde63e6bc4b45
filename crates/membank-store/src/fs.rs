//! Local filesystem backend.
//!
//! Writes go to a uniquely named temporary file in the destination
//! directory, are flushed with `sync_all`, and are then renamed over the
//! target, so a concurrent reader sees either the old or the new content.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use membank_core::defaults::TEMP_FILE_SUFFIX;
use membank_core::{Error, FileSystem, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// `FileSystem` implementation backed by `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

/// Temporary sibling path used while replacing `target`.
fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    target.with_file_name(format!(".{}.{}{}", name, Uuid::new_v4().simple(), TEMP_FILE_SUFFIX))
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn file_exists(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::persistence(path, e)),
        }
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .await
            .map_err(|e| Error::persistence(path, e))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        debug!(path = %path.display(), size = content.len(), "fs: write");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.create_directory(parent).await?;
        }

        let temp_path = temp_path_for(path);
        let result: std::io::Result<()> = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, path).await
        }
        .await;

        if let Err(e) = result {
            warn!(temp_path = %temp_path.display(), target = %path.display(), error = %e, "fs: atomic write failed");
            let _ = fs::remove_file(&temp_path).await; // Best-effort cleanup
            return Err(Error::persistence(path, e));
        }

        // Set permissions to 0644 (rw-r--r--, no execute)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
                .await
                .map_err(|e| Error::persistence(path, e))?;
        }

        Ok(())
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(|e| {
            warn!(dir = %path.display(), error = %e, "fs: create_dir_all failed");
            Error::persistence(path, e)
        })
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![PathBuf::new()];

        while let Some(relative) = pending.pop() {
            let absolute = dir.join(&relative);
            let mut entries = match fs::read_dir(&absolute).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::persistence(&absolute, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Error::persistence(&absolute, e))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| Error::persistence(entry.path(), e))?;
                let child = relative.join(entry.file_name());
                if file_type.is_dir() {
                    pending.push(child);
                } else if file_type.is_file() {
                    files.push(child);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(path, e)),
        }
    }

    async fn modified(&self, path: &Path) -> Result<Option<DateTime<Utc>>> {
        let meta = match fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::persistence(path, e)),
        };
        let modified = meta.modified().map_err(|e| Error::persistence(path, e))?;
        Ok(Some(DateTime::<Utc>::from(modified)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = dir.path().join("nested/deeper/file.json");

        fs.write_file(&path, "{\"a\":1}").await.unwrap();

        assert!(fs.file_exists(&path).await.unwrap());
        assert_eq!(fs.read_file(&path).await.unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_write_replaces_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = dir.path().join("index.json");

        fs.write_file(&path, "first").await.unwrap();
        fs.write_file(&path, "second").await.unwrap();

        assert_eq!(fs.read_file(&path).await.unwrap(), "second");
        let files = fs.list_files(dir.path()).await.unwrap();
        assert_eq!(files, vec![PathBuf::from("index.json")]);
    }

    #[tokio::test]
    async fn test_file_exists_missing() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        assert!(!fs.file_exists(&dir.path().join("nope")).await.unwrap());
        // A directory is not a file
        assert!(!fs.file_exists(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_missing_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let err = fs.read_file(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
    }

    #[tokio::test]
    async fn test_create_directory_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let target = dir.path().join("a/b/c");
        fs.create_directory(&target).await.unwrap();
        fs.create_directory(&target).await.unwrap();
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_list_files_recursive_and_relative() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        fs.write_file(&dir.path().join("b.json"), "{}").await.unwrap();
        fs.write_file(&dir.path().join("sub/a.md"), "# A").await.unwrap();

        let files = fs.list_files(dir.path()).await.unwrap();
        assert_eq!(files, vec![PathBuf::from("b.json"), PathBuf::from("sub/a.md")]);
    }

    #[tokio::test]
    async fn test_list_files_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        assert!(fs.list_files(&dir.path().join("missing")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_file_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = dir.path().join("x.json");
        fs.write_file(&path, "{}").await.unwrap();
        fs.remove_file(&path).await.unwrap();
        fs.remove_file(&path).await.unwrap();
        assert!(!fs.file_exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_modified() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = dir.path().join("m.json");
        assert!(fs.modified(&path).await.unwrap().is_none());
        fs.write_file(&path, "{}").await.unwrap();
        assert!(fs.modified(&path).await.unwrap().is_some());
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/x/y/tag-index.json"));
        assert_eq!(temp.parent(), Some(Path::new("/x/y")));
        let name = temp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".tag-index.json."));
        assert!(name.ends_with(TEMP_FILE_SUFFIX));
    }
}
