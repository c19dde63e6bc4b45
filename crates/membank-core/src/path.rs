//! Relative document paths.
//!
//! A `DocumentPath` is always relative to a scope root, uses `/` as the
//! separator, and can never escape that root.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Normalized relative path of a document within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Normalize and validate a raw path.
    ///
    /// Backslashes become `/`, `.` and empty segments are dropped. Empty
    /// paths, absolute paths, drive prefixes and `..` segments are rejected.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(Error::InvalidPath("document path cannot be empty".to_string()));
        }

        let unified = raw.replace('\\', "/");
        if unified.starts_with('/') {
            return Err(Error::InvalidPath(format!("path must be relative: {}", raw)));
        }
        if has_drive_prefix(&unified) {
            return Err(Error::InvalidPath(format!("path must be relative: {}", raw)));
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(Error::InvalidPath(format!(
                        "path traversal is not allowed: {}",
                        raw
                    )))
                }
                s if s.contains('\0') => {
                    return Err(Error::InvalidPath(format!("path contains NUL: {:?}", raw)))
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Err(Error::InvalidPath(format!("path has no file name: {}", raw)));
        }

        Ok(Self(segments.join("/")))
    }

    /// Build a document path from a filesystem path relative to a scope root.
    pub fn from_relative(path: &Path) -> Result<Self> {
        let raw = path
            .to_str()
            .ok_or_else(|| Error::InvalidPath(format!("non UTF-8 path: {}", path.display())))?;
        Self::new(raw)
    }

    /// The normalized path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its extension.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Parent directory, or `""` for top-level documents.
    pub fn directory(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// Lowercased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(name[idx + 1..].to_ascii_lowercase()),
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.extension().as_deref() == Some("md")
    }

    pub fn is_json(&self) -> bool {
        self.extension().as_deref() == Some("json")
    }

    /// Resolve against a scope root directory.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s))
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DocumentPath::new(s)
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DocumentPath::new(value)
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.0
    }
}

impl AsRef<str> for DocumentPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
