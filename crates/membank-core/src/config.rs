//! Memory bank configuration.
//!
//! Configuration is read from environment variables:
//! - `MEMBANK_ROOT`: docs root (default: `docs`)
//! - `MEMBANK_BRANCH_ROOT`: branch memory bank root (default: `<root>/branch-memory-bank`)
//! - `MEMBANK_GLOBAL_ROOT`: global memory bank root (default: `<root>/global-memory-bank`)
//! - `MEMBANK_INDEX_TTL_SECS`: index cache TTL in seconds (default: 30)
//! - `MEMBANK_INDEX_LAYOUT`: `standard` or `legacy` index file names (default: standard)

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::defaults;
use crate::error::{Error, Result};
use crate::scope::IndexScope;

/// File naming scheme for tag index files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexLayout {
    /// `tag-index.json` in both branch and global roots.
    #[default]
    Standard,
    /// `_index.json` per branch, `_global_index.json` for the global bank.
    Legacy,
}

impl IndexLayout {
    /// Index file name for a scope under this layout.
    pub fn file_name(&self, scope: &IndexScope) -> &'static str {
        match (self, scope) {
            (Self::Standard, _) => defaults::TAG_INDEX_FILE,
            (Self::Legacy, IndexScope::Branch(_)) => defaults::LEGACY_BRANCH_INDEX_FILE,
            (Self::Legacy, IndexScope::Global) => defaults::LEGACY_GLOBAL_INDEX_FILE,
        }
    }

    /// The layout that is not this one.
    pub fn other(&self) -> Self {
        match self {
            Self::Standard => Self::Legacy,
            Self::Legacy => Self::Standard,
        }
    }

    /// Whether a file name is an index file under any layout.
    pub fn is_index_file_name(name: &str) -> bool {
        name == defaults::TAG_INDEX_FILE
            || name == defaults::LEGACY_BRANCH_INDEX_FILE
            || name == defaults::LEGACY_GLOBAL_INDEX_FILE
    }
}

impl FromStr for IndexLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "legacy" => Ok(Self::Legacy),
            other => Err(Error::Config(format!("unknown index layout: {}", other))),
        }
    }
}

impl fmt::Display for IndexLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// Locations and tunables of one memory bank.
#[derive(Debug, Clone)]
pub struct MemoryBankConfig {
    /// Directory holding one sub-directory per branch (by safe name).
    pub branch_root: PathBuf,
    /// Directory holding the global memory bank.
    pub global_root: PathBuf,
    /// How long a cached index is served without touching disk.
    pub index_cache_ttl: Duration,
    /// Index file naming used for writes.
    pub index_layout: IndexLayout,
}

impl Default for MemoryBankConfig {
    fn default() -> Self {
        Self::with_root(defaults::DOCS_ROOT)
    }
}

impl MemoryBankConfig {
    /// Default layout below a docs root.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            branch_root: root.join(defaults::BRANCH_ROOT_DIR),
            global_root: root.join(defaults::GLOBAL_ROOT_DIR),
            index_cache_ttl: Duration::from_secs(defaults::INDEX_CACHE_TTL_SECS),
            index_layout: IndexLayout::default(),
        }
    }

    /// Load configuration from `MEMBANK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let root = env::var("MEMBANK_ROOT").unwrap_or_else(|_| defaults::DOCS_ROOT.to_string());
        let mut config = Self::with_root(&root);

        if let Ok(branch_root) = env::var("MEMBANK_BRANCH_ROOT") {
            config.branch_root = PathBuf::from(branch_root);
        }
        if let Ok(global_root) = env::var("MEMBANK_GLOBAL_ROOT") {
            config.global_root = PathBuf::from(global_root);
        }
        if let Ok(ttl) = env::var("MEMBANK_INDEX_TTL_SECS") {
            let secs: u64 = ttl.trim().parse().map_err(|_| {
                Error::Config(format!("MEMBANK_INDEX_TTL_SECS must be an integer, got {}", ttl))
            })?;
            config.index_cache_ttl = Duration::from_secs(secs);
        }
        if let Ok(layout) = env::var("MEMBANK_INDEX_LAYOUT") {
            config.index_layout = layout.parse()?;
        }

        config.validate()?;
        debug!(
            branch_root = %config.branch_root.display(),
            global_root = %config.global_root.display(),
            ttl_secs = config.index_cache_ttl.as_secs(),
            layout = %config.index_layout,
            "Loaded memory bank configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.branch_root.as_os_str().is_empty() {
            return Err(Error::Config("branch root cannot be empty".to_string()));
        }
        if self.global_root.as_os_str().is_empty() {
            return Err(Error::Config("global root cannot be empty".to_string()));
        }
        if self.index_cache_ttl.is_zero() {
            return Err(Error::Config("index cache TTL must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Directory that holds a scope's documents and index file.
    pub fn scope_dir(&self, scope: &IndexScope) -> PathBuf {
        match scope {
            IndexScope::Branch(name) => self.branch_root.join(name.safe_name()),
            IndexScope::Global => self.global_root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::BranchName;

    #[test]
    fn test_default_layout_paths() {
        let config = MemoryBankConfig::with_root("/data/docs");
        assert_eq!(config.branch_root, PathBuf::from("/data/docs/branch-memory-bank"));
        assert_eq!(config.global_root, PathBuf::from("/data/docs/global-memory-bank"));
        assert_eq!(config.index_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.index_layout, IndexLayout::Standard);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scope_dir() {
        let config = MemoryBankConfig::with_root("/d");
        let branch = IndexScope::Branch(BranchName::new("feature/x").unwrap());
        assert_eq!(
            config.scope_dir(&branch),
            PathBuf::from("/d/branch-memory-bank/feature-x")
        );
        assert_eq!(
            config.scope_dir(&IndexScope::Global),
            PathBuf::from("/d/global-memory-bank")
        );
    }

    #[test]
    fn test_layout_file_names() {
        let branch = IndexScope::Branch(BranchName::new("main").unwrap());
        assert_eq!(IndexLayout::Standard.file_name(&branch), "tag-index.json");
        assert_eq!(IndexLayout::Standard.file_name(&IndexScope::Global), "tag-index.json");
        assert_eq!(IndexLayout::Legacy.file_name(&branch), "_index.json");
        assert_eq!(IndexLayout::Legacy.file_name(&IndexScope::Global), "_global_index.json");
        assert_eq!(IndexLayout::Legacy.other(), IndexLayout::Standard);
    }

    #[test]
    fn test_is_index_file_name() {
        assert!(IndexLayout::is_index_file_name("tag-index.json"));
        assert!(IndexLayout::is_index_file_name("_index.json"));
        assert!(IndexLayout::is_index_file_name("_global_index.json"));
        assert!(!IndexLayout::is_index_file_name("progress.json"));
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("LEGACY".parse::<IndexLayout>().unwrap(), IndexLayout::Legacy);
        assert!(matches!("other".parse::<IndexLayout>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = MemoryBankConfig::with_root("/d");
        config.index_cache_ttl = Duration::ZERO;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
