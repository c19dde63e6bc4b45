//! Index scopes: one per branch plus the global memory bank.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults::{BRANCH_NAME_MAX_LEN, GLOBAL_CACHE_KEY};
use crate::error::{Error, Result};

/// A version-control branch name, e.g. `feature/login`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let name = raw.as_ref().trim();
        if name.is_empty() {
            return Err(Error::InvalidBranch("branch name cannot be empty".to_string()));
        }
        if name.len() > BRANCH_NAME_MAX_LEN {
            return Err(Error::InvalidBranch(format!(
                "branch name must be {} characters or less",
                BRANCH_NAME_MAX_LEN
            )));
        }
        if name.starts_with('/') || name.ends_with('/') {
            return Err(Error::InvalidBranch(format!(
                "branch name cannot start or end with '/': {}",
                name
            )));
        }
        if name.contains("..") || name.contains('\\') {
            return Err(Error::InvalidBranch(format!(
                "branch name contains a forbidden sequence: {}",
                name
            )));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidBranch(format!(
                "branch name cannot contain whitespace: {:?}",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory-safe form of the name (`feature/login` -> `feature-login`).
    pub fn safe_name(&self) -> String {
        self.0.replace('/', "-")
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BranchName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BranchName::new(s)
    }
}

impl TryFrom<String> for BranchName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        BranchName::new(value)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

/// Kind of index stored in the `metadata.indexType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Branch,
    Global,
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch => write!(f, "branch"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// The unit of index partitioning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexScope {
    Branch(BranchName),
    Global,
}

impl IndexScope {
    /// Parse an optional branch name: `None` selects the global scope.
    pub fn from_branch(branch: Option<&str>) -> Result<Self> {
        match branch {
            Some(name) => Ok(Self::Branch(BranchName::new(name)?)),
            None => Ok(Self::Global),
        }
    }

    /// Key used for the index cache and per-scope locks.
    ///
    /// Branches that share a directory share a key; a branch named
    /// `global` does not collide with the global scope.
    pub fn cache_key(&self) -> String {
        match self {
            Self::Branch(name) => format!("branch:{}", name.safe_name()),
            Self::Global => GLOBAL_CACHE_KEY.to_string(),
        }
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            Self::Branch(_) => IndexType::Branch,
            Self::Global => IndexType::Global,
        }
    }

    pub fn branch(&self) -> Option<&BranchName> {
        match self {
            Self::Branch(name) => Some(name),
            Self::Global => None,
        }
    }
}

impl fmt::Display for IndexScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(name) => write!(f, "branch:{}", name),
            Self::Global => write!(f, "global"),
        }
    }
}
