//! Centralized default constants for the memory bank.
//!
//! Organized by domain area. Other crates reference these instead of
//! defining their own magic values.

// =============================================================================
// DIRECTORY LAYOUT
// =============================================================================

/// Default docs root when `MEMBANK_ROOT` is not set.
pub const DOCS_ROOT: &str = "docs";

/// Directory (under the docs root) holding one sub-directory per branch.
pub const BRANCH_ROOT_DIR: &str = "branch-memory-bank";

/// Directory (under the docs root) holding the global memory bank.
pub const GLOBAL_ROOT_DIR: &str = "global-memory-bank";

// =============================================================================
// TAG INDEX FILES
// =============================================================================

/// Index file name for both scopes in the standard layout.
pub const TAG_INDEX_FILE: &str = "tag-index.json";

/// Branch index file name in the legacy layout.
pub const LEGACY_BRANCH_INDEX_FILE: &str = "_index.json";

/// Global index file name in the legacy layout.
pub const LEGACY_GLOBAL_INDEX_FILE: &str = "_global_index.json";

/// Schema tag of the legacy map-shaped index.
pub const TAG_INDEX_SCHEMA_V1: &str = "tag_index_v1";

/// Schema tag written for every new index.
pub const TAG_INDEX_SCHEMA_V2: &str = "tag-index-v2";

/// Schema tag of structured JSON documents.
pub const DOCUMENT_SCHEMA_V2: &str = "memory_document_v2";

/// Suffix of in-flight temporary files produced by atomic writes.
pub const TEMP_FILE_SUFFIX: &str = ".tmp";

// =============================================================================
// INDEX CACHE
// =============================================================================

/// Time an index stays valid in the in-process cache, in seconds.
pub const INDEX_CACHE_TTL_SECS: u64 = 30;

/// Cache key used for the global scope.
pub const GLOBAL_CACHE_KEY: &str = "global";

// =============================================================================
// TAGS
// =============================================================================

/// Maximum length of a tag value.
pub const TAG_MAX_LEN: usize = 100;

/// Maximum length of a branch name.
pub const BRANCH_NAME_MAX_LEN: usize = 255;
