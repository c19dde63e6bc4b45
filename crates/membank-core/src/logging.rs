//! Structured logging schema and field name constants.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query by the same keys across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, completed rebuilds and index writes |
//! | DEBUG | Decision points, cache hits and misses |
//! | TRACE | Per-document iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "index", "store", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "tag_index_store", "index_cache", "builder", "updater"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "read", "write", "rebuild", "add_or_update", "remove"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Index scope (branch safe name or "global").
pub const SCOPE: &str = "scope";

/// Document path relative to the scope root.
pub const PATH: &str = "path";

/// Document id.
pub const DOCUMENT_ID: &str = "document_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of documents referenced by an index or scanned by a rebuild.
pub const DOCUMENT_COUNT: &str = "document_count";

/// Number of tag entries in an index.
pub const TAG_COUNT: &str = "tag_count";

/// Number of documents skipped during a rebuild.
pub const SKIPPED_COUNT: &str = "skipped_count";

/// Number of results returned by a query.
pub const RESULT_COUNT: &str = "result_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
