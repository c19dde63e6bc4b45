//! On-disk index formats.
//!
//! Two shapes exist for the `index` field:
//!
//! - v1 (`tag_index_v1`): `{ "<tag>": ["<path>", ...] }`
//! - v2 (`tag-index-v2`): `[{ "tag": "<tag>", "documents": [DocumentReference] }]`
//!
//! Both decode into [`TagIndex`]; writes always use v2. The shape of
//! `index` decides the format, the `schema` string is advisory.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use membank_core::defaults::{TAG_INDEX_SCHEMA_V1, TAG_INDEX_SCHEMA_V2};
use membank_core::{DocumentPath, DocumentReference, IndexScope, IndexType, Result, Tag};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{IndexMetadata, TagIndex, TagIndexEntry};

#[derive(Debug, Deserialize)]
struct RawIndexFile {
    #[serde(default)]
    schema: Option<String>,
    #[serde(default)]
    metadata: RawMetadata,
    index: WireIndex,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    index_type: Option<IndexType>,
    branch_name: Option<String>,
    last_updated: Option<DateTime<Utc>>,
    document_count: Option<usize>,
    tag_count: Option<usize>,
}

/// Either wire shape of the `index` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireIndex {
    V2(Vec<WireEntry>),
    V1(BTreeMap<String, Vec<String>>),
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    tag: String,
    #[serde(default)]
    documents: Vec<WireReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReference {
    #[serde(default)]
    id: Option<String>,
    path: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    last_modified: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct IndexFileOut<'a> {
    schema: &'static str,
    metadata: &'a IndexMetadata,
    index: &'a [TagIndexEntry],
}

/// Which wire shape a file used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    V1,
    V2,
}

impl WireFormat {
    pub fn schema(&self) -> &'static str {
        match self {
            Self::V1 => TAG_INDEX_SCHEMA_V1,
            Self::V2 => TAG_INDEX_SCHEMA_V2,
        }
    }
}

/// Parse an index file.
///
/// Metadata fields missing from the file are filled in from `scope`.
/// Tags are sanitized; references with unusable paths are dropped with a
/// warning. Counts are always recomputed from the entries.
pub fn decode(content: &str, scope: &IndexScope) -> Result<(TagIndex, WireFormat)> {
    let raw: RawIndexFile = serde_json::from_str(content)?;

    let format = match raw.index {
        WireIndex::V1(_) => WireFormat::V1,
        WireIndex::V2(_) => WireFormat::V2,
    };
    if let Some(schema) = raw.schema.as_deref() {
        if schema != format.schema() {
            debug!(schema, detected = format.schema(), "Index schema does not match index shape");
        }
    }

    let fallback = IndexMetadata::for_scope(scope, Utc::now());
    let metadata = IndexMetadata {
        index_type: raw.metadata.index_type.unwrap_or(fallback.index_type),
        branch_name: raw.metadata.branch_name.or(fallback.branch_name),
        last_updated: raw.metadata.last_updated.unwrap_or(fallback.last_updated),
        document_count: 0,
        tag_count: 0,
    };

    let entries = match raw.index {
        WireIndex::V1(map) => v1_entries(map, metadata.last_updated),
        WireIndex::V2(list) => v2_entries(list, metadata.last_updated),
    };

    let index = TagIndex::from_parts(metadata, entries);

    let stored = (raw.metadata.document_count, raw.metadata.tag_count);
    let actual = (index.metadata().document_count, index.metadata().tag_count);
    if stored != (Some(actual.0), Some(actual.1)) {
        debug!(
            stored_documents = ?stored.0,
            stored_tags = ?stored.1,
            document_count = actual.0,
            tag_count = actual.1,
            "Index counts recomputed"
        );
    }

    Ok((index, format))
}

/// Serialize an index as pretty-printed v2 JSON.
pub fn encode(index: &TagIndex) -> Result<String> {
    let out = IndexFileOut {
        schema: TAG_INDEX_SCHEMA_V2,
        metadata: index.metadata(),
        index: index.entries(),
    };
    Ok(serde_json::to_string_pretty(&out)?)
}

fn v1_entries(map: BTreeMap<String, Vec<String>>, stamp: DateTime<Utc>) -> Vec<TagIndexEntry> {
    map.into_iter()
        .filter_map(|(raw_tag, paths)| {
            let tag = sanitize_tag(&raw_tag)?;
            let documents = paths
                .into_iter()
                .filter_map(|raw_path| parse_path(&raw_path))
                .map(|path| DocumentReference {
                    id: path.as_str().to_string(),
                    title: path.file_stem().to_string(),
                    path,
                    last_modified: stamp,
                })
                .collect();
            Some(TagIndexEntry { tag, documents })
        })
        .collect()
}

fn v2_entries(list: Vec<WireEntry>, stamp: DateTime<Utc>) -> Vec<TagIndexEntry> {
    list.into_iter()
        .filter_map(|entry| {
            let tag = sanitize_tag(&entry.tag)?;
            let documents = entry
                .documents
                .into_iter()
                .filter_map(|doc| {
                    let path = parse_path(&doc.path)?;
                    Some(DocumentReference {
                        id: doc.id.unwrap_or_else(|| path.as_str().to_string()),
                        title: doc.title.unwrap_or_else(|| path.file_stem().to_string()),
                        last_modified: doc.last_modified.unwrap_or(stamp),
                        path,
                    })
                })
                .collect();
            Some(TagIndexEntry { tag, documents })
        })
        .collect()
}

fn sanitize_tag(raw: &str) -> Option<Tag> {
    match Tag::sanitize(raw) {
        Some(tag) => {
            if tag.as_str() != raw {
                warn!(raw, sanitized = %tag, "Index tag sanitized on read");
            }
            Some(tag)
        }
        None => {
            warn!(raw, "Dropping unusable index tag");
            None
        }
    }
}

fn parse_path(raw: &str) -> Option<DocumentPath> {
    match DocumentPath::new(raw) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(path = raw, error = %e, "Dropping index reference with invalid path");
            None
        }
    }
}
