//! Canonical in-memory tag index.
//!
//! Whatever wire format an index was read from, it is held as a list of
//! `{tag, documents}` entries. Entries are kept sorted by tag and each
//! entry's documents sorted by path, with no empty entries and no duplicate
//! paths within an entry.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use membank_core::{DocumentPath, DocumentReference, IndexScope, IndexType, Tag};
use serde::{Deserialize, Serialize};

/// `metadata` block of an index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    pub index_type: IndexType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub document_count: usize,
    #[serde(default)]
    pub tag_count: usize,
}

impl IndexMetadata {
    pub fn for_scope(scope: &IndexScope, last_updated: DateTime<Utc>) -> Self {
        Self {
            index_type: scope.index_type(),
            branch_name: scope.branch().map(|b| b.to_string()),
            last_updated,
            document_count: 0,
            tag_count: 0,
        }
    }
}

/// Documents carrying one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagIndexEntry {
    pub tag: Tag,
    pub documents: Vec<DocumentReference>,
}

impl TagIndexEntry {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            documents: Vec::new(),
        }
    }

    pub fn contains_path(&self, path: &DocumentPath) -> bool {
        self.documents.iter().any(|d| &d.path == path)
    }

    /// Insert a reference, or replace the one with the same path.
    /// Returns whether the entry changed.
    pub fn upsert(&mut self, reference: DocumentReference) -> bool {
        match self.documents.iter_mut().find(|d| d.path == reference.path) {
            Some(existing) if *existing == reference => false,
            Some(existing) => {
                *existing = reference;
                true
            }
            None => {
                self.documents.push(reference);
                true
            }
        }
    }

    /// Drop the reference to `path`. Returns whether one was removed.
    pub fn remove_path(&mut self, path: &DocumentPath) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| &d.path != path);
        self.documents.len() != before
    }

    pub fn paths(&self) -> impl Iterator<Item = &DocumentPath> {
        self.documents.iter().map(|d| &d.path)
    }

    fn normalize(&mut self) {
        let mut by_path: BTreeMap<DocumentPath, DocumentReference> = BTreeMap::new();
        for reference in self.documents.drain(..) {
            by_path.entry(reference.path.clone()).or_insert(reference);
        }
        self.documents = by_path.into_values().collect();
    }
}

/// Root aggregate: one per scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagIndex {
    metadata: IndexMetadata,
    entries: Vec<TagIndexEntry>,
}

impl TagIndex {
    /// An index with no entries for `scope`.
    pub fn empty(scope: &IndexScope) -> Self {
        Self::from_parts(IndexMetadata::for_scope(scope, Utc::now()), Vec::new())
    }

    /// Assemble an index, merging duplicate tags, dropping empty entries and
    /// recomputing the counts in `metadata`.
    pub fn from_parts(metadata: IndexMetadata, entries: Vec<TagIndexEntry>) -> Self {
        let mut merged: BTreeMap<Tag, TagIndexEntry> = BTreeMap::new();
        for entry in entries {
            match merged.get_mut(&entry.tag) {
                Some(existing) => existing.documents.extend(entry.documents),
                None => {
                    merged.insert(entry.tag.clone(), entry);
                }
            }
        }

        let entries: Vec<TagIndexEntry> = merged
            .into_values()
            .map(|mut e| {
                e.normalize();
                e
            })
            .filter(|e| !e.documents.is_empty())
            .collect();

        let mut index = Self { metadata, entries };
        index.recount();
        index
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn entries(&self) -> &[TagIndexEntry] {
        &self.entries
    }

    pub fn into_parts(self) -> (IndexMetadata, Vec<TagIndexEntry>) {
        (self.metadata, self.entries)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.metadata.last_updated
    }

    /// Entry for `tag`, if any document carries it.
    pub fn entry(&self, tag: &Tag) -> Option<&TagIndexEntry> {
        self.entries
            .binary_search_by(|e| e.tag.cmp(tag))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.entries.iter().map(|e| &e.tag)
    }

    /// Every distinct document path referenced by any entry.
    pub fn document_paths(&self) -> BTreeSet<&DocumentPath> {
        self.entries.iter().flat_map(|e| e.paths()).collect()
    }

    pub fn contains_path(&self, path: &DocumentPath) -> bool {
        self.entries.iter().any(|e| e.contains_path(path))
    }

    /// Path recorded for a document id.
    pub fn resolve_id(&self, id: &str) -> Option<&DocumentPath> {
        self.entries
            .iter()
            .flat_map(|e| e.documents.iter())
            .find(|d| d.id == id)
            .map(|d| &d.path)
    }

    /// Point the metadata at `scope` (index type and branch name).
    pub fn rescope(&mut self, scope: &IndexScope) {
        self.metadata.index_type = scope.index_type();
        self.metadata.branch_name = scope.branch().map(|b| b.to_string());
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.metadata.last_updated = now;
    }

    /// Equality of everything except `lastUpdated`.
    pub fn same_content(&self, other: &TagIndex) -> bool {
        self.entries == other.entries
            && self.metadata.index_type == other.metadata.index_type
            && self.metadata.branch_name == other.metadata.branch_name
            && self.metadata.document_count == other.metadata.document_count
            && self.metadata.tag_count == other.metadata.tag_count
    }

    fn recount(&mut self) {
        let document_count = self.document_paths().len();
        self.metadata.tag_count = self.entries.len();
        self.metadata.document_count = document_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use membank_core::BranchName;

    fn reference(path: &str, id: &str) -> DocumentReference {
        DocumentReference {
            id: id.to_string(),
            path: DocumentPath::new(path).unwrap(),
            title: path.to_string(),
            last_modified: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn entry(tag: &str, refs: Vec<DocumentReference>) -> TagIndexEntry {
        TagIndexEntry {
            tag: Tag::new(tag).unwrap(),
            documents: refs,
        }
    }

    fn meta() -> IndexMetadata {
        IndexMetadata::for_scope(&IndexScope::Global, Utc::now())
    }

    #[test]
    fn test_from_parts_normalizes() {
        let index = TagIndex::from_parts(
            meta(),
            vec![
                entry("b", vec![reference("z.json", "z"), reference("a.json", "a")]),
                entry("a", vec![reference("a.json", "a")]),
                entry("b", vec![reference("a.json", "a")]),
                entry("empty", vec![]),
            ],
        );

        let tags: Vec<&str> = index.tags().map(Tag::as_str).collect();
        assert_eq!(tags, vec!["a", "b"]);
        let b_paths: Vec<&str> = index
            .entry(&Tag::new("b").unwrap())
            .unwrap()
            .paths()
            .map(DocumentPath::as_str)
            .collect();
        assert_eq!(b_paths, vec!["a.json", "z.json"]);
    }

    #[test]
    fn test_counts_follow_invariants() {
        let index = TagIndex::from_parts(
            meta(),
            vec![
                entry("x", vec![reference("a.json", "a"), reference("b.json", "b")]),
                entry("y", vec![reference("a.json", "a")]),
            ],
        );
        assert_eq!(index.metadata().tag_count, 2);
        assert_eq!(index.metadata().document_count, 2);
    }

    #[test]
    fn test_entry_lookup_and_resolve_id() {
        let index = TagIndex::from_parts(meta(), vec![entry("x", vec![reference("a.json", "id-a")])]);
        assert!(index.entry(&Tag::new("x").unwrap()).is_some());
        assert!(index.entry(&Tag::new("nope").unwrap()).is_none());
        assert_eq!(index.resolve_id("id-a").map(DocumentPath::as_str), Some("a.json"));
        assert!(index.resolve_id("missing").is_none());
        assert!(index.contains_path(&DocumentPath::new("a.json").unwrap()));
    }

    #[test]
    fn test_upsert_and_remove_path() {
        let mut e = entry("x", vec![]);
        assert!(e.upsert(reference("a.json", "a")));
        assert!(!e.upsert(reference("a.json", "a")));
        let mut renamed = reference("a.json", "a");
        renamed.title = "Renamed".to_string();
        assert!(e.upsert(renamed));
        assert_eq!(e.documents.len(), 1);
        assert_eq!(e.documents[0].title, "Renamed");

        assert!(e.remove_path(&DocumentPath::new("a.json").unwrap()));
        assert!(!e.remove_path(&DocumentPath::new("a.json").unwrap()));
    }

    #[test]
    fn test_rescope_sets_branch_metadata() {
        let mut index = TagIndex::empty(&IndexScope::Global);
        let branch = IndexScope::Branch(BranchName::new("feature/x").unwrap());
        index.rescope(&branch);
        assert_eq!(index.metadata().index_type, IndexType::Branch);
        assert_eq!(index.metadata().branch_name.as_deref(), Some("feature/x"));
    }

    #[test]
    fn test_same_content_ignores_last_updated() {
        let mut a = TagIndex::from_parts(meta(), vec![entry("x", vec![reference("a.json", "a")])]);
        let b = a.clone();
        a.touch(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
        assert_ne!(a, b);
        assert!(a.same_content(&b));
    }
}
