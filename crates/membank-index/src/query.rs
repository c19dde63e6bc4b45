//! AND/OR tag queries over a loaded index.

use std::collections::BTreeSet;

use membank_core::{DocumentPath, Tag};

use crate::model::TagIndex;

/// Tag matching mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagMatch {
    /// Document has at least one of the tags.
    #[default]
    Any,
    /// Document has every tag.
    All,
}

impl TagMatch {
    pub fn from_match_all(match_all: bool) -> Self {
        if match_all {
            Self::All
        } else {
            Self::Any
        }
    }
}

fn paths_for<'a>(index: &'a TagIndex, tag: &Tag) -> BTreeSet<&'a DocumentPath> {
    index
        .entry(tag)
        .map(|entry| entry.paths().collect())
        .unwrap_or_default()
}

/// Paths of documents matching `tags`, sorted.
///
/// An empty tag list matches nothing in either mode. Unknown tags match
/// nothing.
pub fn find_paths(index: &TagIndex, tags: &[Tag], mode: TagMatch) -> Vec<DocumentPath> {
    let Some((first, rest)) = tags.split_first() else {
        return Vec::new();
    };

    let matched: BTreeSet<&DocumentPath> = match mode {
        TagMatch::Any => tags.iter().flat_map(|tag| paths_for(index, tag)).collect(),
        TagMatch::All => {
            let mut running = paths_for(index, first);
            for tag in rest {
                if running.is_empty() {
                    break;
                }
                let next = paths_for(index, tag);
                running.retain(|path| next.contains(path));
            }
            running
        }
    };

    matched.into_iter().cloned().collect()
}
