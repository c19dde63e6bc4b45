//! Tag value object.
//!
//! A tag is a lowercase label made of ASCII letters, digits and hyphens,
//! starting with a letter or digit. Tags are validated when they come from a
//! caller and sanitized when they come from documents already on disk.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::defaults::TAG_MAX_LEN;
use crate::error::{Error, Result};

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("tag pattern is valid"));

static INVALID_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("invalid-run pattern is valid"));

/// A normalized, validated tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Validate `value` as a tag.
    ///
    /// Leading/trailing whitespace is ignored; anything else that does not
    /// match `^[a-z0-9][a-z0-9-]*$` is rejected.
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return Err(Error::InvalidTag("tag cannot be empty".to_string()));
        }
        if value.len() > TAG_MAX_LEN {
            return Err(Error::InvalidTag(format!(
                "tag must be {} characters or less: {}",
                TAG_MAX_LEN, value
            )));
        }
        if !TAG_PATTERN.is_match(value) {
            return Err(Error::InvalidTag(format!(
                "'{}' must contain only lowercase letters, digits and hyphens",
                value
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// Coerce arbitrary text into a tag.
    ///
    /// Lowercases, collapses every run of other characters into one hyphen
    /// and trims hyphens at both ends. Returns `None` when nothing usable
    /// remains.
    pub fn sanitize(raw: &str) -> Option<Self> {
        let lowered = raw.trim().trim_start_matches('#').to_lowercase();
        let hyphenated = INVALID_RUN.replace_all(&lowered, "-");
        let trimmed = hyphenated.trim_matches('-');
        if trimmed.is_empty() {
            return None;
        }
        let mut value = trimmed.to_string();
        if value.len() > TAG_MAX_LEN {
            value.truncate(TAG_MAX_LEN);
            value = value.trim_end_matches('-').to_string();
        }
        Some(Self(value))
    }

    /// Validate a list of raw tag values, failing on the first invalid one.
    pub fn parse_all<I, S>(values: I) -> Result<Vec<Tag>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values.into_iter().map(Tag::new).collect()
    }

    /// The tag value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Tag::new(s)
    }
}

impl TryFrom<String> for Tag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Tag::new(value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
