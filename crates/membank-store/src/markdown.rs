//! Title and tag extraction for Markdown documents.
//!
//! A Markdown memory bank document looks like:
//!
//! ```text
//! # Active Context
//!
//! tags: #core #active-context
//!
//! ...body...
//! ```
//!
//! The title is the first level-one heading; tags come from `tags:` lines
//! outside fenced code blocks.

use membank_core::Tag;
use once_cell::sync::Lazy;
use regex::Regex;

static HASHTAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^a-zA-Z0-9_-])#([a-zA-Z0-9][a-zA-Z0-9_-]*)").expect("hashtag pattern is valid")
});

/// Text of the first `# ` heading outside code blocks.
pub fn extract_title(content: &str) -> Option<String> {
    outside_code_blocks(content)
        .find_map(|line| line.trim_start().strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Tags declared on `tags:` lines.
///
/// Returns sanitized, deduplicated tags in first-seen order.
pub fn extract_tags(content: &str) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::new();

    for line in outside_code_blocks(content) {
        let trimmed = line.trim_start();
        let Some(declared) = strip_prefix_ignore_case(trimmed, "tags:") else {
            continue;
        };

        for cap in HASHTAG.captures_iter(declared) {
            let Some(raw) = cap.get(1) else { continue };
            if let Some(tag) = Tag::sanitize(raw.as_str()) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }
    }

    tags
}

/// Render a Markdown document with a title heading and tag line.
pub fn render(title: &str, tags: &[Tag], body: &str) -> String {
    let mut out = format!("# {}\n\n", title.trim());
    if !tags.is_empty() {
        let line: Vec<String> = tags.iter().map(|t| format!("#{}", t)).collect();
        out.push_str(&format!("tags: {}\n\n", line.join(" ")));
    }
    let body = body.trim();
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
    out
}

/// Strip title and tag lines, returning the remaining body.
pub fn body(content: &str) -> String {
    let title = extract_title(content);
    let mut title_seen = false;
    let mut kept = Vec::new();
    let mut in_fence = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence {
            if !title_seen && title.is_some() && trimmed.starts_with("# ") {
                title_seen = true;
                continue;
            }
            if strip_prefix_ignore_case(trimmed, "tags:").is_some() {
                continue;
            }
        }
        kept.push(line);
    }

    kept.join("\n").trim().to_string()
}

fn outside_code_blocks(content: &str) -> impl Iterator<Item = &str> {
    let mut in_fence = false;
    content.lines().filter(move |line| {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            return false;
        }
        !in_fence
    })
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    if line.len() >= prefix.len()
        && line.is_char_boundary(prefix.len())
        && line[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}
