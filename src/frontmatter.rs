// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Frontmatter parsing and serialization.
//!
//! A content file is a `---` delimited YAML key-value block followed by a
//! markdown body. Unknown keys are ignored on read and dropped on write, so
//! round-tripping is lossy for non-schema fields. Serialization uses a fixed
//! key order and omits absent optional fields rather than writing nulls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DELIMITER: &str = "---";

/// Schema of the frontmatter block shared by posts and snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    /// Snippets only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Snippets only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

fn default_published() -> bool {
    true
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            date: String::new(),
            tags: Vec::new(),
            published: true,
            category: None,
            difficulty: None,
            image: None,
        }
    }
}

/// A parsed content file: metadata plus the markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub meta: Metadata,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("unterminated frontmatter block")]
    Unterminated,
    #[error("invalid frontmatter: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

/// Parse a content file into metadata and body.
///
/// A file without a leading delimiter is all body with default metadata.
/// Duplicate tags are collapsed, keeping first occurrence order.
pub fn parse(text: &str) -> Result<Document, FrontmatterError> {
    let (block, body) = match split_frontmatter(text) {
        Some(parts) => parts?,
        None => (None, text),
    };

    let mut meta = match block {
        Some(yaml) if !yaml.trim().is_empty() => serde_yaml::from_str::<Metadata>(yaml)?,
        _ => Metadata::default(),
    };
    dedup_tags(&mut meta.tags);

    Ok(Document {
        meta,
        body: body.trim_start_matches('\n').to_string(),
    })
}

type SplitResult<'a> = Result<(Option<&'a str>, &'a str), FrontmatterError>;

fn split_frontmatter(text: &str) -> Option<SplitResult<'_>> {
    let rest = text
        .strip_prefix(&format!("{DELIMITER}\n"))
        .or_else(|| text.strip_prefix(&format!("{DELIMITER}\r\n")))?;

    Some(match find_closing(rest) {
        Some((block_end, body_start)) => Ok((Some(&rest[..block_end]), &rest[body_start..])),
        None => Err(FrontmatterError::Unterminated),
    })
}

/// Locate the closing delimiter line; returns (end of block, start of body).
fn find_closing(rest: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            return Some((offset, offset + line.len()));
        }
        offset += line.len();
    }
    None
}

fn dedup_tags(tags: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    tags.retain(|tag| seen.insert(tag.clone()));
}

/// Serialize metadata and body back into a content file.
///
/// Key order is fixed; only schema fields are written.
pub fn serialize(meta: &Metadata, body: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("title: {}", quote(&meta.title)));
    if !meta.description.is_empty() {
        lines.push(format!("description: {}", quote(&meta.description)));
    }
    if !meta.date.is_empty() {
        lines.push(format!("date: {}", quote(&meta.date)));
    }
    let tags = meta
        .tags
        .iter()
        .map(|t| quote(t))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("tags: [{tags}]"));
    if let Some(category) = &meta.category {
        lines.push(format!("category: {}", quote(category)));
    }
    if let Some(difficulty) = &meta.difficulty {
        lines.push(format!("difficulty: {}", quote(difficulty)));
    }
    lines.push(format!("published: {}", meta.published));
    if let Some(image) = &meta.image {
        lines.push(format!("image: {}", quote(image)));
    }

    format!("{DELIMITER}\n{}\n{DELIMITER}\n\n{}", lines.join("\n"), body)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
