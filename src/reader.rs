// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Content repository reader.
//!
//! Reads `.md` files from a content directory and turns them into typed
//! content records with rendered HTML. Every failure on this path degrades to
//! an empty result: a missing directory, an unreadable file, or malformed
//! frontmatter is logged and skipped, never propagated to page rendering.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::frontmatter::{self, Metadata};
use crate::markdown::MarkdownRenderer;

/// A content item: a post or a snippet, loaded from disk.
#[derive(Debug, Clone)]
pub struct ContentItem {
    /// Stable key, equal to the filename without extension.
    pub slug: String,
    pub meta: Metadata,
    /// Markdown body as stored.
    pub raw_body: String,
    /// Pipeline output for the body.
    pub rendered_html: String,
}

/// Reader over one content directory.
pub struct ContentReader {
    dir: PathBuf,
    renderer: Arc<MarkdownRenderer>,
}

impl ContentReader {
    pub fn new(dir: impl Into<PathBuf>, renderer: Arc<MarkdownRenderer>) -> Self {
        Self {
            dir: dir.into(),
            renderer,
        }
    }

    /// Slugs of every `.md` file in the directory, unordered.
    pub async fn list_slugs(&self) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %self.dir.display(), error = %err, "content directory unreadable");
                return Vec::new();
            }
        };

        let mut slugs = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(slug) = slug_from_path(&entry.path()) {
                slugs.push(slug);
            }
        }
        slugs
    }

    /// Load one item by slug. Returns `None` for anything that is not a
    /// well-formed content file, including traversal-shaped slugs.
    pub async fn read_by_slug(&self, slug: &str) -> Option<ContentItem> {
        if !is_safe_slug(slug) {
            warn!(slug, "rejected unsafe slug");
            return None;
        }

        let path = self.dir.join(format!("{slug}.md"));
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "content file not readable");
                return None;
            }
        };

        let doc = match frontmatter::parse(&text) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping malformed content file");
                return None;
            }
        };

        let rendered_html = self.renderer.render(&doc.body);
        Some(ContentItem {
            slug: slug.to_string(),
            meta: doc.meta,
            raw_body: doc.body,
            rendered_html,
        })
    }

    /// All published items, newest first.
    pub async fn all_items(&self) -> Vec<ContentItem> {
        let mut items = Vec::new();
        for slug in self.list_slugs().await {
            if let Some(item) = self.read_by_slug(&slug).await {
                if item.meta.published {
                    items.push(item);
                }
            }
        }
        items.sort_by(|a, b| sort_date(&b.meta.date).cmp(&sort_date(&a.meta.date)));
        items
    }

    /// Published items carrying the given tag, newest first.
    pub async fn items_by_tag(&self, tag: &str) -> Vec<ContentItem> {
        self.all_items()
            .await
            .into_iter()
            .filter(|item| item.meta.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Distinct tags across published items, in first-seen order.
    pub async fn all_tags(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut tags = Vec::new();
        for item in self.all_items().await {
            for tag in item.meta.tags {
                if seen.insert(tag.clone()) {
                    tags.push(tag);
                }
            }
        }
        tags
    }
}

fn slug_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("md") {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Unparseable dates sort last.
fn sort_date(date: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap_or(NaiveDate::MIN)
}
