// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Allow-list HTML sanitization.
//!
//! Anything outside the allow-list is stripped, not escaped: a disallowed tag
//! disappears while its text content survives, and `<script>`/`<style>` bodies
//! are removed entirely. `sanitize` is idempotent.

use ammonia::Builder;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Tags the rendered pipeline can legitimately produce.
const ALLOWED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "a", "ul", "ol", "li", "blockquote", "hr", "br",
    "strong", "em", "code", "pre", "table", "thead", "tbody", "tr", "th", "td", "img", "span",
    "div", "del", "kbd", "sup", "sub",
];

/// Attributes allowed on any element.
const GENERIC_ATTRS: &[&str] = &["class", "id", "title", "data-language", "data-highlighted"];

fn builder() -> &'static Builder<'static> {
    static BUILDER: OnceLock<Builder<'static>> = OnceLock::new();
    BUILDER.get_or_init(|| {
        let mut tag_attrs: HashMap<&str, HashSet<&str>> = HashMap::new();
        tag_attrs.insert("a", ["href", "target", "rel"].into_iter().collect());
        tag_attrs.insert("img", ["src", "alt"].into_iter().collect());
        tag_attrs.insert("ol", ["start"].into_iter().collect());

        let mut b = Builder::default();
        b.tags(ALLOWED_TAGS.iter().copied().collect())
            .generic_attributes(GENERIC_ATTRS.iter().copied().collect())
            .tag_attributes(tag_attrs)
            .url_schemes(["http", "https", "mailto"].into_iter().collect())
            // rel is managed by the pipeline's external-link stage, not rewritten here.
            .link_rel(None);
        b
    })
}

/// Sanitize an HTML fragment against the allow-list.
pub fn sanitize(html: &str) -> String {
    builder().clean(html).to_string()
}

/// Sanitize every string in a metadata record, recursively.
///
/// String values and string array elements are cleaned; numbers, booleans and
/// nulls pass through untouched.
pub fn sanitize_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), sanitize_value(value)))
        .collect()
}

fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(sanitize_fields(map)),
        other => other.clone(),
    }
}
