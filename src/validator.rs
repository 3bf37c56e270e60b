// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Schema validation for incoming content write requests.
//!
//! Validation never mutates its input and reports every failing field, not
//! just the first. The output is a normalized record with defaults applied
//! (`tags: []`, `published: true`, snippet `difficulty: intermediate`).

use serde::Serialize;
use serde_json::Value;

use crate::frontmatter::Metadata;

/// Kind of content being written; selects the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Post,
    Snippet,
}

impl ContentKind {
    /// Human label used in commit messages and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Post => "blog post",
            Self::Snippet => "snippet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "posts" | "post" | "blog" => Some(Self::Post),
            "snippets" | "snippet" => Some(Self::Snippet),
            _ => None,
        }
    }
}

pub const DIFFICULTIES: &[&str] = &["beginner", "intermediate", "advanced"];

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;

/// One failing field and the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validated, normalized write payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentData {
    pub title: String,
    pub description: String,
    pub content: String,
    pub date: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub image: Option<String>,
}

impl ContentData {
    /// Frontmatter view of this payload (the body is carried separately).
    pub fn metadata(&self) -> Metadata {
        Metadata {
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date.clone(),
            tags: self.tags.clone(),
            published: self.published,
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
            image: self.image.clone(),
        }
    }
}

/// Validate a write payload against the schema for `kind`.
pub fn validate(input: &Value, kind: ContentKind) -> Result<ContentData, Vec<FieldError>> {
    let Some(obj) = input.as_object() else {
        return Err(vec![FieldError::new("payload", "must be a JSON object")]);
    };

    let mut errors = Vec::new();

    let title = require_string(obj.get("title"), "title", &mut errors);
    if let Some(title) = &title {
        let len = title.chars().count();
        if len < TITLE_MIN {
            errors.push(FieldError::new(
                "title",
                format!("must be at least {TITLE_MIN} characters"),
            ));
        } else if len > TITLE_MAX {
            errors.push(FieldError::new(
                "title",
                format!("must be at most {TITLE_MAX} characters"),
            ));
        }
    }

    let description = match obj.get("description") {
        None | Some(Value::Null) => Some(String::new()),
        Some(Value::String(s)) => {
            if s.chars().count() > DESCRIPTION_MAX {
                errors.push(FieldError::new(
                    "description",
                    format!("must be at most {DESCRIPTION_MAX} characters"),
                ));
            }
            Some(s.clone())
        }
        Some(_) => {
            errors.push(FieldError::new("description", "must be a string"));
            None
        }
    };

    let content = require_string(obj.get("content"), "content", &mut errors);
    if let Some(content) = &content {
        if content.is_empty() {
            errors.push(FieldError::new("content", "is required"));
        }
    }

    let date = require_string(obj.get("date"), "date", &mut errors);
    if let Some(date) = &date {
        if !is_iso_date(date) {
            errors.push(FieldError::new("date", "invalid date format (YYYY-MM-DD)"));
        }
    }

    let tags = match obj.get("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut tags = Vec::new();
            let mut seen = std::collections::HashSet::new();
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => {
                        if seen.insert(s.clone()) {
                            tags.push(s.clone());
                        }
                    }
                    _ => errors.push(FieldError::new(
                        "tags",
                        format!("element {i} must be a string"),
                    )),
                }
            }
            tags
        }
        Some(_) => {
            errors.push(FieldError::new("tags", "must be an array of strings"));
            Vec::new()
        }
    };

    let published = match obj.get("published") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            errors.push(FieldError::new("published", "must be a boolean"));
            true
        }
    };

    let image = optional_string(obj.get("image"), "image", &mut errors);

    let (category, difficulty) = match kind {
        ContentKind::Post => (None, None),
        ContentKind::Snippet => {
            let category = require_string(obj.get("category"), "category", &mut errors);
            if let Some(category) = &category {
                if category.is_empty() {
                    errors.push(FieldError::new("category", "is required"));
                }
            }
            let difficulty = match obj.get("difficulty") {
                None | Some(Value::Null) => Some("intermediate".to_string()),
                Some(Value::String(s)) if DIFFICULTIES.contains(&s.as_str()) => Some(s.clone()),
                Some(_) => {
                    errors.push(FieldError::new(
                        "difficulty",
                        format!("must be one of: {}", DIFFICULTIES.join(", ")),
                    ));
                    None
                }
            };
            (category, difficulty)
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ContentData {
        // Presence was checked above; errors is empty here.
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        content: content.unwrap_or_default(),
        date: date.unwrap_or_default(),
        tags,
        published,
        category,
        difficulty,
        image,
    })
}

fn require_string(value: Option<&Value>, field: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        None | Some(Value::Null) => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            None
        }
    }
}

fn optional_string(
    value: Option<&Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            None
        }
    }
}

/// Strict `YYYY-MM-DD` shape check.
fn is_iso_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| matches!(i, 4 | 7) || b.is_ascii_digit())
}
