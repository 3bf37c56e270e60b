// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Write-path orchestration for content mutations.
//!
//! Every mutation runs the same guard chain in a fixed order (rate limit,
//! session, role, CSRF) and short-circuits on the first failure, so a
//! rate-limited caller learns nothing about whether its credentials were
//! valid. Only after the perimeter passes does the payload get validated,
//! sanitized, serialized to frontmatter and committed to the store.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::csrf::CsrfTokenManager;
use crate::error::{AppError, Result};
use crate::frontmatter;
use crate::limiter::RateLimiter;
use crate::sanitize::sanitize;
use crate::store::VersionedStore;
use crate::validator::{self, ContentKind, FieldError};

/// Authenticated session identity, as asserted by the upstream provider.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub role: String,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Everything the guard chain needs to know about the caller.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Client identity for rate limiting (the peer IP).
    pub client_key: String,
    pub session: Option<Session>,
    pub csrf_token: Option<String>,
}

/// Result of a successful mutation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WriteReceipt {
    pub slug: String,
    pub path: String,
    pub sha: String,
}

/// Orchestrates content writes behind the security perimeter.
pub struct ContentManager {
    store: Arc<dyn VersionedStore>,
    api_limiter: Arc<RateLimiter>,
    csrf: Arc<CsrfTokenManager>,
}

impl ContentManager {
    pub fn new(
        store: Arc<dyn VersionedStore>,
        api_limiter: Arc<RateLimiter>,
        csrf: Arc<CsrfTokenManager>,
    ) -> Self {
        Self {
            store,
            api_limiter,
            csrf,
        }
    }

    /// Create a new document; the slug is derived from the title. Fails with
    /// a conflict if a document with the same slug already exists.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        kind: ContentKind,
        payload: &Value,
    ) -> Result<WriteReceipt> {
        self.authorize(ctx).await?;
        let data = validate_sanitized(payload, kind)?;

        let slug = slugify(&data.title);
        if slug.is_empty() {
            return Err(AppError::Validation(vec![FieldError {
                field: "title".into(),
                message: "does not produce a usable slug".into(),
            }]));
        }

        let path = content_path(kind, &slug);
        let document = frontmatter::serialize(&data.metadata(), &data.content);
        let message = format!("Add {}: {}", kind.label(), data.title);
        let sha = self
            .store
            .write_if_version(&path, &document, None, &message)
            .await?;

        info!(kind = kind.label(), slug, "created content");
        Ok(WriteReceipt { slug, path, sha })
    }

    /// Replace an existing document in place. The slug comes from the URL and
    /// never changes, even when the title does.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        kind: ContentKind,
        slug: &str,
        payload: &Value,
    ) -> Result<WriteReceipt> {
        self.authorize(ctx).await?;
        require_valid_slug(slug)?;
        let data = validate_sanitized(payload, kind)?;

        let path = content_path(kind, slug);
        let current = self
            .store
            .read(&path)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {slug} not found", kind.label())))?;

        let document = frontmatter::serialize(&data.metadata(), &data.content);
        let message = format!("Update {}: {}", kind.label(), data.title);
        let sha = self
            .store
            .write_if_version(&path, &document, Some(&current.sha), &message)
            .await?;

        info!(kind = kind.label(), slug, "updated content");
        Ok(WriteReceipt {
            slug: slug.to_string(),
            path,
            sha,
        })
    }

    /// Delete a document by slug.
    pub async fn delete(&self, ctx: &RequestContext, kind: ContentKind, slug: &str) -> Result<()> {
        self.authorize(ctx).await?;
        require_valid_slug(slug)?;

        let path = content_path(kind, slug);
        let current = self
            .store
            .read(&path)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {slug} not found", kind.label())))?;

        let message = format!("Delete {}: {slug}", kind.label());
        self.store.delete(&path, &current.sha, &message).await?;

        info!(kind = kind.label(), slug, "deleted content");
        Ok(())
    }

    /// Guard chain. Order matters: the rate limit is checked first so an
    /// attacker cannot probe credentials or tokens past the budget.
    async fn authorize(&self, ctx: &RequestContext) -> Result<()> {
        if self.api_limiter.is_limited(&ctx.client_key).await {
            return Err(AppError::RateLimited);
        }
        let session = ctx.session.as_ref().ok_or(AppError::Auth)?;
        if !session.is_admin() {
            warn!(session_id = %session.id, role = %session.role, "non-admin write attempt");
            return Err(AppError::Forbidden);
        }
        if !self
            .csrf
            .validate(ctx.csrf_token.as_deref(), &session.id)
            .await
        {
            warn!(session_id = %session.id, "write rejected: CSRF validation failed");
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

/// Validate the payload, then sanitize every string field of the normalized
/// record. Validation sees the raw input; only clean values reach the store.
fn validate_sanitized(payload: &Value, kind: ContentKind) -> Result<validator::ContentData> {
    let mut data = validator::validate(payload, kind).map_err(AppError::Validation)?;
    data.title = sanitize(&data.title);
    data.description = sanitize(&data.description);
    data.content = sanitize(&data.content);
    data.tags = data.tags.iter().map(|t| sanitize(t)).collect();
    data.category = data.category.as_deref().map(sanitize);
    data.difficulty = data.difficulty.as_deref().map(sanitize);
    data.image = data.image.as_deref().map(sanitize);
    Ok(data)
}

/// Repository path for a document.
pub fn content_path(kind: ContentKind, slug: &str) -> String {
    match kind {
        ContentKind::Post => format!("app/blog/content/{slug}.md"),
        ContentKind::Snippet => format!("app/snippets/content/{slug}.md"),
    }
}

/// Derive a URL slug from a title: lowercase, whitespace to hyphens,
/// everything else dropped, runs of hyphens collapsed.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut prev_dash = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            slug.push(c);
            prev_dash = false;
        } else if (c.is_whitespace() || c == '-') && !slug.is_empty() && !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn require_valid_slug(slug: &str) -> Result<()> {
    let ok = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !ok {
        return Err(AppError::Validation(vec![FieldError {
            field: "slug".into(),
            message: format!("invalid slug: {slug}"),
        }]));
    }
    Ok(())
}
