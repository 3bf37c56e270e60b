// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Versioned remote content store port.
//!
//! The store owns the mapping from logical path to version token (`sha`);
//! callers never cache a `sha` across requests. `save` re-reads the current
//! version immediately before the conditional write, which narrows but does
//! not eliminate the lost-update window against out-of-band edits. A
//! version mismatch surfaces as [`AppError::Conflict`] and is never retried
//! silently.

use async_trait::async_trait;

use crate::error::{AppError, Result};

/// A file in the remote store, with its current version token.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub path: String,
    pub content: String,
    pub sha: String,
}

/// Port for a version-controlled remote file store.
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Fetch a file and its version token; `None` when it does not exist.
    async fn read(&self, path: &str) -> Result<Option<RemoteFile>>;

    /// Write `content` if the remote version still matches `expected_sha`
    /// (`None` = create; the file must not exist). Returns the new version.
    async fn write_if_version(
        &self,
        path: &str,
        content: &str,
        expected_sha: Option<&str>,
        message: &str,
    ) -> Result<String>;

    /// Delete the file at `path`, which must currently be at version `sha`.
    async fn delete(&self, path: &str, sha: &str, message: &str) -> Result<()>;

    /// Create or update `path`, re-reading the current version first.
    async fn save(&self, path: &str, content: &str, message: &str) -> Result<String> {
        let current = self.read(path).await?;
        self.write_if_version(path, content, current.as_ref().map(|f| f.sha.as_str()), message)
            .await
    }
}

/// Reject paths that could escape the content tree. Runs before any network
/// call.
pub fn validate_path(path: &str) -> Result<()> {
    let traversal = path.contains("../") || path.contains("..\\") || path.starts_with('/');
    if traversal || path.is_empty() {
        return Err(AppError::Validation(vec![crate::validator::FieldError {
            field: "path".into(),
            message: format!("invalid content path: {path}"),
        }]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_content_paths() {
        assert!(validate_path("app/blog/content/my-post.md").is_ok());
        assert!(validate_path("app/snippets/content/a_b-c.md").is_ok());
    }

    #[test]
    fn rejects_traversal_and_absolute_paths() {
        assert!(validate_path("../secrets.env").is_err());
        assert!(validate_path("app/../../etc/passwd").is_err());
        assert!(validate_path("app\\..\\..\\etc").is_err());
        assert!(validate_path("/etc/passwd").is_err());
        assert!(validate_path("").is_err());
    }
}
