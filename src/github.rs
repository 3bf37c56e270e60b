// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! GitHub Contents API adapter for the versioned store port.
//!
//! Files are read and written through the repository contents endpoint, with
//! the `sha` returned by GitHub used as the version token. GitHub rejects a
//! write whose `sha` no longer matches the head of the branch; that rejection
//! is mapped to [`AppError::Conflict`]. Every transport failure is logged with
//! the path and operation before being surfaced as a domain error; raw
//! `reqwest` errors never leave this module.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::store::{validate_path, RemoteFile, VersionedStore};

/// GitHub-backed [`VersionedStore`].
pub struct GitHubStore {
    client: reqwest::Client,
    config: GitHubConfig,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: Option<String>,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: Option<ShaOnly>,
}

#[derive(Debug, Deserialize)]
struct ShaOnly {
    sha: String,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

impl GitHubStore {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base,
            self.config.owner,
            self.config.repo_name(),
            path
        )
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "markdown-cms")
    }

    fn transport_error(operation: &'static str, path: &str, err: reqwest::Error) -> AppError {
        warn!(operation, path, error = %err, "remote store request failed");
        AppError::RemoteStore {
            operation,
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    fn api_error(operation: &'static str, path: &str, status: StatusCode, body: String) -> AppError {
        warn!(operation, path, status = %status, "remote store rejected request");
        // The contents API answers 409 when the sha is stale and 422 when a
        // sha is required but missing; both mean a concurrent modification.
        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            AppError::Conflict(format!("{operation} on {path}: {body}"))
        } else {
            AppError::RemoteStore {
                operation,
                path: path.to_string(),
                message: format!("status {status}: {body}"),
            }
        }
    }
}

#[async_trait]
impl VersionedStore for GitHubStore {
    async fn read(&self, path: &str) -> Result<Option<RemoteFile>> {
        validate_path(path)?;
        let response = self
            .request(self.client.get(self.contents_url(path)))
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await
            .map_err(|e| Self::transport_error("read", path, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, "remote file not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::api_error("read", path, status, body));
        }

        let file: ContentResponse = response
            .json()
            .await
            .map_err(|e| Self::transport_error("read", path, e))?;
        let content = decode_content(file.content.as_deref().unwrap_or_default()).ok_or_else(
            || AppError::RemoteStore {
                operation: "read",
                path: path.to_string(),
                message: "response content is not valid base64".into(),
            },
        )?;

        Ok(Some(RemoteFile {
            path: path.to_string(),
            content,
            sha: file.sha,
        }))
    }

    async fn write_if_version(
        &self,
        path: &str,
        content: &str,
        expected_sha: Option<&str>,
        message: &str,
    ) -> Result<String> {
        validate_path(path)?;
        let body = WriteRequest {
            message,
            content: BASE64.encode(content),
            branch: &self.config.branch,
            sha: expected_sha,
        };

        let response = self
            .request(self.client.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::transport_error("write", path, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::api_error("write", path, status, body));
        }

        let written: WriteResponse = response
            .json()
            .await
            .map_err(|e| Self::transport_error("write", path, e))?;
        info!(path, "wrote remote file");
        Ok(written.content.map(|c| c.sha).unwrap_or_default())
    }

    async fn delete(&self, path: &str, sha: &str, message: &str) -> Result<()> {
        validate_path(path)?;
        let body = DeleteRequest {
            message,
            sha,
            branch: &self.config.branch,
        };

        let response = self
            .request(self.client.delete(self.contents_url(path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::transport_error("delete", path, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::api_error("delete", path, status, body));
        }

        info!(path, "deleted remote file");
        Ok(())
    }
}

/// The contents API returns base64 with embedded newlines.
fn decode_content(encoded: &str) -> Option<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GitHubStore {
        GitHubStore::new(GitHubConfig {
            token: "t".into(),
            owner: "someone".into(),
            repo: "https://github.com/someone/blog.git".into(),
            branch: "main".into(),
            api_base: "https://api.github.com".into(),
        })
    }

    #[test]
    fn builds_contents_url_from_config() {
        assert_eq!(
            store().contents_url("app/blog/content/hello.md"),
            "https://api.github.com/repos/someone/blog/contents/app/blog/content/hello.md"
        );
    }

    #[test]
    fn decodes_base64_with_embedded_newlines() {
        let encoded = "aGVsbG8g\nd29ybGQ=\n";
        assert_eq!(decode_content(encoded).unwrap(), "hello world");
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(decode_content("!!!").is_none());
    }

    #[test]
    fn stale_sha_statuses_map_to_conflict() {
        let err = GitHubStore::api_error(
            "write",
            "a.md",
            StatusCode::CONFLICT,
            "is at abc but expected def".into(),
        );
        assert!(matches!(err, AppError::Conflict(_)));

        let err =
            GitHubStore::api_error("write", "a.md", StatusCode::UNPROCESSABLE_ENTITY, "sha".into());
        assert!(matches!(err, AppError::Conflict(_)));

        let err = GitHubStore::api_error("read", "a.md", StatusCode::BAD_GATEWAY, "".into());
        assert!(matches!(err, AppError::RemoteStore { .. }));
    }

    #[tokio::test]
    async fn traversal_paths_never_reach_the_network() {
        // An invalid URL would fail differently; path validation must reject first.
        let err = store().read("../secrets").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
