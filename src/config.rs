// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration for the content management service.
//!
//! All secrets are read once at startup and validated before the server binds;
//! a deployment missing the admin credentials or the GitHub token refuses to
//! start instead of failing on the first write request.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Admin credential configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Remote content store (GitHub) configuration
    #[serde(default)]
    pub github: GitHubConfig,

    /// Rate limiting and CSRF configuration
    #[serde(default)]
    pub security: SecurityConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Admin credentials. The password is stored as a bcrypt hash, never in clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Admin username (exact match)
    #[serde(default)]
    pub admin_username: String,

    /// Bcrypt hash of the admin password
    #[serde(default)]
    pub admin_password_hash: String,

    /// Base32-encoded TOTP shared secret; second factor is skipped when unset
    #[serde(default)]
    pub totp_secret: Option<String>,
}

/// Remote content store coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// API token with contents read/write scope
    #[serde(default)]
    pub token: String,

    /// Repository owner (user or org)
    #[serde(default)]
    pub owner: String,

    /// Repository name, or a full `github.com/owner/repo` URL
    #[serde(default)]
    pub repo: String,

    /// Branch commits are made against (default: main)
    #[serde(default = "default_branch")]
    pub branch: String,

    /// API base URL, overridable for GitHub Enterprise
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

/// Rate limit and CSRF policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Login attempts allowed per window (default: 5)
    #[serde(default = "default_login_max_attempts")]
    pub login_max_attempts: u32,

    /// Login rate window in seconds (default: 900 = 15 minutes)
    #[serde(default = "default_login_window_secs")]
    pub login_window_secs: u64,

    /// General API requests allowed per window (default: 60)
    #[serde(default = "default_api_max_attempts")]
    pub api_max_attempts: u32,

    /// API rate window in seconds (default: 60)
    #[serde(default = "default_api_window_secs")]
    pub api_window_secs: u64,

    /// CSRF token lifetime in seconds (default: 3600)
    #[serde(default = "default_csrf_lifetime_secs")]
    pub csrf_lifetime_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_login_max_attempts() -> u32 {
    5
}

fn default_login_window_secs() -> u64 {
    15 * 60
}

fn default_api_max_attempts() -> u32 {
    60
}

fn default_api_window_secs() -> u64 {
    60
}

fn default_csrf_lifetime_secs() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth: AuthConfig::default(),
            github: GitHubConfig::default(),
            security: SecurityConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            api_base: default_api_base(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            login_max_attempts: default_login_max_attempts(),
            login_window_secs: default_login_window_secs(),
            api_max_attempts: default_api_max_attempts(),
            api_window_secs: default_api_window_secs(),
            csrf_lifetime_secs: default_csrf_lifetime_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl SecurityConfig {
    /// Login rate window duration.
    pub fn login_window(&self) -> Duration {
        Duration::from_secs(self.login_window_secs)
    }

    /// API rate window duration.
    pub fn api_window(&self) -> Duration {
        Duration::from_secs(self.api_window_secs)
    }

    /// CSRF token lifetime.
    pub fn csrf_lifetime(&self) -> Duration {
        Duration::from_secs(self.csrf_lifetime_secs)
    }
}

impl GitHubConfig {
    /// Repository name with any `github.com/owner/` URL prefix and `.git`
    /// suffix stripped, so both plain names and clone URLs are accepted.
    pub fn repo_name(&self) -> String {
        let repo = match self.repo.split_once("github.com/") {
            Some((_, rest)) => rest,
            None => self.repo.as_str(),
        };
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        // A URL form carries the owner too; keep only the trailing segment.
        match repo.rsplit_once('/') {
            Some((_, name)) => name.to_string(),
            None => repo.to_string(),
        }
    }
}

impl Config {
    /// Fail-fast startup validation of required secrets.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut missing = Vec::new();
        if self.auth.admin_username.is_empty() {
            missing.push("ADMIN_USERNAME");
        }
        if self.auth.admin_password_hash.is_empty() {
            missing.push("ADMIN_PASSWORD_HASH");
        }
        if self.github.token.is_empty() {
            missing.push("GITHUB_TOKEN");
        }
        if self.github.owner.is_empty() {
            missing.push("GITHUB_OWNER");
        }
        if self.github.repo.is_empty() {
            missing.push("GITHUB_REPO");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("missing required configuration: {}", missing.join(", "))
        }
    }
}
