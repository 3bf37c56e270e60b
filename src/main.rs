// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Markdown CMS service binary.
//!
//! Serves the admin content API in front of a GitHub-backed content store.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `ADMIN_USERNAME` / `ADMIN_PASSWORD_HASH`: admin credentials (required)
//! - `TOTP_SECRET`: base32 TOTP secret; second factor off when unset
//! - `GITHUB_TOKEN` / `GITHUB_OWNER` / `GITHUB_REPO`: store coordinates (required)
//! - `GITHUB_BRANCH`: commit branch (default: main)
//! - `LOGIN_MAX_ATTEMPTS` / `LOGIN_WINDOW_SECS`: login rate policy (default: 5 per 900s)
//! - `API_MAX_ATTEMPTS` / `API_WINDOW_SECS`: API rate policy (default: 60 per 60s)
//! - `CSRF_LIFETIME_SECS`: CSRF token lifetime (default: 3600)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use markdown_cms::config::{AuthConfig, Config, GitHubConfig, SecurityConfig};
use markdown_cms::handlers::{router, AppState};
use markdown_cms::metrics::AppMetrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load and validate configuration before binding anything
    let config = load_config();
    config.validate()?;
    info!(
        bind_addr = %config.bind_addr,
        github_owner = %config.github.owner,
        github_repo = %config.github.repo_name(),
        branch = %config.github.branch,
        second_factor = config.auth.totp_secret.is_some(),
        "Starting markdown CMS"
    );

    let metrics = AppMetrics::new()?;
    let state = Arc::new(AppState::new(config.clone(), metrics));

    // Spawn cleanup task for rate limiter windows
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.login_limiter.cleanup().await;
            cleanup_state.api_limiter.cleanup().await;
        }
    });

    // Build router
    let app = router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    Config {
        bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
        auth: AuthConfig {
            admin_username: env_or("ADMIN_USERNAME", ""),
            admin_password_hash: env_or("ADMIN_PASSWORD_HASH", ""),
            totp_secret: std::env::var("TOTP_SECRET").ok().filter(|s| !s.is_empty()),
        },
        github: GitHubConfig {
            token: env_or("GITHUB_TOKEN", ""),
            owner: env_or("GITHUB_OWNER", ""),
            repo: env_or("GITHUB_REPO", ""),
            branch: env_or("GITHUB_BRANCH", "main"),
            api_base: env_or("GITHUB_API_BASE", "https://api.github.com"),
        },
        security: SecurityConfig {
            login_max_attempts: env_parsed("LOGIN_MAX_ATTEMPTS", 5),
            login_window_secs: env_parsed("LOGIN_WINDOW_SECS", 900),
            api_max_attempts: env_parsed("API_MAX_ATTEMPTS", 60),
            api_window_secs: env_parsed("API_WINDOW_SECS", 60),
            csrf_lifetime_secs: env_parsed("CSRF_LIFETIME_SECS", 3600),
        },
        metrics: Default::default(),
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
