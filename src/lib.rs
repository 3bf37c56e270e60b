// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Markdown CMS
//!
//! A content management service for a markdown-backed blog: a rendering
//! pipeline from frontmatter-annotated markdown to sanitized HTML, and a
//! guarded admin write path that commits content to a versioned remote store.
//!
//! - Frontmatter parsing and fixed-order serialization
//! - Markdown to HTML through an ordered transform pipeline
//!   (syntax highlighting, copy buttons, external link hardening)
//! - Allow-list HTML sanitization
//! - Schema validation for posts and snippets
//! - Sliding-window rate limiting (login and API policies)
//! - Session-bound CSRF tokens
//! - bcrypt credentials with optional TOTP second factor
//! - GitHub-backed store with optimistic concurrency via content `sha`

pub mod ast;
pub mod auth;
pub mod config;
pub mod csrf;
pub mod error;
pub mod frontmatter;
pub mod github;
pub mod handlers;
pub mod limiter;
pub mod manager;
pub mod markdown;
pub mod metrics;
pub mod reader;
pub mod sanitize;
pub mod store;
pub mod validator;

pub use config::Config;
pub use error::{AppError, Result};
pub use manager::{ContentManager, RequestContext, Session};
pub use markdown::MarkdownRenderer;
pub use store::{RemoteFile, VersionedStore};
