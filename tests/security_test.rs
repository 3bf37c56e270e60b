// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Security-focused tests: XSS, path traversal, CSRF misuse, brute force.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use markdown_cms::auth::CredentialVerifier;
use markdown_cms::config::AuthConfig;
use markdown_cms::csrf::CsrfTokenManager;
use markdown_cms::error::AppError;
use markdown_cms::limiter::RateLimiter;
use markdown_cms::manager::{ContentManager, RequestContext, Session};
use markdown_cms::markdown::MarkdownRenderer;
use markdown_cms::sanitize;
use markdown_cms::store::{validate_path, RemoteFile, VersionedStore};
use markdown_cms::validator::ContentKind;

struct MemoryStore {
    files: RwLock<HashMap<String, (String, u64)>>,
}

#[async_trait]
impl VersionedStore for MemoryStore {
    async fn read(&self, path: &str) -> markdown_cms::Result<Option<RemoteFile>> {
        Ok(self.files.read().await.get(path).map(|(content, rev)| RemoteFile {
            path: path.to_string(),
            content: content.clone(),
            sha: format!("rev-{rev}"),
        }))
    }

    async fn write_if_version(
        &self,
        path: &str,
        content: &str,
        expected_sha: Option<&str>,
        _message: &str,
    ) -> markdown_cms::Result<String> {
        let mut files = self.files.write().await;
        let current = files.get(path).map(|(_, rev)| format!("rev-{rev}"));
        if current.as_deref() != expected_sha {
            return Err(AppError::Conflict(format!("version mismatch on {path}")));
        }
        let next = files.get(path).map(|(_, rev)| rev + 1).unwrap_or(1);
        files.insert(path.to_string(), (content.to_string(), next));
        Ok(format!("rev-{next}"))
    }

    async fn delete(&self, path: &str, sha: &str, _message: &str) -> markdown_cms::Result<()> {
        let mut files = self.files.write().await;
        match files.get(path) {
            Some((_, rev)) if format!("rev-{rev}") == sha => {
                files.remove(path);
                Ok(())
            }
            Some(_) => Err(AppError::Conflict(format!("version mismatch on {path}"))),
            None => Err(AppError::NotFound(format!("{path} not found"))),
        }
    }
}

fn manager(api_limit: u32) -> (ContentManager, Arc<CsrfTokenManager>) {
    let store = Arc::new(MemoryStore {
        files: RwLock::new(HashMap::new()),
    });
    let csrf = Arc::new(CsrfTokenManager::new(Duration::from_secs(3600)));
    let limiter = Arc::new(RateLimiter::new(api_limit, Duration::from_secs(60)));
    (ContentManager::new(store, limiter, csrf.clone()), csrf)
}

fn payload() -> serde_json::Value {
    json!({
        "title": "Ordinary Title",
        "content": "body",
        "date": "2026-01-01",
    })
}

// --- XSS ---

#[test]
fn rendered_output_never_carries_script_payloads() {
    let renderer = MarkdownRenderer::new();
    let corpus = [
        "<script>alert(1)</script>",
        "hello <img src=x onerror=alert(1)>",
        "[click](javascript:alert(1))",
        "<a href=\"javascript:alert(1)\">x</a>",
        "<iframe src=\"https://evil.example\"></iframe>",
        "text <svg onload=alert(1)>",
        "`<script>inline</script>`",
    ];
    for markdown in corpus {
        let html = renderer.render_sanitized(markdown);
        assert!(!html.contains("<script"), "script survived for {markdown:?}");
        assert!(!html.contains("onerror"), "onerror survived for {markdown:?}");
        assert!(!html.contains("onload"), "onload survived for {markdown:?}");
        assert!(
            !html.contains("javascript:"),
            "javascript: url survived for {markdown:?}"
        );
        assert!(!html.contains("<iframe"), "iframe survived for {markdown:?}");
    }
}

#[test]
fn markdown_escaping_neutralizes_raw_html_in_text() {
    // Inline code is escaped by the serializer even before sanitization.
    let renderer = MarkdownRenderer::new();
    let html = renderer.render("`<script>x</script>`");
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn field_sanitization_strips_markup_from_metadata() {
    let fields = json!({
        "title": "T<script>alert(1)</script>itle",
        "description": "<img src=x onerror=steal()>desc",
        "tags": ["ok", "<style>bad</style>tag"],
    });
    let clean = sanitize::sanitize_fields(fields.as_object().unwrap());
    assert_eq!(clean["title"], json!("Title"));
    assert!(!clean["description"].as_str().unwrap().contains("onerror"));
    assert_eq!(clean["tags"][1], json!("tag"));
}

// --- Path traversal ---

#[test]
fn traversal_paths_are_rejected() {
    for bad in [
        "../../../etc/passwd",
        "app/../../secrets.env",
        "app\\..\\..\\config",
        "/etc/shadow",
        "",
    ] {
        assert!(validate_path(bad).is_err(), "accepted {bad:?}");
    }
}

#[tokio::test]
async fn traversal_slugs_never_reach_the_store() {
    let (manager, csrf) = manager(1000);
    let ctx = RequestContext {
        client_key: "198.51.100.7:1".into(),
        session: Some(Session {
            id: "s".into(),
            role: "admin".into(),
        }),
        csrf_token: Some(csrf.issue("s").await),
    };

    for bad in ["../secrets", "a/b", "UPPER", "spa ce"] {
        let err = manager
            .delete(&ctx, ContentKind::Post, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "accepted slug {bad:?}");
    }
}

// --- CSRF ---

#[tokio::test]
async fn mutations_without_a_token_are_forbidden() {
    let (manager, _csrf) = manager(1000);
    let ctx = RequestContext {
        client_key: "198.51.100.8:1".into(),
        session: Some(Session {
            id: "s".into(),
            role: "admin".into(),
        }),
        csrf_token: None,
    };
    let err = manager
        .create(&ctx, ContentKind::Post, &payload())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn stolen_token_fails_for_another_session() {
    let (manager, csrf) = manager(1000);
    let stolen = csrf.issue("victim-session").await;

    let ctx = RequestContext {
        client_key: "198.51.100.9:1".into(),
        session: Some(Session {
            id: "attacker-session".into(),
            role: "admin".into(),
        }),
        csrf_token: Some(stolen),
    };
    let err = manager
        .create(&ctx, ContentKind::Post, &payload())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn expired_token_is_forbidden() {
    let csrf = CsrfTokenManager::new(Duration::from_millis(20));
    let token = csrf.issue("s").await;
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(!csrf.validate(Some(&token), "s").await);
}

// --- Brute force ---

#[tokio::test]
async fn login_attempts_lock_out_after_the_budget() {
    let limiter = RateLimiter::new(5, Duration::from_secs(900));
    let verifier = CredentialVerifier::new(AuthConfig {
        admin_username: "admin".into(),
        admin_password_hash: bcrypt::hash("correct horse", 4).unwrap(),
        totp_secret: None,
    });

    let client = "203.0.113.9:9999";
    for _ in 0..5 {
        assert!(!limiter.is_limited(client).await);
        assert!(!verifier.verify("admin", "wrong guess"));
    }

    // Budget exhausted: the limiter now fires before any credential check,
    // even for the correct password.
    assert!(limiter.is_limited(client).await);
    assert!(verifier.verify("admin", "correct horse"));
}

#[tokio::test]
async fn api_rate_limit_precedes_csrf_probing() {
    let (manager, _csrf) = manager(2);
    let ctx = RequestContext {
        client_key: "203.0.113.10:1".into(),
        session: Some(Session {
            id: "s".into(),
            role: "admin".into(),
        }),
        csrf_token: Some("forged".into()),
    };

    // First two probes fail CSRF; after that the limiter answers first,
    // so the attacker cannot distinguish token states anymore.
    for _ in 0..2 {
        let err = manager
            .create(&ctx, ContentKind::Post, &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }
    let err = manager
        .create(&ctx, ContentKind::Post, &payload())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RateLimited));
}

#[tokio::test]
async fn role_escalation_via_headers_is_rejected() {
    let (manager, csrf) = manager(1000);
    let ctx = RequestContext {
        client_key: "203.0.113.11:1".into(),
        session: Some(Session {
            id: "s".into(),
            role: "administrator".into(), // not the exact role
        }),
        csrf_token: Some(csrf.issue("s").await),
    };
    let err = manager
        .create(&ctx, ContentKind::Post, &payload())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}
