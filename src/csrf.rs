// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! CSRF token management.
//!
//! Tokens are 256-bit random values, hex-encoded, stored server-side and bound
//! to the session that requested them. A token stays valid until its lifetime
//! elapses; it is not single-use (reuse before expiry is part of the contract,
//! flagged as a hardening opportunity rather than a bug). Expired tokens are
//! swept opportunistically on every `issue` call, which is sufficient at the
//! token volumes an admin surface sees.

use rand::RngCore;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug)]
struct TokenState {
    issued_at: Instant,
    session_id: String,
}

/// Issues and validates per-session anti-forgery tokens.
pub struct CsrfTokenManager {
    lifetime: Duration,
    tokens: RwLock<HashMap<String, TokenState>>,
}

impl CsrfTokenManager {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a fresh token bound to `session_id`.
    pub async fn issue(&self, session_id: &str) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let mut tokens = self.tokens.write().await;
        sweep_expired(&mut tokens, self.lifetime);
        tokens.insert(
            token.clone(),
            TokenState {
                issued_at: Instant::now(),
                session_id: session_id.to_string(),
            },
        );
        debug!(session_id, "issued CSRF token");
        token
    }

    /// Validate a token presented by `session_id`.
    ///
    /// False for a missing, unknown, or expired token, and for a token issued
    /// to a different session. Expired tokens are evicted on detection.
    pub async fn validate(&self, token: Option<&str>, session_id: &str) -> bool {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return false;
        };

        let mut tokens = self.tokens.write().await;
        let Some(state) = tokens.get(token) else {
            warn!(token = %truncated(token), "unknown CSRF token");
            return false;
        };

        if state.issued_at.elapsed() >= self.lifetime {
            warn!(token = %truncated(token), "expired CSRF token");
            tokens.remove(token);
            return false;
        }

        if state.session_id != session_id {
            warn!(token = %truncated(token), "CSRF token presented by a different session");
            return false;
        }

        true
    }
}

fn sweep_expired(tokens: &mut HashMap<String, TokenState>, lifetime: Duration) {
    tokens.retain(|_, state| state.issued_at.elapsed() < lifetime);
}

/// Tokens are secrets; only a prefix is ever logged. Truncation counts
/// characters, not bytes, so arbitrary presented tokens cannot panic here.
fn truncated(token: &str) -> String {
    format!("{}...", token.chars().take(6).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(lifetime: Duration) -> CsrfTokenManager {
        CsrfTokenManager::new(lifetime)
    }

    #[tokio::test]
    async fn issued_token_validates_immediately() {
        let csrf = manager(Duration::from_secs(3600));
        let token = csrf.issue("session-1").await;
        assert_eq!(token.len(), 64); // 256 bits, hex
        assert!(csrf.validate(Some(&token), "session-1").await);
    }

    #[tokio::test]
    async fn tokens_are_reusable_until_expiry() {
        let csrf = manager(Duration::from_secs(3600));
        let token = csrf.issue("session-1").await;
        assert!(csrf.validate(Some(&token), "session-1").await);
        assert!(csrf.validate(Some(&token), "session-1").await);
    }

    #[tokio::test]
    async fn missing_or_empty_token_is_rejected() {
        let csrf = manager(Duration::from_secs(3600));
        assert!(!csrf.validate(None, "session-1").await);
        assert!(!csrf.validate(Some(""), "session-1").await);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let csrf = manager(Duration::from_secs(3600));
        assert!(!csrf.validate(Some("deadbeef"), "session-1").await);
    }

    #[tokio::test]
    async fn garbage_multibyte_token_is_rejected_not_a_panic() {
        // The unknown-token warn path logs a truncated prefix; a byte-indexed
        // truncation would panic inside the fifth character here.
        let _ = tracing_subscriber::fmt().try_init();
        let csrf = manager(Duration::from_secs(3600));
        assert!(!csrf.validate(Some("aaaa€€"), "session-1").await);
        assert!(!csrf.validate(Some("€"), "session-1").await);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_evicted() {
        let csrf = manager(Duration::from_millis(20));
        let token = csrf.issue("session-1").await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(!csrf.validate(Some(&token), "session-1").await);
        assert!(!csrf.tokens.read().await.contains_key(&token));
    }

    #[tokio::test]
    async fn token_is_bound_to_its_session() {
        let csrf = manager(Duration::from_secs(3600));
        let token = csrf.issue("session-1").await;
        assert!(!csrf.validate(Some(&token), "session-2").await);
        // Still valid for the owning session.
        assert!(csrf.validate(Some(&token), "session-1").await);
    }

    #[tokio::test]
    async fn issue_sweeps_expired_tokens() {
        let csrf = manager(Duration::from_millis(20));
        let stale = csrf.issue("session-1").await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        let _fresh = csrf.issue("session-1").await;

        let tokens = csrf.tokens.read().await;
        assert!(!tokens.contains_key(&stale));
        assert_eq!(tokens.len(), 1);
    }

    #[tokio::test]
    async fn tokens_are_unique() {
        let csrf = manager(Duration::from_secs(3600));
        let a = csrf.issue("s").await;
        let b = csrf.issue("s").await;
        assert_ne!(a, b);
    }
}
