// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Admin credential verification.
//!
//! Username comparison is an exact match against configuration; the password
//! is checked against a stored bcrypt hash. Every failure mode (missing
//! configuration, mismatch, hash error) yields `false`, never an error, so
//! the login path cannot be distinguished by failure shape.
//!
//! The optional second factor is RFC 6238 TOTP (SHA-1, 30 second step,
//! 6 digits) with a tolerance of one step before and after the current time
//! to absorb clock drift.

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::config::AuthConfig;

type HmacSha1 = Hmac<Sha1>;

const TOTP_STEP_SECS: u64 = 30;
const TOTP_DIGITS: u32 = 6;
const TOTP_DRIFT_STEPS: i64 = 1;

/// Verifies admin credentials and the optional TOTP second factor.
pub struct CredentialVerifier {
    config: AuthConfig,
}

impl CredentialVerifier {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Whether a TOTP secret is configured for this deployment.
    pub fn second_factor_enabled(&self) -> bool {
        self.config
            .totp_secret
            .as_ref()
            .is_some_and(|s| !s.is_empty())
    }

    /// Check a username/password pair. Never errors.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            debug!("missing username or password");
            return false;
        }
        if self.config.admin_username.is_empty() || self.config.admin_password_hash.is_empty() {
            warn!("admin credentials not configured");
            return false;
        }
        if username != self.config.admin_username {
            debug!("username mismatch");
            return false;
        }
        match bcrypt::verify(password, &self.config.admin_password_hash) {
            Ok(matched) => matched,
            Err(err) => {
                warn!(error = %err, "password hash comparison failed");
                false
            }
        }
    }

    /// Check a time-based one-time code against the shared secret.
    pub fn verify_second_factor(&self, code: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.verify_second_factor_at(code, now)
    }

    fn verify_second_factor_at(&self, code: &str, unix_secs: u64) -> bool {
        if code.is_empty() {
            return false;
        }
        let Some(secret) = self.config.totp_secret.as_deref().filter(|s| !s.is_empty()) else {
            warn!("second factor checked without a configured secret");
            return false;
        };
        let Some(key) = decode_base32(secret) else {
            warn!("TOTP secret is not valid base32");
            return false;
        };

        let step = (unix_secs / TOTP_STEP_SECS) as i64;
        (-TOTP_DRIFT_STEPS..=TOTP_DRIFT_STEPS).any(|drift| {
            let counter = step + drift;
            counter >= 0 && totp_code(&key, counter as u64) == code
        })
    }
}

fn decode_base32(secret: &str) -> Option<Vec<u8>> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    BASE32_NOPAD.decode(normalized.as_bytes()).ok()
}

/// RFC 4226 dynamic truncation over HMAC-SHA1.
fn totp_code(key: &[u8], counter: u64) -> String {
    let Ok(mut mac) = HmacSha1::new_from_slice(key) else {
        return String::new();
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((u32::from(digest[offset]) & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);
    let code = binary % 10u32.pow(TOTP_DIGITS);
    format!("{code:06}")
}
