// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics for the admin write path.
//!
//! Three counter families: login attempts by outcome, write operations by
//! operation and outcome, and rendered previews. All metrics live in a
//! private registry so the `/metrics` endpoint exposes only what this
//! service records.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct AppMetrics {
    registry: Registry,
    login_attempts: IntCounterVec,
    write_operations: IntCounterVec,
    previews_rendered: IntCounter,
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let login_attempts = IntCounterVec::new(
            Opts::new("cms_login_attempts_total", "Login attempts by outcome"),
            &["outcome"],
        )?;
        let write_operations = IntCounterVec::new(
            Opts::new(
                "cms_write_operations_total",
                "Content write operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        let previews_rendered = IntCounter::new(
            "cms_previews_rendered_total",
            "Markdown previews rendered",
        )?;

        registry.register(Box::new(login_attempts.clone()))?;
        registry.register(Box::new(write_operations.clone()))?;
        registry.register(Box::new(previews_rendered.clone()))?;

        Ok(Self {
            registry,
            login_attempts,
            write_operations,
            previews_rendered,
        })
    }

    /// `outcome` is one of `success`, `failure`, `rate_limited`.
    pub fn record_login(&self, outcome: &str) {
        self.login_attempts.with_label_values(&[outcome]).inc();
    }

    /// `operation` is `create`, `update` or `delete`; `outcome` is the error
    /// class (`success`, `validation`, `forbidden`, `conflict`, ...).
    pub fn record_write(&self, operation: &str, outcome: &str) {
        self.write_operations
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn record_preview(&self) {
        self.previews_rendered.inc();
    }

    /// Encode the registry in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("metrics output is not UTF-8: {e}")))
    }
}
