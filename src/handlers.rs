// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP handlers for the admin content API.
//!
//! Session identity arrives in `x-session-id` / `x-session-role` headers set
//! by the upstream session provider; this service trusts them and enforces
//! everything else: rate limits, CSRF, schema validation and sanitization.
//! The CSRF token rides in `x-csrf-token` on every mutating request.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::CredentialVerifier;
use crate::config::Config;
use crate::csrf::CsrfTokenManager;
use crate::error::{AppError, Result};
use crate::github::GitHubStore;
use crate::limiter::RateLimiter;
use crate::manager::{ContentManager, RequestContext, Session, WriteReceipt};
use crate::markdown::MarkdownRenderer;
use crate::metrics::AppMetrics;
use crate::store::VersionedStore;
use crate::validator::ContentKind;

pub const SESSION_ID_HEADER: &str = "x-session-id";
pub const SESSION_ROLE_HEADER: &str = "x-session-role";
pub const CSRF_TOKEN_HEADER: &str = "x-csrf-token";

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub manager: ContentManager,
    pub login_limiter: RateLimiter,
    pub api_limiter: Arc<RateLimiter>,
    pub csrf: Arc<CsrfTokenManager>,
    pub verifier: CredentialVerifier,
    pub renderer: Arc<MarkdownRenderer>,
    pub metrics: AppMetrics,
}

impl AppState {
    /// Build state around any store implementation.
    pub fn with_store(
        config: Config,
        store: Arc<dyn VersionedStore>,
        metrics: AppMetrics,
    ) -> Self {
        let api_limiter = Arc::new(RateLimiter::for_api(&config.security));
        let csrf = Arc::new(CsrfTokenManager::new(config.security.csrf_lifetime()));
        let manager = ContentManager::new(store, api_limiter.clone(), csrf.clone());
        Self {
            login_limiter: RateLimiter::for_login(&config.security),
            verifier: CredentialVerifier::new(config.auth.clone()),
            renderer: Arc::new(MarkdownRenderer::new()),
            manager,
            api_limiter,
            csrf,
            metrics,
            config,
        }
    }

    /// Production state backed by the GitHub contents API.
    pub fn new(config: Config, metrics: AppMetrics) -> Self {
        let store = Arc::new(GitHubStore::new(config.github.clone()));
        Self::with_store(config, store, metrics)
    }
}

/// Build the service router. Routes are fixed except `/metrics`, which is
/// mounted only when enabled.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/csrf", get(csrf_token))
        .route("/api/markdown", post(preview))
        .route("/api/content/:kind", post(create_content))
        .route("/api/content/:kind/:slug", put(update_content).delete(delete_content));

    if state.config.metrics.enabled {
        app = app.route(state.config.metrics.path.as_str(), get(metrics_text));
    }

    app.with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "markdown-cms",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub totp_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub username: String,
}

/// Verify admin credentials. Rate limited per client address before any
/// credential work happens; all credential failures look identical.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let client_key = addr.ip().to_string();
    if state.login_limiter.is_limited(&client_key).await {
        state.metrics.record_login("rate_limited");
        return Err(AppError::RateLimited);
    }

    if !state.verifier.verify(&req.username, &req.password) {
        info!(username = %req.username, client = %client_key, "login rejected");
        state.metrics.record_login("failure");
        return Err(AppError::Auth);
    }

    if state.verifier.second_factor_enabled() {
        let code = req.totp_code.as_deref().unwrap_or_default();
        if !state.verifier.verify_second_factor(code) {
            info!(username = %req.username, client = %client_key, "second factor rejected");
            state.metrics.record_login("failure");
            return Err(AppError::Auth);
        }
    }

    info!(username = %req.username, "login succeeded");
    state.metrics.record_login("success");
    Ok(Json(LoginResponse {
        success: true,
        username: req.username,
    }))
}

#[derive(Debug, Serialize)]
pub struct CsrfResponse {
    pub csrf_token: String,
}

/// Issue a CSRF token bound to the caller's session.
pub async fn csrf_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CsrfResponse>> {
    let session = session_from_headers(&headers).ok_or(AppError::Auth)?;
    let token = state.csrf.issue(&session.id).await;
    Ok(Json(CsrfResponse { csrf_token: token }))
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub markdown: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub html: String,
}

/// Render a markdown preview through the full pipeline plus the sanitizer.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>> {
    if state.api_limiter.is_limited(&addr.ip().to_string()).await {
        return Err(AppError::RateLimited);
    }
    let session = session_from_headers(&headers).ok_or(AppError::Auth)?;
    if !session.is_admin() {
        return Err(AppError::Forbidden);
    }

    debug!(bytes = req.markdown.len(), "rendering preview");
    let html = state.renderer.render_sanitized(&req.markdown);
    state.metrics.record_preview();
    Ok(Json(PreviewResponse { html }))
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub success: bool,
    #[serde(flatten)]
    pub receipt: WriteReceipt,
}

pub async fn create_content(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let Some(kind) = parse_kind(&kind) else {
        return unknown_kind(&kind);
    };
    let ctx = request_context(addr, &headers);
    let result = state.manager.create(&ctx, kind, &payload).await;
    state.metrics.record_write("create", outcome(&result));
    match result {
        Ok(receipt) => (
            StatusCode::CREATED,
            Json(WriteResponse {
                success: true,
                receipt,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_content(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path((kind, slug)): Path<(String, String)>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let Some(kind) = parse_kind(&kind) else {
        return unknown_kind(&kind);
    };
    let ctx = request_context(addr, &headers);
    let result = state.manager.update(&ctx, kind, &slug, &payload).await;
    state.metrics.record_write("update", outcome(&result));
    match result {
        Ok(receipt) => Json(WriteResponse {
            success: true,
            receipt,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_content(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path((kind, slug)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let Some(kind) = parse_kind(&kind) else {
        return unknown_kind(&kind);
    };
    let ctx = request_context(addr, &headers);
    let result = state.manager.delete(&ctx, kind, &slug).await;
    state.metrics.record_write("delete", outcome(&result));
    match result {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Prometheus text exposition.
pub async fn metrics_text(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.encode_text() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => AppError::Internal(format!("metrics encoding failed: {err}")).into_response(),
    }
}

/// Metrics label for a write outcome.
fn outcome<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AppError::Validation(_)) => "validation",
        Err(AppError::Auth) => "unauthorized",
        Err(AppError::Forbidden) => "forbidden",
        Err(AppError::RateLimited) => "rate_limited",
        Err(AppError::Conflict(_)) => "conflict",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::RemoteStore { .. } | AppError::Internal(_)) => "error",
    }
}

fn parse_kind(kind: &str) -> Option<ContentKind> {
    ContentKind::parse(kind)
}

fn unknown_kind(kind: &str) -> Response {
    warn!(kind, "unknown content kind");
    AppError::NotFound(format!("content kind {kind}")).into_response()
}

fn request_context(addr: SocketAddr, headers: &HeaderMap) -> RequestContext {
    RequestContext {
        client_key: addr.ip().to_string(),
        session: session_from_headers(headers),
        csrf_token: header_value(headers, CSRF_TOKEN_HEADER),
    }
}

fn session_from_headers(headers: &HeaderMap) -> Option<Session> {
    let id = header_value(headers, SESSION_ID_HEADER)?;
    Some(Session {
        id,
        role: header_value(headers, SESSION_ROLE_HEADER).unwrap_or_default(),
    })
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
