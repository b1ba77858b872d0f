//! Moodlog HTTP REST API
//!
//! Axum-based HTTP server for submitting and reading journal entries.
//!
//! Each endpoint has a thin axum handler that delegates to an inner function
//! returning `(StatusCode, serde_json::Value)`; the inner functions are tested
//! directly without going through the router.
//!
//! Endpoints:
//! - POST /api/entry   : analyze and store an entry
//! - GET  /api/entries : timeline, newest first, with optional filters
//! - GET  /api/stats   : aggregate mood statistics
//! - POST /api/analyze : analyze text without storing it
//! - GET  /api/health  : health check with store status
//! - GET  /version     : server version info

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use moodlog_core::{
    AnalysisInput, EntryFilter, InferenceStage, JournalStore, Mood, MoodStats, MoodlogConfig,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::subsystems::submit::{submit_entry, SubmitError};

/// Owner used when a request does not name one.
pub const DEFAULT_OWNER: &str = "local";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub stage: InferenceStage,
    pub store: Arc<dyn JournalStore>,
    pub config: MoodlogConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/api/entry", post(entry_handler))
        .route("/api/entries", get(entries_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/health", get(health_handler))
        .route("/version", get(version_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Moodlog HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct EntryRequest {
    pub text: Option<String>,
    pub title: Option<String>,
    pub owner_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AnalyzeRequest {
    pub text: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EntriesQuery {
    pub owner_id: Option<String>,
    pub mood: Option<String>,
    pub tag: Option<String>,
    pub q: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct OwnerQuery {
    pub owner_id: Option<String>,
}

fn error_body(msg: impl Into<String>) -> serde_json::Value {
    serde_json::json!({
        "error": msg.into(),
        "status": "error",
    })
}

fn owner_or_default(owner_id: Option<String>) -> String {
    owner_id
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .unwrap_or_else(|| DEFAULT_OWNER.to_string())
}

fn input_from(text: Option<String>, title: Option<String>) -> Option<AnalysisInput> {
    let text = text.filter(|t| !t.trim().is_empty())?;
    Some(AnalysisInput { title, text })
}

fn parse_timestamp(field: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>, String> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| format!("invalid '{}' timestamp '{}': {}", field, s, e)),
    }
}

/// Translate query parameters into an `EntryFilter`.
pub fn filter_from_query(query: EntriesQuery) -> Result<EntryFilter, String> {
    let mood = match query.mood.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(m) => Some(m.parse::<Mood>().map_err(|e| e.to_string())?),
    };

    Ok(EntryFilter {
        mood,
        tag: query.tag.filter(|t| !t.trim().is_empty()),
        since: parse_timestamp("since", query.since)?,
        until: parse_timestamp("until", query.until)?,
        query: query.q.filter(|q| !q.trim().is_empty()),
    })
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner entry submission: validates, analyzes, stores.
pub async fn entry_inner(state: &HttpState, req: EntryRequest) -> (StatusCode, serde_json::Value) {
    let Some(input) = input_from(req.text, req.title) else {
        return (
            StatusCode::BAD_REQUEST,
            error_body("Journal entry text is required"),
        );
    };
    let owner = owner_or_default(req.owner_id);

    match submit_entry(&state.stage, state.store.as_ref(), &owner, input).await {
        Ok(entry) => (
            StatusCode::OK,
            serde_json::to_value(&entry).unwrap_or_else(|e| error_body(e.to_string())),
        ),
        Err(SubmitError::InvalidInput(e)) => (StatusCode::BAD_REQUEST, error_body(e.to_string())),
        Err(SubmitError::Store(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body("Failed to process journal entry"),
        ),
    }
}

/// Inner timeline: lists an owner's entries, newest first, then filters.
pub async fn entries_inner(
    state: &HttpState,
    query: EntriesQuery,
) -> (StatusCode, serde_json::Value) {
    let owner = owner_or_default(query.owner_id.clone());
    let filter = match filter_from_query(query) {
        Ok(f) => f,
        Err(e) => return (StatusCode::BAD_REQUEST, error_body(e)),
    };

    match state.store.list(&owner).await {
        Ok(entries) => {
            let entries = filter.apply(entries);
            (
                StatusCode::OK,
                serde_json::json!({
                    "entries": entries,
                    "count": entries.len(),
                }),
            )
        }
        Err(e) => {
            tracing::error!(owner = %owner, error = %e, "Error fetching entries");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(e.to_string()))
        }
    }
}

/// Inner stats: aggregates over all of an owner's entries.
pub async fn stats_inner(state: &HttpState, query: OwnerQuery) -> (StatusCode, serde_json::Value) {
    let owner = owner_or_default(query.owner_id);
    match state.store.list(&owner).await {
        Ok(entries) => {
            let stats = MoodStats::from_entries(&entries);
            (
                StatusCode::OK,
                serde_json::to_value(&stats).unwrap_or_else(|e| error_body(e.to_string())),
            )
        }
        Err(e) => {
            tracing::error!(owner = %owner, error = %e, "Error computing stats");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(e.to_string()))
        }
    }
}

/// Inner analyze: runs the pipeline without storing anything.
pub async fn analyze_inner(
    state: &HttpState,
    req: AnalyzeRequest,
) -> (StatusCode, serde_json::Value) {
    let Some(input) = input_from(req.text, req.title) else {
        return (
            StatusCode::BAD_REQUEST,
            error_body("Journal entry text is required"),
        );
    };

    match state.stage.analyze(&input).await {
        Ok(result) => (
            StatusCode::OK,
            serde_json::to_value(&result).unwrap_or_else(|e| error_body(e.to_string())),
        ),
        Err(e) => (StatusCode::BAD_REQUEST, error_body(e.to_string())),
    }
}

/// Inner health check: reports store status and analysis mode.
pub async fn health_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let analysis = state.stage.remote_name().unwrap_or("fallback-only");
    match state.store.health().await {
        Ok(store) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "OK",
                "message": "Moodlog API is running",
                "version": env!("CARGO_PKG_VERSION"),
                "store": store,
                "analysis": analysis,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
                "analysis": analysis,
            }),
        ),
    }
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "moods": Mood::ALL.iter().map(Mood::as_str).collect::<Vec<_>>(),
    })
}

// ============================================================================
// Axum handlers: thin wrappers around inner functions
// ============================================================================

async fn entry_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<EntryRequest>,
) -> impl IntoResponse {
    let (status, body) = entry_inner(&state, req).await;
    (status, Json(body))
}

async fn entries_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<EntriesQuery>,
) -> impl IntoResponse {
    let (status, body) = entries_inner(&state, query).await;
    (status, Json(body))
}

async fn stats_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<OwnerQuery>,
) -> impl IntoResponse {
    let (status, body) = stats_inner(&state, query).await;
    (status, Json(body))
}

async fn analyze_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    let (status, body) = analyze_inner(&state, req).await;
    (status, Json(body))
}

async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

async fn version_handler() -> impl IntoResponse {
    Json(version_inner())
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
