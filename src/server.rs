//! HTTP surface for gcore-dns01
//!
//! Exposes the present/cleanup webhook calls plus health and Prometheus
//! endpoints on one axum router.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};
use zeroize::Zeroizing;

use crate::challenge::{ChallengeRequest, ChallengeSolver};
use crate::config::redact_secret;
use crate::error::{ChallengeError, ErrorKind};
use crate::metrics;
use crate::reconciler::Reconciled;

//==============================================================================
// Types
//==============================================================================

/// Counters behind `GET /health`
#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub operations_total: u64,
    pub failures_total: u64,
    pub consecutive_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
}

/// Shared state of the HTTP surface
pub struct ServerState {
    solver: ChallengeSolver,
    stats: Mutex<Stats>,
    api_token: Zeroizing<String>,
}

impl ServerState {
    /// `api_token` is only used to scrub error text before it is returned
    pub fn new(solver: ChallengeSolver, api_token: &str) -> Self {
        Self {
            solver,
            stats: Mutex::new(Stats::default()),
            api_token: Zeroizing::new(api_token.to_string()),
        }
    }

    pub async fn stats(&self) -> Stats {
        self.stats.lock().await.clone()
    }

    async fn record_success(&self, operation: &str, outcome: Reconciled) {
        let mut stats = self.stats.lock().await;
        stats.operations_total += 1;
        stats.consecutive_failures = 0;
        stats.last_success = Some(Utc::now());
        metrics::record_operation(operation, outcome.as_str());
        metrics::set_consecutive_failures(0);
    }

    async fn record_failure(&self, operation: &str, kind: ErrorKind) {
        let mut stats = self.stats.lock().await;
        stats.operations_total += 1;
        stats.failures_total += 1;
        stats.consecutive_failures += 1;
        metrics::record_error(operation, kind.as_str());
        metrics::set_consecutive_failures(stats.consecutive_failures);
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded"
    pub status: String,
    /// False while the most recent operation failed
    pub healthy: bool,
    pub operations_total: u64,
    pub failures_total: u64,
    pub consecutive_failures: u64,
    /// Time since last successful operation (in seconds, or null if none yet)
    pub last_success_seconds_ago: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChallengeOp {
    Present,
    Cleanup,
}

impl ChallengeOp {
    fn as_str(&self) -> &'static str {
        match self {
            ChallengeOp::Present => "present",
            ChallengeOp::Cleanup => "cleanup",
        }
    }
}

#[derive(Debug, Serialize)]
struct OperationResponse {
    status: &'static str,
    outcome: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: &'static str,
    kind: &'static str,
    error: String,
}

//==============================================================================
// Router
//==============================================================================

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/present", post(present_handler))
        .route("/cleanup", post(cleanup_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serves the router on `addr` until SIGTERM or Ctrl-C
pub async fn serve(addr: SocketAddr, state: Arc<ServerState>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind listener at {}", addr))?;
    info!(
        "Listening on {} (provider: {})",
        addr,
        state.solver.provider_name()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn shutdown_signal() {
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

//==============================================================================
// Handlers
//==============================================================================

async fn present_handler(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Response {
    run_operation(&state, ChallengeOp::Present, payload).await
}

async fn cleanup_handler(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Response {
    run_operation(&state, ChallengeOp::Cleanup, payload).await
}

async fn run_operation(
    state: &ServerState,
    operation: ChallengeOp,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(request)) => match operation {
            ChallengeOp::Present => state.solver.present(&request).await,
            ChallengeOp::Cleanup => state.solver.cleanup(&request).await,
        },
        Err(rejection) => Err(ChallengeError::MalformedRequest(rejection.body_text())),
    };

    match result {
        Ok(outcome) => {
            state.record_success(operation.as_str(), outcome).await;
            (
                StatusCode::OK,
                Json(OperationResponse {
                    status: "ok",
                    outcome: outcome.as_str(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            let kind = e.kind();
            let message = redact_secret(&e.to_string(), state.api_token.as_str());
            error!("{} failed ({}): {}", operation.as_str(), kind, message);
            state.record_failure(operation.as_str(), kind).await;
            (
                status_for(kind),
                Json(ErrorResponse {
                    status: "error",
                    kind: kind.as_str(),
                    error: message,
                }),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let stats = state.stats().await;
    Json(build_health(&stats))
}

async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

//==============================================================================
// Helpers
//==============================================================================

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MalformedRequest => StatusCode::BAD_REQUEST,
        ErrorKind::ZoneNotFound => StatusCode::NOT_FOUND,
        ErrorKind::RecordSetConflict => StatusCode::CONFLICT,
        ErrorKind::ProviderRejected => StatusCode::BAD_GATEWAY,
        ErrorKind::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn build_health(stats: &Stats) -> HealthResponse {
    let healthy = stats.consecutive_failures == 0;
    let last_success_seconds_ago = stats.last_success.map(|ts| {
        let seconds = (Utc::now() - ts).num_seconds();
        seconds.max(0) as f64
    });

    HealthResponse {
        status: if healthy { "ok".to_string() } else { "degraded".to_string() },
        healthy,
        operations_total: stats.operations_total,
        failures_total: stats.failures_total,
        consecutive_failures: stats.consecutive_failures,
        last_success_seconds_ago,
    }
}

//==============================================================================
// Tests
//==============================================================================
