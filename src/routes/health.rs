//! Health and readiness endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: CheckStatus,
    /// Number of ruptures held in memory; informational only
    pub cached_ruptures: usize,
}

#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub healthy: bool,
    pub message: String,
}

/// GET /health
///
/// Liveness only; does not touch the database
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /ready
///
/// 200 while the rupture database answers, 503 otherwise
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let db_check = match state.db.ping().await {
        Ok(()) => CheckStatus {
            healthy: true,
            message: "Connected".to_string(),
        },
        Err(e) => CheckStatus {
            healthy: false,
            message: format!("Connection failed: {}", e),
        },
    };

    let (status, status_code) = if db_check.healthy {
        ("ready", StatusCode::OK)
    } else {
        ("not_ready", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        status_code,
        Json(ReadinessResponse {
            status,
            checks: ReadinessChecks {
                database: db_check,
                cached_ruptures: state.cache.len(),
            },
        }),
    )
}
