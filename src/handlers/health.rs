//! Liveness probe for load balancers and uptime checks.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,

    /// `postgres` or `memory`
    pub store: &'static str,

    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// `GET /health`
///
/// Pings the store (`SELECT 1` on PostgreSQL) and reports which backend is in use.
///
/// ```json
/// {
///   "status": "healthy",
///   "store": "postgres",
///   "version": "0.1.0",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// An unreachable database surfaces as the standard 500 error body.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.store.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        store: if state.config.uses_memory_store() {
            "memory"
        } else {
            "postgres"
        },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    }))
}
