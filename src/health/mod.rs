/*!
 * # Health Check Module
 *
 * - Liveness (`/health`) - process is up, never touches the store
 * - Readiness (`/health/ready`) - pings the store, 503 when unreachable
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Simple health check response that doesn't require state
pub async fn simple_health_check() -> impl IntoResponse {
    debug!("Health check endpoint called");

    (
        StatusCode::OK,
        Json(json!({
            "status": HealthStatus::Up,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Readiness check endpoint
pub async fn readiness_check(State(db): State<Arc<DatabaseConnection>>) -> impl IntoResponse {
    let start = Instant::now();
    let (status_code, status) = match crate::db::check_connection(&db).await {
        Ok(()) => (StatusCode::OK, HealthStatus::Up),
        Err(e) => {
            error!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Down)
        }
    };

    (
        status_code,
        Json(json!({
            "ready": status == HealthStatus::Up,
            "database": status,
            "latency_ms": start.elapsed().as_millis() as u64,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Health routes, meant to be nested under `/health`.
pub fn health_routes<S>(db: Arc<DatabaseConnection>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(simple_health_check))
        .route("/ready", get(readiness_check))
        .with_state(db)
}
