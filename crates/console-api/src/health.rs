//! Health Check Module
//!
//! Provides Kubernetes-compatible health endpoints:
//! - `/health` - Basic health check (returns "ok")
//! - `/ready` - Readiness probe (checks Databricks reachability)
//! - `/live` - Liveness probe (always returns healthy if the process is running)

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::AppState;

/// Health check response with detailed status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub databricks: Option<ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but vendor-backed routes will fail
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Basic health check - always returns "ok" if the server is running
pub async fn health_check() -> &'static str {
    "ok"
}

/// Liveness probe - indicates if the application is running
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: HealthStatus::Healthy,
            databricks: None,
            message: Some("Service is alive".to_string()),
        }),
    )
}

/// Readiness probe - verifies the workspace answers an authenticated call.
///
/// An unconfigured workspace reports `degraded` with 200 so the console
/// stays reachable for login and configuration checks.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = std::time::Instant::now();

    let databricks = match check_databricks(&state).await {
        Ok(latency_ms) => ComponentHealth {
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            message: None,
        },
        Err((status, message)) => ComponentHealth {
            status,
            latency_ms: None,
            message: Some(message),
        },
    };

    let overall_status = databricks.status;
    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let response = HealthResponse {
        status: overall_status,
        databricks: Some(databricks),
        message: Some(match overall_status {
            HealthStatus::Healthy => "Service is ready".to_string(),
            HealthStatus::Degraded => "Databricks is not configured".to_string(),
            HealthStatus::Unhealthy => "Service is not ready".to_string(),
        }),
    };

    tracing::debug!(
        status = ?overall_status,
        latency_ms = start.elapsed().as_millis(),
        "Readiness check completed"
    );

    (status_code, Json(response))
}

async fn check_databricks(state: &AppState) -> Result<u64, (HealthStatus, String)> {
    let start = std::time::Instant::now();
    let client = state
        .client()
        .map_err(|e| (HealthStatus::Degraded, e.to_string()))?;

    client
        .current_user()
        .await
        .map_err(|e| (HealthStatus::Unhealthy, format!("Databricks check failed: {}", e)))?;

    Ok(start.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let result = health_check().await;
        assert_eq!(result, "ok");
    }
}
