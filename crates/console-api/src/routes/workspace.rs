//! Workspace dashboard routes.

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use unity_console_core::{ReadinessScores, TimeFilter, WorkspaceSnapshot};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub time_filter: Option<String>,
}

impl StatsQuery {
    pub fn time_filter(&self) -> ApiResult<TimeFilter> {
        match self.time_filter.as_deref().map(str::trim) {
            None | Some("") => Ok(TimeFilter::default()),
            Some(raw) => Ok(raw.parse::<TimeFilter>()?),
        }
    }
}

/// Snapshot for `time_filter`, served from the cache while fresh.
///
/// Only successful aggregations are stored.
pub async fn cached_snapshot(state: &AppState, time_filter: TimeFilter) -> ApiResult<WorkspaceSnapshot> {
    let aggregator = state.aggregator()?;
    if let Some(snapshot) = state.stats_cache.get(time_filter).await {
        return Ok(snapshot);
    }

    let snapshot = aggregator
        .collect(time_filter)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    state.stats_cache.put(time_filter, snapshot.clone()).await;
    Ok(snapshot)
}

/// `GET /api/workspace/stats?timeFilter=day|week|month`
///
/// A top-level failure still answers with the zero snapshot so the dashboard
/// keeps its shape, plus an `error` string.
pub async fn workspace_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Response {
    let time_filter = match query.time_filter() {
        Ok(tf) => tf,
        Err(e) => return e.into_response(),
    };

    match cached_snapshot(&state, time_filter).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            tracing::error!(time_filter = %time_filter, error = %e, "Workspace stats failed");
            let zeroed = WorkspaceSnapshot::zeroed(time_filter, state.clock.now());
            let mut body = serde_json::to_value(&zeroed).unwrap_or_else(|_| json!({}));
            if let Value::Object(map) = &mut body {
                map.insert("error".to_string(), Value::String(e.to_string()));
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

pub async fn readiness(State(state): State<AppState>) -> ApiResult<Json<ReadinessScores>> {
    let scores = state
        .aggregator()?
        .readiness()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(scores))
}
