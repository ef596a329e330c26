//! Workspace snapshot served by the dashboard endpoint.
//!
//! Every chart array carries at least one row: empty series are replaced by a
//! single `NO_DATA` placeholder so the front end never special-cases empty
//! charts or error responses.

use crate::TimeFilter;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Name used by placeholder chart rows.
pub const NO_DATA: &str = "No Data";

/// A single named value in a chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub name: String,
    pub value: u64,
}

impl ChartPoint {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// The `{ name: "No Data", value: 1 }` row.
    pub fn placeholder() -> Self {
        Self::new(NO_DATA, 1)
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == NO_DATA
    }
}

/// Replace an empty series with the placeholder row.
pub fn with_placeholder(points: Vec<ChartPoint>) -> Vec<ChartPoint> {
    if points.is_empty() {
        vec![ChartPoint::placeholder()]
    } else {
        points
    }
}

/// One day of the usage time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePoint {
    /// Day label, e.g. "Oct 19"
    pub date: String,
    /// Activity rows that started during the day
    pub queries: u64,
    /// Synthetic storage estimate
    pub storage: u64,
}

/// A row of the recent activity table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentQuery {
    pub id: String,
    pub query: String,
    pub user: String,
    pub source: String,
    pub status: String,
    /// Relative start time ("5 minutes ago")
    pub start_time: String,
    /// Human readable duration ("1.25s")
    pub duration: String,
    pub started_at_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegeDistribution {
    pub total_grants: u64,
    pub distribution: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPerformance {
    /// Mean duration in seconds
    pub avg_duration: f64,
    /// Percentage of finished rows
    pub success_rate: f64,
    pub total_queries: u64,
}

/// Unity Catalog readiness percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessScores {
    pub cluster: f64,
    pub table: f64,
    pub job: f64,
    pub permission: f64,
    pub overall: f64,
}

/// Illustrative cost figures derived from activity and storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub compute_hours: f64,
    pub estimated_dbus: f64,
    pub estimated_cost_usd: f64,
}

/// Dashboard payload for one time filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub total_catalogs: u64,
    pub total_schemas: u64,
    pub total_tables: u64,
    pub total_views: u64,
    pub total_users: u64,
    pub active_users: u64,
    pub storage_locations: u64,
    pub total_jobs: u64,
    pub readiness: ReadinessScores,
    pub catalog_data: Vec<ChartPoint>,
    pub table_data: Vec<ChartPoint>,
    pub storage_by_type: Vec<ChartPoint>,
    pub usage_data: Vec<UsagePoint>,
    pub recent_queries: Vec<RecentQuery>,
    pub privilege_distribution: PrivilegeDistribution,
    pub query_performance: QueryPerformance,
    pub sensitive_data_accesses: u64,
    pub cost_estimate: CostEstimate,
    pub time_filter: TimeFilter,
    pub generated_at: DateTime<Utc>,
}

impl WorkspaceSnapshot {
    /// Zero-valued snapshot with the same shape as a successful one.
    pub fn zeroed(time_filter: TimeFilter, now: DateTime<Utc>) -> Self {
        let usage_data = day_starts(time_filter.days(), now)
            .into_iter()
            .map(|start| UsagePoint {
                date: day_label(start),
                queries: 0,
                storage: 0,
            })
            .collect();

        Self {
            total_catalogs: 0,
            total_schemas: 0,
            total_tables: 0,
            total_views: 0,
            total_users: 0,
            active_users: 0,
            storage_locations: 0,
            total_jobs: 0,
            readiness: ReadinessScores::default(),
            catalog_data: vec![ChartPoint::placeholder()],
            table_data: vec![ChartPoint::placeholder()],
            storage_by_type: vec![ChartPoint::placeholder()],
            usage_data,
            recent_queries: vec![RecentQuery::no_history(now)],
            privilege_distribution: PrivilegeDistribution {
                total_grants: 0,
                distribution: vec![ChartPoint::placeholder()],
            },
            query_performance: QueryPerformance::default(),
            sensitive_data_accesses: 0,
            cost_estimate: CostEstimate::default(),
            time_filter,
            generated_at: now,
        }
    }

    /// Apply the placeholder contract to every chart array.
    pub fn ensure_placeholders(&mut self) {
        self.catalog_data = with_placeholder(std::mem::take(&mut self.catalog_data));
        self.table_data = with_placeholder(std::mem::take(&mut self.table_data));
        self.storage_by_type = with_placeholder(std::mem::take(&mut self.storage_by_type));
        self.privilege_distribution.distribution =
            with_placeholder(std::mem::take(&mut self.privilege_distribution.distribution));
        if self.recent_queries.is_empty() {
            self.recent_queries.push(RecentQuery::no_history(self.generated_at));
        }
    }
}

impl RecentQuery {
    /// Row shown when no activity source produced anything.
    pub fn no_history(now: DateTime<Utc>) -> Self {
        Self {
            id: "no-history".to_string(),
            query: "No query history available".to_string(),
            user: "system".to_string(),
            source: "system".to_string(),
            status: "N/A".to_string(),
            start_time: "just now".to_string(),
            duration: "0s".to_string(),
            started_at_ms: now.timestamp_millis(),
        }
    }
}

/// UTC midnights of the last `days` calendar days, oldest first.
pub fn day_starts(days: u32, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let today = now.date_naive();
    (0..days)
        .rev()
        .map(|offset| {
            let day = today - Duration::days(i64::from(offset));
            Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .collect()
}

/// Short label for a usage bucket.
pub fn day_label(day_start: DateTime<Utc>) -> String {
    day_start.format("%b %d").to_string()
}
