//! Workspace snapshot aggregation.
//!
//! The catalog list and the user count are fetched first; either failing
//! aborts the snapshot. Everything after that is isolated per branch: a
//! failed schema listing, table page, permission fetch or activity source is
//! logged, counted and contributes zero while its siblings continue.

use super::collectors::{self, ClusterStats, CollectorResult, JobStats};
use super::{
    privilege_bucket, round_to, storage_type, storage_units, FanOutLimiter, StorageType,
    OTHER_BUCKET, PRIVILEGE_BUCKETS,
};
use crate::clock::SharedClock;
use crate::metrics;
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use unity_console_client::{
    Catalog, ClientError, PermissionsList, SecurableType, SharedClient, Table,
};
use unity_console_core::snapshot::{day_label, day_starts};
use unity_console_core::{
    ChartPoint, CostEstimate, PrivilegeDistribution, QueryPerformance, ReadinessScores,
    RecentQuery, TimeFilter, UsagePoint, WorkspaceSnapshot,
};

const RECENT_ROWS: usize = 5;
const TOP_SCHEMAS: usize = 5;
const CLUSTER_EVENT_LIMIT: u32 = 25;
const QUERY_HISTORY_LIMIT: u32 = 100;
const MAX_QUERY_TEXT: usize = 120;
const DBUS_PER_HOUR: f64 = 2.0;
const USD_PER_DBU: f64 = 0.55;
const USD_PER_STORAGE_UNIT: f64 = 0.023;

pub const SENSITIVE_KEYWORDS: [&str; 11] = [
    "ssn",
    "social_security",
    "password",
    "credit_card",
    "card_number",
    "salary",
    "date_of_birth",
    "dob",
    "phone",
    "email",
    "pii",
];

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("Failed to list catalogs: {}", .0.vendor_message())]
    Catalogs(#[source] ClientError),

    #[error("Failed to count users: {}", .0.vendor_message())]
    Users(#[source] ClientError),
}

/// One row of activity history, from any source.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRow {
    pub id: String,
    pub text: String,
    pub user: Option<String>,
    pub source: &'static str,
    pub status: String,
    pub started_at_ms: i64,
    pub duration_ms: i64,
}

/// Schemas and tables reachable from the catalog list.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub schema_count: u64,
    pub tables: Vec<Table>,
    /// `catalog.schema` with its table count, in listing order
    pub tables_per_schema: Vec<(String, u64)>,
}

/// Everything a snapshot is computed from.
#[derive(Debug, Clone, Default)]
pub struct SnapshotInputs {
    pub catalogs: Vec<Catalog>,
    pub total_users: u64,
    pub inventory: Inventory,
    pub storage_locations: u64,
    pub jobs: JobStats,
    pub clusters: ClusterStats,
    /// Per catalog; `None` when the fetch failed
    pub permissions: Vec<Option<PermissionsList>>,
    pub activity: Vec<ActivityRow>,
}

pub struct Aggregator {
    client: SharedClient,
    limiter: FanOutLimiter,
    clock: SharedClock,
}

impl Aggregator {
    pub fn new(client: SharedClient, limiter: FanOutLimiter, clock: SharedClock) -> Self {
        Self {
            client,
            limiter,
            clock,
        }
    }

    /// Build a fresh snapshot for `time_filter`.
    pub async fn collect(&self, time_filter: TimeFilter) -> Result<WorkspaceSnapshot, AggregateError> {
        let now = self.clock.now();
        let start_ms = window_start(now, time_filter).timestamp_millis();
        let started = std::time::Instant::now();

        let (catalogs, total_users) = tokio::try_join!(
            async { self.client.list_catalogs().await.map_err(AggregateError::Catalogs) },
            async { self.client.count_users().await.map_err(AggregateError::Users) },
        )?;

        let (inventory, locations, jobs, (clusters, event_rows), permissions, run_rows, query_rows) = tokio::join!(
            self.inventory(&catalogs),
            self.limiter
                .run(collectors::count_storage_locations(&self.client)),
            self.limiter.run(collectors::collect_jobs(&self.client)),
            self.clusters_with_events(start_ms),
            self.catalog_permissions(&catalogs),
            self.job_run_activity(start_ms),
            self.query_activity(start_ms),
        );

        let mut activity = event_rows;
        activity.extend(run_rows);
        activity.extend(query_rows);

        let inputs = SnapshotInputs {
            catalogs,
            total_users,
            inventory,
            storage_locations: or_zero(locations),
            jobs: or_zero(jobs),
            clusters: or_zero(clusters),
            permissions,
            activity,
        };
        let snapshot = build_snapshot(&inputs, time_filter, now);

        tracing::info!(
            time_filter = %time_filter,
            catalogs = snapshot.total_catalogs,
            tables = snapshot.total_tables,
            activity_rows = inputs.activity.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Workspace snapshot aggregated"
        );
        Ok(snapshot)
    }

    /// Readiness scores without the activity and chart sections.
    pub async fn readiness(&self) -> Result<ReadinessScores, AggregateError> {
        let catalogs = self
            .client
            .list_catalogs()
            .await
            .map_err(AggregateError::Catalogs)?;

        let (inventory, jobs, clusters, permissions) = tokio::join!(
            self.inventory(&catalogs),
            self.limiter.run(collectors::collect_jobs(&self.client)),
            self.limiter.run(collectors::collect_clusters(&self.client)),
            self.catalog_permissions(&catalogs),
        );

        Ok(readiness_scores(
            &or_zero(clusters),
            &inventory.tables,
            &or_zero(jobs),
            &permissions,
        ))
    }

    /// Catalog -> schema -> table fan-out with per-branch isolation.
    pub async fn inventory(&self, catalogs: &[Catalog]) -> Inventory {
        let branches = catalogs.iter().map(|catalog| self.catalog_branch(&catalog.name));
        let mut inventory = Inventory::default();
        for schemas in join_all(branches).await {
            for (schema_name, tables) in schemas {
                inventory.schema_count += 1;
                inventory
                    .tables_per_schema
                    .push((schema_name, tables.iter().filter(|t| !t.is_view()).count() as u64));
                inventory.tables.extend(tables);
            }
        }
        inventory
    }

    async fn catalog_branch(&self, catalog: &str) -> Vec<(String, Vec<Table>)> {
        let schemas = match self.limiter.run(self.client.list_schemas(catalog)).await {
            Ok(schemas) => schemas,
            Err(e) => {
                tracing::warn!(catalog = %catalog, error = %e, "Schema listing failed, counting zero");
                metrics::record_collector_failure("schemas");
                return Vec::new();
            }
        };

        let branches = schemas.into_iter().map(|schema| async move {
            let full_name = format!("{}.{}", catalog, schema.name);
            let tables = match self
                .limiter
                .run(self.client.list_tables(catalog, &schema.name))
                .await
            {
                Ok(tables) => tables
                    .into_iter()
                    .map(|mut t| {
                        if t.catalog_name.is_empty() {
                            t.catalog_name = catalog.to_string();
                        }
                        if t.schema_name.is_empty() {
                            t.schema_name = schema.name.clone();
                        }
                        t
                    })
                    .collect(),
                Err(e) => {
                    tracing::warn!(schema = %full_name, error = %e, "Table listing failed, counting zero");
                    metrics::record_collector_failure("tables");
                    Vec::new()
                }
            };
            (full_name, tables)
        });
        join_all(branches).await
    }

    async fn catalog_permissions(&self, catalogs: &[Catalog]) -> Vec<Option<PermissionsList>> {
        let fetches = catalogs.iter().map(|catalog| async move {
            match self
                .limiter
                .run(self.client.get_permissions(SecurableType::Catalog, &catalog.name))
                .await
            {
                Ok(list) => Some(list),
                Err(e) => {
                    tracing::warn!(catalog = %catalog.name, error = %e, "Permission fetch failed");
                    metrics::record_collector_failure("permissions");
                    None
                }
            }
        });
        join_all(fetches).await
    }

    async fn clusters_with_events(
        &self,
        start_ms: i64,
    ) -> (CollectorResult<ClusterStats>, Vec<ActivityRow>) {
        let clusters = self
            .limiter
            .run(collectors::collect_clusters(&self.client))
            .await;
        let ids = match &clusters {
            Ok(stats) => stats.event_cluster_ids.clone(),
            Err(_) => Vec::new(),
        };

        let fetches = ids.iter().map(|id| async move {
            match self
                .limiter
                .run(self.client.cluster_events(id, Some(start_ms), CLUSTER_EVENT_LIMIT))
                .await
            {
                Ok(events) => events
                    .into_iter()
                    .filter(|e| e.timestamp >= start_ms)
                    .map(|event| ActivityRow {
                        id: format!("event-{}-{}", event.cluster_id, event.timestamp),
                        text: format!("Cluster {}: {}", id, event.kind),
                        user: event.user(),
                        source: "cluster_event",
                        status: "FINISHED".to_string(),
                        started_at_ms: event.timestamp,
                        duration_ms: 0,
                    })
                    .collect(),
                Err(e) => {
                    tracing::warn!(cluster_id = %id, error = %e, "Cluster event fetch failed");
                    metrics::record_collector_failure("cluster_events");
                    Vec::new()
                }
            }
        });
        let rows = join_all(fetches).await.into_iter().flatten().collect();
        (clusters, rows)
    }

    async fn job_run_activity(&self, start_ms: i64) -> Vec<ActivityRow> {
        match self.limiter.run(self.client.list_job_runs(start_ms)).await {
            Ok(runs) => runs
                .into_iter()
                .filter(|run| run.start_time >= start_ms)
                .map(|run| {
                    let status = match run.state.result_state.as_deref() {
                        Some("SUCCESS") => "FINISHED".to_string(),
                        Some(other) => other.to_string(),
                        None => run
                            .state
                            .life_cycle_state
                            .clone()
                            .unwrap_or_else(|| "UNKNOWN".to_string()),
                    };
                    ActivityRow {
                        id: format!("run-{}", run.run_id),
                        text: run.run_name.clone().unwrap_or_else(|| {
                            format!("Job {} run {}", run.job_id.unwrap_or_default(), run.run_id)
                        }),
                        user: run.creator_user_name.clone(),
                        source: "job_run",
                        status,
                        started_at_ms: run.start_time,
                        duration_ms: run.duration_ms(),
                    }
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Job run history unavailable");
                metrics::record_collector_failure("job_runs");
                Vec::new()
            }
        }
    }

    async fn query_activity(&self, start_ms: i64) -> Vec<ActivityRow> {
        match self
            .limiter
            .run(self.client.query_history(start_ms, QUERY_HISTORY_LIMIT))
            .await
        {
            Ok(queries) => queries
                .into_iter()
                .filter(|q| q.query_start_time_ms >= start_ms)
                .map(|q| ActivityRow {
                    id: q.query_id.clone(),
                    text: q.query_text.clone().unwrap_or_default(),
                    user: q.user_name.clone(),
                    source: "sql_query",
                    status: q.status.clone().unwrap_or_else(|| "UNKNOWN".to_string()),
                    started_at_ms: q.query_start_time_ms,
                    duration_ms: q.duration.unwrap_or(0).max(0),
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "SQL query history unavailable");
                metrics::record_collector_failure("query_history");
                Vec::new()
            }
        }
    }
}

/// Report a failed collector as its zero value.
fn or_zero<T: Default>(result: CollectorResult<T>) -> T {
    result.unwrap_or_else(|err| {
        tracing::warn!(
            collector = err.collector,
            error = %err.source,
            "Collector failed, reporting zero"
        );
        metrics::record_collector_failure(err.collector);
        T::default()
    })
}

pub fn window_start(now: DateTime<Utc>, time_filter: TimeFilter) -> DateTime<Utc> {
    now - Duration::days(i64::from(time_filter.days()))
}

/// Assemble the snapshot from collected inputs.
pub fn build_snapshot(
    inputs: &SnapshotInputs,
    time_filter: TimeFilter,
    now: DateTime<Utc>,
) -> WorkspaceSnapshot {
    let tables: Vec<&Table> = inputs
        .inventory
        .tables
        .iter()
        .filter(|t| !t.is_view())
        .collect();
    let total_tables = tables.len() as u64;
    let total_storage_units: u64 = tables.iter().map(|t| storage_units(t)).sum();
    let rows = &inputs.activity;

    let mut snapshot = WorkspaceSnapshot {
        total_catalogs: inputs.catalogs.len() as u64,
        total_schemas: inputs.inventory.schema_count,
        total_tables,
        total_views: collectors::count_views(&inputs.inventory.tables),
        total_users: inputs.total_users,
        active_users: active_users(rows),
        storage_locations: inputs.storage_locations,
        total_jobs: inputs.jobs.total,
        readiness: readiness_scores(
            &inputs.clusters,
            &inputs.inventory.tables,
            &inputs.jobs,
            &inputs.permissions,
        ),
        catalog_data: catalog_storage(&tables),
        table_data: top_schemas(&inputs.inventory.tables_per_schema),
        storage_by_type: storage_by_type(&tables),
        usage_data: usage_data(rows, time_filter.days(), now, total_tables),
        recent_queries: recent_queries(rows, now),
        privilege_distribution: privilege_distribution(&inputs.permissions),
        query_performance: query_performance(rows),
        sensitive_data_accesses: sensitive_accesses(rows),
        cost_estimate: cost_estimate(rows, total_storage_units),
        time_filter,
        generated_at: now,
    };
    snapshot.ensure_placeholders();
    snapshot
}

pub fn readiness_scores(
    clusters: &ClusterStats,
    tables: &[Table],
    jobs: &JobStats,
    permissions: &[Option<PermissionsList>],
) -> ReadinessScores {
    let counts: Vec<Option<usize>> = permissions
        .iter()
        .map(|p| p.as_ref().map(|list| list.privilege_assignments.len()))
        .collect();
    let cluster = clusters.readiness;
    let table = collectors::table_readiness(tables);
    let job = jobs.readiness;
    let permission = collectors::permission_readiness(&counts);
    ReadinessScores {
        cluster,
        table,
        job,
        permission,
        overall: collectors::overall_readiness(cluster, table, job, permission),
    }
}

fn active_users(rows: &[ActivityRow]) -> u64 {
    rows.iter()
        .filter_map(|r| r.user.as_deref())
        .filter(|u| !u.is_empty())
        .collect::<HashSet<_>>()
        .len() as u64
}

fn sorted_points(totals: BTreeMap<String, u64>) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = totals
        .into_iter()
        .filter(|(_, value)| *value > 0)
        .map(|(name, value)| ChartPoint::new(name, value))
        .collect();
    points.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    points
}

/// Storage units summed per catalog, largest first.
pub fn catalog_storage(tables: &[&Table]) -> Vec<ChartPoint> {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for table in tables {
        *totals.entry(table.catalog_name.clone()).or_default() += storage_units(table);
    }
    sorted_points(totals)
}

/// The five schemas holding the most tables.
pub fn top_schemas(tables_per_schema: &[(String, u64)]) -> Vec<ChartPoint> {
    let totals: BTreeMap<String, u64> = tables_per_schema.iter().cloned().collect();
    let mut points = sorted_points(totals);
    points.truncate(TOP_SCHEMAS);
    points
}

pub fn storage_by_type(tables: &[&Table]) -> Vec<ChartPoint> {
    StorageType::ALL
        .iter()
        .map(|kind| {
            let units: u64 = tables
                .iter()
                .filter(|t| storage_type(t) == *kind)
                .map(|t| storage_units(t))
                .sum();
            ChartPoint::new(kind.as_str(), units)
        })
        .filter(|p| p.value > 0)
        .collect()
}

/// One bucket per UTC day of the window, oldest first.
pub fn usage_data(
    rows: &[ActivityRow],
    days: u32,
    now: DateTime<Utc>,
    total_tables: u64,
) -> Vec<UsagePoint> {
    day_starts(days, now)
        .into_iter()
        .enumerate()
        .map(|(i, day_start)| {
            let from = day_start.timestamp_millis();
            let to = (day_start + Duration::days(1)).timestamp_millis();
            let queries = rows
                .iter()
                .filter(|r| r.started_at_ms >= from && r.started_at_ms < to)
                .count() as u64;
            UsagePoint {
                date: day_label(day_start),
                queries,
                storage: total_tables * 10 + i as u64 * 2,
            }
        })
        .collect()
}

pub fn recent_queries(rows: &[ActivityRow], now: DateTime<Utc>) -> Vec<RecentQuery> {
    let mut sorted: Vec<&ActivityRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.started_at_ms.cmp(&a.started_at_ms));
    sorted
        .into_iter()
        .take(RECENT_ROWS)
        .map(|row| RecentQuery {
            id: row.id.clone(),
            query: truncate(&row.text, MAX_QUERY_TEXT),
            user: row.user.clone().unwrap_or_else(|| "unknown".to_string()),
            source: row.source.to_string(),
            status: row.status.clone(),
            start_time: relative_time(now, row.started_at_ms),
            duration: human_duration(row.duration_ms),
            started_at_ms: row.started_at_ms,
        })
        .collect()
}

pub fn query_performance(rows: &[ActivityRow]) -> QueryPerformance {
    let n = rows.len();
    let total_ms: i64 = rows.iter().map(|r| r.duration_ms).sum();
    let finished = rows
        .iter()
        .filter(|r| r.status.eq_ignore_ascii_case("finished"))
        .count();
    QueryPerformance {
        avg_duration: round_to(total_ms as f64 / 1000.0 / n.max(1) as f64, 2),
        success_rate: if n == 0 {
            0.0
        } else {
            round_to(finished as f64 / n as f64 * 100.0, 2)
        },
        total_queries: n as u64,
    }
}

pub fn privilege_distribution(permissions: &[Option<PermissionsList>]) -> PrivilegeDistribution {
    let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut total = 0u64;
    for list in permissions.iter().flatten() {
        for assignment in &list.privilege_assignments {
            for privilege in &assignment.privileges {
                *counts.entry(privilege_bucket(privilege)).or_default() += 1;
                total += 1;
            }
        }
    }

    let distribution = PRIVILEGE_BUCKETS
        .iter()
        .chain(std::iter::once(&OTHER_BUCKET))
        .filter_map(|bucket| {
            counts
                .get(bucket)
                .map(|count| ChartPoint::new(*bucket, *count))
        })
        .collect();

    PrivilegeDistribution {
        total_grants: total,
        distribution,
    }
}

pub fn sensitive_accesses(rows: &[ActivityRow]) -> u64 {
    rows.iter()
        .filter(|row| {
            let text = row.text.to_lowercase();
            SENSITIVE_KEYWORDS.iter().any(|k| text.contains(k))
        })
        .count() as u64
}

pub fn cost_estimate(rows: &[ActivityRow], storage_units: u64) -> CostEstimate {
    let total_ms: i64 = rows.iter().map(|r| r.duration_ms).sum();
    let hours = total_ms as f64 / 3_600_000.0;
    let dbus = hours * DBUS_PER_HOUR;
    CostEstimate {
        compute_hours: round_to(hours, 2),
        estimated_dbus: round_to(dbus, 2),
        estimated_cost_usd: round_to(
            dbus * USD_PER_DBU + storage_units as f64 * USD_PER_STORAGE_UNIT,
            2,
        ),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

/// "just now", "5 minutes ago", "2 hours ago", "3 days ago".
pub fn relative_time(now: DateTime<Utc>, started_at_ms: i64) -> String {
    let started = match Utc.timestamp_millis_opt(started_at_ms).single() {
        Some(t) => t,
        None => return "unknown".to_string(),
    };
    let secs = now.signed_duration_since(started).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => plural(s / 60, "minute"),
        s if s < 86_400 => plural(s / 3_600, "hour"),
        s => plural(s / 86_400, "day"),
    }
}

/// "850ms", "1.25s", "3m 20s", "1h 5m".
pub fn human_duration(ms: i64) -> String {
    let ms = ms.max(0);
    match ms {
        m if m < 1_000 => format!("{}ms", m),
        m if m < 60_000 => format!("{:.2}s", m as f64 / 1000.0),
        m if m < 3_600_000 => format!("{}m {}s", m / 60_000, (m % 60_000) / 1_000),
        m => format!("{}h {}m", m / 3_600_000, (m % 3_600_000) / 60_000),
    }
}
