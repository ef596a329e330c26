//! Metric collectors.
//!
//! Collectors read vendor state and return `Result<_, CollectorError>`. They
//! never swallow failures; the aggregator decides how a failed collector is
//! reported. Readiness scores are pure functions over fetched inventory.

use super::round_to;
use unity_console_client::{Cluster, ClientError, DatabricksClient, Job, Table};

/// Cluster access modes that support Unity Catalog.
pub const UC_CAPABLE_MODES: [&str; 5] = [
    "USER_ISOLATION",
    "SINGLE_USER",
    "DATA_SECURITY_MODE_STANDARD",
    "DATA_SECURITY_MODE_DEDICATED",
    "DATA_SECURITY_MODE_AUTO",
];

/// Clusters whose event history feeds the activity list.
pub const EVENT_HISTORY_CLUSTERS: usize = 5;

#[derive(Debug, thiserror::Error)]
#[error("collector '{collector}' failed: {source}")]
pub struct CollectorError {
    pub collector: &'static str,
    #[source]
    pub source: ClientError,
}

impl CollectorError {
    pub fn new(collector: &'static str, source: ClientError) -> Self {
        Self { collector, source }
    }
}

pub type CollectorResult<T> = Result<T, CollectorError>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobStats {
    pub total: u64,
    pub readiness: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterStats {
    pub total: u64,
    pub readiness: f64,
    /// First clusters in listing order, used for event history
    pub event_cluster_ids: Vec<String>,
}

pub async fn count_storage_locations(client: &DatabricksClient) -> CollectorResult<u64> {
    let locations = client
        .list_external_locations()
        .await
        .map_err(|e| CollectorError::new("storage_locations", e))?;
    Ok(locations.len() as u64)
}

pub async fn collect_jobs(client: &DatabricksClient) -> CollectorResult<JobStats> {
    let jobs = client
        .list_jobs()
        .await
        .map_err(|e| CollectorError::new("jobs", e))?;
    Ok(JobStats {
        total: jobs.len() as u64,
        readiness: job_readiness(&jobs),
    })
}

pub async fn collect_clusters(client: &DatabricksClient) -> CollectorResult<ClusterStats> {
    let clusters = client
        .list_clusters()
        .await
        .map_err(|e| CollectorError::new("clusters", e))?;
    Ok(ClusterStats {
        total: clusters.len() as u64,
        readiness: cluster_readiness(&clusters),
        event_cluster_ids: clusters
            .iter()
            .take(EVENT_HISTORY_CLUSTERS)
            .map(|c| c.cluster_id.clone())
            .collect(),
    })
}

/// Views and materialized views in the fetched inventory.
pub fn count_views(tables: &[Table]) -> u64 {
    tables.iter().filter(|t| t.is_view()).count() as u64
}

/// `compliant / total * 100` rounded to one decimal; exactly 0 for an empty set.
pub fn readiness_percent(compliant: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(compliant as f64 / total as f64 * 100.0, 1)
}

pub fn is_uc_capable(mode: Option<&str>) -> bool {
    mode.map(|m| UC_CAPABLE_MODES.contains(&m.trim().to_uppercase().as_str()))
        .unwrap_or(false)
}

pub fn cluster_readiness(clusters: &[Cluster]) -> f64 {
    let compliant = clusters
        .iter()
        .filter(|c| is_uc_capable(c.data_security_mode.as_deref()))
        .count();
    readiness_percent(compliant, clusters.len())
}

/// Non-view tables that are managed or stored as Delta.
pub fn table_readiness(tables: &[Table]) -> f64 {
    let candidates: Vec<&Table> = tables.iter().filter(|t| !t.is_view()).collect();
    let compliant = candidates
        .iter()
        .filter(|t| {
            t.table_type.as_deref() == Some("MANAGED")
                || t
                    .data_source_format
                    .as_deref()
                    .map(|f| f.eq_ignore_ascii_case("DELTA"))
                    .unwrap_or(false)
        })
        .count();
    readiness_percent(compliant, candidates.len())
}

/// Jobs whose declared cluster specs are all UC-capable. Jobs that declare
/// none (serverless or existing clusters) count as compliant.
pub fn job_readiness(jobs: &[Job]) -> f64 {
    let compliant = jobs
        .iter()
        .filter(|job| {
            job.cluster_specs()
                .all(|spec| is_uc_capable(spec.data_security_mode.as_deref()))
        })
        .count();
    readiness_percent(compliant, jobs.len())
}

/// Catalogs with at least one assignment. `None` marks a failed fetch.
pub fn permission_readiness(assignment_counts: &[Option<usize>]) -> f64 {
    let compliant = assignment_counts
        .iter()
        .filter(|count| matches!(count, Some(n) if *n > 0))
        .count();
    readiness_percent(compliant, assignment_counts.len())
}

/// Unweighted mean of the four readiness scores.
pub fn overall_readiness(cluster: f64, table: f64, job: f64, permission: f64) -> f64 {
    round_to((cluster + table + job + permission) / 4.0, 1)
}
