//! Workspace statistics: collectors, the snapshot aggregator, its cache and
//! per-catalog statistics.

pub mod aggregator;
pub mod cache;
pub mod catalog_stats;
pub mod collectors;
pub mod limiter;

pub use aggregator::{AggregateError, Aggregator};
pub use cache::SnapshotCache;
pub use limiter::FanOutLimiter;

use unity_console_client::Table;

/// Storage units for tables without reported statistics.
pub const DEFAULT_STORAGE_UNITS: u64 = 10;

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Privilege buckets in display order; anything else lands in `OTHER`.
pub const PRIVILEGE_BUCKETS: [&str; 11] = [
    "ALL_PRIVILEGES",
    "USE_CATALOG",
    "USE_SCHEMA",
    "CREATE_SCHEMA",
    "CREATE_TABLE",
    "SELECT",
    "MODIFY",
    "EXECUTE",
    "READ_VOLUME",
    "WRITE_VOLUME",
    "BROWSE",
];

pub const OTHER_BUCKET: &str = "OTHER";

/// Storage units of a table: reported size in MiB (at least 1) or a flat default.
pub fn storage_units(table: &Table) -> u64 {
    match table.size_bytes() {
        Some(bytes) => (bytes / BYTES_PER_MIB).max(1),
        None => DEFAULT_STORAGE_UNITS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageType {
    Delta,
    Parquet,
    Other,
}

impl StorageType {
    pub const ALL: [StorageType; 3] = [StorageType::Delta, StorageType::Parquet, StorageType::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Delta => "Delta",
            StorageType::Parquet => "Parquet",
            StorageType::Other => "Other",
        }
    }
}

/// Classify by substring over the data source format and table type.
pub fn storage_type(table: &Table) -> StorageType {
    let descriptor = format!(
        "{}{}",
        table.data_source_format.as_deref().unwrap_or_default(),
        table.table_type.as_deref().unwrap_or_default()
    )
    .to_uppercase();

    if descriptor.contains("DELTA") {
        StorageType::Delta
    } else if descriptor.contains("PARQUET") {
        StorageType::Parquet
    } else {
        StorageType::Other
    }
}

/// Bucket name for a privilege string.
pub fn privilege_bucket(privilege: &str) -> &'static str {
    let normalized = privilege.trim().to_uppercase().replace(' ', "_");
    PRIVILEGE_BUCKETS
        .iter()
        .find(|bucket| **bucket == normalized)
        .copied()
        .unwrap_or(OTHER_BUCKET)
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
