//! TTL cache for workspace snapshots.
//!
//! One slot per time filter. Entries are valid while `now - stored_at < ttl`
//! and are replaced wholesale on the next miss; there is no invalidation API
//! and failed aggregations are never stored.

use crate::clock::SharedClock;
use crate::metrics;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use unity_console_core::{TimeFilter, WorkspaceSnapshot};

pub const SNAPSHOT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: WorkspaceSnapshot,
    stored_at: DateTime<Utc>,
}

pub struct SnapshotCache {
    entries: RwLock<HashMap<TimeFilter, CacheEntry>>,
    ttl: Duration,
    clock: SharedClock,
}

impl SnapshotCache {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_ttl(clock, SNAPSHOT_TTL)
    }

    pub fn with_ttl(clock: SharedClock, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached snapshot for `filter` if it is still fresh.
    pub async fn get(&self, filter: TimeFilter) -> Option<WorkspaceSnapshot> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let hit = entries.get(&filter).and_then(|entry| {
            let age = now.signed_duration_since(entry.stored_at).to_std().ok()?;
            (age < self.ttl).then(|| entry.snapshot.clone())
        });

        metrics::record_cache_lookup(filter.as_str(), hit.is_some());
        if hit.is_some() {
            tracing::debug!(time_filter = %filter, "Snapshot cache hit");
        } else {
            tracing::debug!(time_filter = %filter, "Snapshot cache miss");
        }
        hit
    }

    /// Store a snapshot, replacing the slot for its filter.
    pub async fn put(&self, filter: TimeFilter, snapshot: WorkspaceSnapshot) {
        let stored_at = self.clock.now();
        let mut entries = self.entries.write().await;
        entries.insert(
            filter,
            CacheEntry {
                snapshot,
                stored_at,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn setup() -> (Arc<ManualClock>, SnapshotCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let cache = SnapshotCache::new(clock.clone());
        (clock, cache)
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let (clock, cache) = setup();
        let snapshot = WorkspaceSnapshot::zeroed(TimeFilter::Week, clock.now());
        cache.put(TimeFilter::Week, snapshot.clone()).await;

        clock.advance(chrono::Duration::seconds(299));
        assert_eq!(cache.get(TimeFilter::Week).await, Some(snapshot));
    }

    #[tokio::test]
    async fn test_expires_at_ttl() {
        let (clock, cache) = setup();
        cache
            .put(TimeFilter::Week, WorkspaceSnapshot::zeroed(TimeFilter::Week, clock.now()))
            .await;

        clock.advance(chrono::Duration::minutes(5));
        assert!(cache.get(TimeFilter::Week).await.is_none());
    }

    #[tokio::test]
    async fn test_slots_are_per_filter() {
        let (clock, cache) = setup();
        cache
            .put(TimeFilter::Day, WorkspaceSnapshot::zeroed(TimeFilter::Day, clock.now()))
            .await;
        cache
            .put(TimeFilter::Month, WorkspaceSnapshot::zeroed(TimeFilter::Month, clock.now()))
            .await;

        assert!(cache.get(TimeFilter::Week).await.is_none());
        assert_eq!(
            cache.get(TimeFilter::Day).await.map(|s| s.time_filter),
            Some(TimeFilter::Day)
        );
        assert_eq!(
            cache.get(TimeFilter::Month).await.map(|s| s.usage_data.len()),
            Some(30)
        );
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_put_replaces_slot() {
        let (clock, cache) = setup();
        let mut first = WorkspaceSnapshot::zeroed(TimeFilter::Week, clock.now());
        first.total_catalogs = 1;
        cache.put(TimeFilter::Week, first).await;

        let mut second = WorkspaceSnapshot::zeroed(TimeFilter::Week, clock.now());
        second.total_catalogs = 2;
        cache.put(TimeFilter::Week, second).await;

        assert_eq!(cache.get(TimeFilter::Week).await.unwrap().total_catalogs, 2);
    }
}
