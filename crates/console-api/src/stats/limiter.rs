//! Bounded concurrency for statistics fan-out.
//!
//! Each leaf vendor call acquires one permit and releases it as soon as the
//! call returns. Permits are never held across a nested fan-out, so a catalog
//! branch waiting on its schema branches cannot starve them.

use crate::metrics::FANOUT_IN_FLIGHT;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Clone, Debug)]
pub struct FanOutLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl FanOutLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Calls currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    /// Run one vendor call under a permit.
    pub async fn run<F, T>(&self, call: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquire only fails after shutdown.
        let _permit = self.semaphore.acquire().await.ok();
        FANOUT_IN_FLIGHT.inc();
        let result = call.await;
        FANOUT_IN_FLIGHT.dec();
        result
    }
}
