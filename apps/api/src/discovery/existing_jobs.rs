//! Existing-Jobs Cache — TTL cache in front of the CRM job list.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::models::listing::ExistingJobRecord;

pub const EXISTING_JOBS_TTL: Duration = Duration::from_secs(30);

/// CRM collaborator. Must return jobs in every lifecycle state.
#[async_trait]
pub trait JobsSource: Send + Sync {
    async fn list_all_jobs(&self) -> Result<Vec<ExistingJobRecord>>;
}

/// Reads the CRM `jobs` table. No status filter: dedup considers closed jobs too.
pub struct PgJobsSource {
    pool: PgPool,
}

impl PgJobsSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobsSource for PgJobsSource {
    async fn list_all_jobs(&self) -> Result<Vec<ExistingJobRecord>> {
        let rows = sqlx::query_as::<_, ExistingJobRecord>("SELECT job_title, account FROM jobs")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[derive(Clone)]
struct Snapshot {
    records: Arc<Vec<ExistingJobRecord>>,
    fetched_at: Instant,
}

pub struct ExistingJobsCache {
    source: Arc<dyn JobsSource>,
    ttl: Duration,
    snapshot: RwLock<Option<Snapshot>>,
    refresh: Mutex<()>,
}

impl ExistingJobsCache {
    pub fn new(source: Arc<dyn JobsSource>) -> Self {
        Self::with_ttl(source, EXISTING_JOBS_TTL)
    }

    pub fn with_ttl(source: Arc<dyn JobsSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            snapshot: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    fn current(&self) -> Option<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fresh(&self) -> Option<Arc<Vec<ExistingJobRecord>>> {
        self.current()
            .filter(|s| s.fetched_at.elapsed() < self.ttl)
            .map(|s| s.records)
    }

    /// Fresh records, refreshing at most once across concurrent stale callers.
    /// A failed refresh serves the last good snapshot, or an empty list.
    pub async fn get_existing(&self) -> Arc<Vec<ExistingJobRecord>> {
        if let Some(records) = self.fresh() {
            return records;
        }

        let _guard = self.refresh.lock().await;
        if let Some(records) = self.fresh() {
            return records;
        }

        match self.source.list_all_jobs().await {
            Ok(records) => {
                debug!(count = records.len(), "Refreshed existing jobs cache");
                let records = Arc::new(records);
                *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(Snapshot {
                    records: records.clone(),
                    fetched_at: Instant::now(),
                });
                records
            }
            Err(e) => {
                let stale = self.current().map(|s| s.records);
                warn!(
                    error = %e,
                    serving_stale = stale.is_some(),
                    "Existing jobs refresh failed, dedup degraded"
                );
                stale.unwrap_or_default()
            }
        }
    }

    /// Forces the next `get_existing` to refetch.
    pub fn invalidate(&self) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeCrm {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl JobsSource for FakeCrm {
        async fn list_all_jobs(&self) -> Result<Vec<ExistingJobRecord>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("crm unavailable");
            }
            Ok(vec![ExistingJobRecord::new(format!("Role {n}"), "Acme")])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_serves_from_cache_within_ttl() {
        let crm = Arc::new(FakeCrm::default());
        let cache = ExistingJobsCache::new(crm.clone());

        let first = cache.get_existing().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        let second = cache.get_existing().await;

        assert_eq!(crm.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_after_ttl() {
        let crm = Arc::new(FakeCrm::default());
        let cache = ExistingJobsCache::new(crm.clone());

        cache.get_existing().await;
        tokio::time::advance(Duration::from_secs(31)).await;
        let records = cache.get_existing().await;

        assert_eq!(crm.calls.load(Ordering::SeqCst), 2);
        assert_eq!(records[0].job_title, "Role 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_fetch_once() {
        let crm = Arc::new(FakeCrm::default());
        let cache = Arc::new(ExistingJobsCache::new(crm.clone()));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_existing().await.len() })
            })
            .collect();
        for h in handles {
            assert_eq!(h.await.unwrap(), 1);
        }
        assert_eq!(crm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_serves_last_good() {
        let crm = Arc::new(FakeCrm::default());
        let cache = ExistingJobsCache::new(crm.clone());
        cache.get_existing().await;

        crm.failing.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(31)).await;
        let records = cache.get_existing().await;

        assert_eq!(crm.calls.load(Ordering::SeqCst), 2);
        assert_eq!(records[0].job_title, "Role 0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_without_snapshot_is_empty() {
        let crm = Arc::new(FakeCrm::default());
        crm.failing.store(true, Ordering::SeqCst);
        let cache = ExistingJobsCache::new(crm.clone());
        assert!(cache.get_existing().await.is_empty());

        // No snapshot was stored, so the next call retries.
        cache.get_existing().await;
        assert_eq!(crm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let crm = Arc::new(FakeCrm::default());
        let cache = ExistingJobsCache::new(crm.clone());
        cache.get_existing().await;
        cache.invalidate();
        cache.get_existing().await;
        assert_eq!(crm.calls.load(Ordering::SeqCst), 2);
    }
}
