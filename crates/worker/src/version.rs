//! Cache-generation rollover at activation.

use futures::future::join_all;
use shellcache_core::{CacheStore, Error, PartitionNames};

/// A stale partition that could not be deleted.
#[derive(Debug)]
pub struct PurgeFailure {
    pub partition: String,
    pub error: Error,
}

/// Result of one purge pass.
#[derive(Debug, Default)]
pub struct PurgeReport {
    /// Stale partitions that were deleted.
    pub purged: Vec<String>,
    /// Stale partitions left behind; retried at the next activation.
    pub failures: Vec<PurgeFailure>,
}

impl PurgeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn first_failure(&self) -> Option<&PurgeFailure> {
        self.failures.first()
    }
}

/// Knows which partitions belong to the current version.
#[derive(Debug, Clone)]
pub struct VersionManager {
    current: PartitionNames,
}

impl VersionManager {
    pub fn new(current: PartitionNames) -> Self {
        Self { current }
    }

    pub fn current(&self) -> &PartitionNames {
        &self.current
    }

    pub fn is_current(&self, partition: &str) -> bool {
        self.current.contains(partition)
    }

    /// Delete every partition outside the current allow-set, concurrently.
    ///
    /// Listing failures are returned as errors. Individual delete failures
    /// are logged and collected in the report; they never abort the pass.
    pub async fn purge_stale<S>(&self, store: &S) -> Result<PurgeReport, Error>
    where
        S: CacheStore + ?Sized,
    {
        let stale: Vec<String> = store
            .list_partitions()
            .await?
            .into_iter()
            .filter(|name| !self.is_current(name))
            .collect();

        if stale.is_empty() {
            tracing::debug!("no stale partitions");
            return Ok(PurgeReport::default());
        }

        let results = join_all(stale.iter().map(|name| store.delete(name))).await;

        let mut report = PurgeReport::default();
        for (partition, result) in stale.into_iter().zip(results) {
            match result {
                Ok(_) => {
                    tracing::info!(%partition, "purged stale partition");
                    report.purged.push(partition);
                }
                Err(error) => {
                    tracing::warn!(%partition, %error, "failed to purge stale partition");
                    report.failures.push(PurgeFailure { partition, error });
                }
            }
        }

        Ok(report)
    }
}
