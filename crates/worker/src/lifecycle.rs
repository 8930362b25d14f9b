//! The worker: install, activate and fetch checkpoints over one store.
//!
//! State machine:
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               \
//!                -> Redundant (install failed)
//! ```
//!
//! Fetches are only intercepted once `Activated`; before that the previous
//! version (or the host) keeps serving them.

use std::fmt;
use std::sync::Arc;

use shellcache_client::{FetchConfig, HttpTransport};
use shellcache_core::{CacheDb, CacheStore, Error, PartitionNames, Request, Transport, WorkerConfig};
use tokio::sync::RwLock;

use crate::classify::Router;
use crate::manifest::Manifest;
use crate::precache::PrecacheLoader;
use crate::strategy::{Executor, Handled};
use crate::version::{PurgeFailure, VersionManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this version will never serve.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Completion signal of the install checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Number of manifest entries stored.
    pub cached: usize,
    /// Activate immediately instead of waiting for old pages to close.
    pub skip_waiting: bool,
}

/// Completion signal of the activate checkpoint.
#[derive(Debug)]
pub struct ActivateOutcome {
    /// Stale partitions deleted.
    pub purged: Vec<String>,
    /// Stale partitions that survived; activation went ahead anyway.
    pub failures: Vec<PurgeFailure>,
    /// Take control of already open pages right away.
    pub claim_clients: bool,
}

/// Result of the fetch checkpoint.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted; the host applies its default behavior.
    Passthrough,
    /// Intercepted and answered.
    Respond(Handled),
}

impl FetchOutcome {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, FetchOutcome::Passthrough)
    }

    pub fn into_handled(self) -> Option<Handled> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Respond(handled) => Some(handled),
        }
    }
}

/// One version of the interception layer.
///
/// Store and transport are injected; apart from the lifecycle state, all
/// shared state lives in the store.
pub struct ShellWorker<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    router: Router,
    versions: VersionManager,
    precache: PrecacheLoader,
    executor: Executor<S, T>,
    state: RwLock<WorkerState>,
}

impl ShellWorker<CacheDb, HttpTransport> {
    /// Open the SQLite store at `config.db_path` and build a reqwest transport.
    pub async fn connect(config: &WorkerConfig) -> Result<Self, Error> {
        let store = CacheDb::open(&config.db_path).await?;
        let transport = HttpTransport::new(FetchConfig::from(config))?;
        Self::new(config, Arc::new(store), Arc::new(transport))
    }
}

impl<S, T> ShellWorker<S, T>
where
    S: CacheStore + 'static,
    T: Transport + 'static,
{
    pub fn new(config: &WorkerConfig, store: Arc<S>, transport: Arc<T>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let entry_document = origin
            .join(&config.entry_document)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.entry_document)))?;
        let names = config.partition_names();

        Ok(Self {
            router: Router::from_config(config, &origin),
            versions: VersionManager::new(names.clone()),
            precache: PrecacheLoader::new(Manifest::from_config(config)?, names.clone())
                .with_entry_limit(config.max_bytes),
            executor: Executor::new(Arc::clone(&store), Arc::clone(&transport), names, entry_document)
                .with_entry_limit(config.max_bytes),
            store,
            transport,
            state: RwLock::new(WorkerState::Parsed),
        })
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn partition_names(&self) -> &PartitionNames {
        self.versions.current()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Move from `expected` to `next`, or fail without changing anything.
    async fn transition(&self, expected: WorkerState, next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != expected {
            return Err(Error::InvalidState(format!("cannot move to {next} from {state}, expected {expected}")));
        }
        *state = next;
        Ok(())
    }

    async fn set_state(&self, next: WorkerState) {
        *self.state.write().await = next;
    }

    /// Install checkpoint: precache the shell.
    ///
    /// On failure this version becomes redundant and the error is returned
    /// so the host discards it.
    pub async fn on_install(&self) -> Result<InstallOutcome, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing).await?;
        tracing::info!(partition = %self.partition_names().static_name, "installing");

        match self.precache.install(self.store.as_ref(), self.transport.as_ref()).await {
            Ok(cached) => {
                self.set_state(WorkerState::Installed).await;
                tracing::info!(cached, "installed");
                Ok(InstallOutcome { cached, skip_waiting: true })
            }
            Err(error) => {
                self.set_state(WorkerState::Redundant).await;
                tracing::error!(%error, "install failed, version discarded");
                Err(error)
            }
        }
    }

    /// Activate checkpoint: purge every partition of other versions and make
    /// sure both current partitions exist.
    ///
    /// Returns only after the purge has finished. Purge failures are logged
    /// and reported but do not block activation.
    pub async fn on_activate(&self) -> Result<ActivateOutcome, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating).await?;

        let report = match self.versions.purge_stale(self.store.as_ref()).await {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(%error, "could not list partitions, skipping purge");
                Default::default()
            }
        };
        if let Some(first) = report.first_failure() {
            tracing::warn!(
                partition = %first.partition,
                error = %first.error,
                failed = report.failures.len(),
                "stale partitions kept until next activation"
            );
        }

        let runtime = &self.partition_names().runtime_name;
        if let Err(error) = self.store.open(runtime).await {
            tracing::warn!(partition = %runtime, %error, "could not create runtime partition");
        }

        self.set_state(WorkerState::Activated).await;
        tracing::info!(purged = report.purged.len(), "activated");

        Ok(ActivateOutcome { purged: report.purged, failures: report.failures, claim_clients: true })
    }

    /// Fetch checkpoint: classify the request and run its strategy.
    pub async fn on_fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        let route = self.router.classify(&request);
        let Some(strategy) = route.strategy() else {
            tracing::trace!(url = %request.url, "non-http request passed through");
            return Ok(FetchOutcome::Passthrough);
        };

        let state = self.state().await;
        if state != WorkerState::Activated {
            tracing::debug!(url = %request.url, %state, "worker not active, passing through");
            return Ok(FetchOutcome::Passthrough);
        }

        tracing::debug!(method = %request.method, url = %request.url, ?route, "intercepted");
        let handled = self.executor.execute(strategy, &request).await?;
        Ok(FetchOutcome::Respond(handled))
    }
}
