//! Fetch/cache strategies, one per route class.
//!
//! | strategy | route | behavior |
//! |----------|-------|----------|
//! | [`Strategy::ShellRefresh`] | navigation | fresh entry document, cached copy when offline |
//! | [`Strategy::CacheFirst`] | static asset | cache hit without network, fill on miss |
//! | [`Strategy::NetworkFirst`] | generic | network, cached copy when offline |
//!
//! Only GET requests with OK responses within the entry size limit are ever
//! written. Writes run as background tasks: the response is handed back at
//! once and the write is carried in [`Handled`] so the host can await it
//! before it considers the request finished. Fallback lookups also run as
//! their own tasks and are only awaited when the network fails.

mod cache_first;
mod navigation;
mod network_first;

use std::sync::Arc;

use shellcache_core::{CacheStore, Error, Method, PartitionNames, Request, RequestKey, Response, Transport};
use tokio::task::JoinHandle;
use url::Url;

/// Tagged strategy selected by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Shell refresh with cached fallback.
    ShellRefresh,
    /// Cache first with background fill.
    CacheFirst,
    /// Network first with cached fallback.
    NetworkFirst,
}

/// Where the returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Fresh from the network.
    Network,
    /// Served from cache without touching the network.
    Cache,
    /// Network failed; served a previously cached copy.
    Fallback,
    /// Network failed with nothing cached; synthetic error response.
    NetworkError,
}

/// Whether a response to `method` may be written to a partition.
pub fn is_cacheable(method: &Method, response: &Response) -> bool {
    *method == Method::Get && response.is_ok()
}

/// A cache write still running in the background.
#[derive(Debug)]
pub struct PendingWrite {
    handle: JoinHandle<Result<(), Error>>,
}

impl PendingWrite {
    /// Wait for the write to commit, surfacing store errors.
    pub async fn wait(self) -> Result<(), Error> {
        self.handle
            .await
            .map_err(|e| Error::TaskFailed(format!("cache write task: {e}")))?
    }
}

/// A response produced by a strategy, plus the cache write it started, if any.
#[derive(Debug)]
pub struct Handled {
    response: Response,
    source: ResponseSource,
    write: Option<PendingWrite>,
}

impl Handled {
    fn new(response: Response, source: ResponseSource) -> Self {
        Self { response, source, write: None }
    }

    fn with_write(mut self, write: Option<PendingWrite>) -> Self {
        self.write = write;
        self
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn source(&self) -> ResponseSource {
        self.source
    }

    pub fn has_pending_write(&self) -> bool {
        self.write.is_some()
    }

    /// Split into the response and the outstanding write.
    pub fn into_parts(self) -> (Response, Option<PendingWrite>) {
        (self.response, self.write)
    }

    /// Await the outstanding write, then yield the response.
    pub async fn finish(self) -> Result<Response, Error> {
        if let Some(write) = self.write {
            write.wait().await?;
        }
        Ok(self.response)
    }
}

/// Runs strategies against a store and a transport.
pub struct Executor<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    names: PartitionNames,
    entry_document: Url,
    max_entry_bytes: usize,
}

impl<S, T> Executor<S, T>
where
    S: CacheStore + 'static,
    T: Transport + 'static,
{
    pub fn new(store: Arc<S>, transport: Arc<T>, names: PartitionNames, entry_document: Url) -> Self {
        Self { store, transport, names, entry_document, max_entry_bytes: usize::MAX }
    }

    /// Responses with larger bodies are still returned, just never written.
    pub fn with_entry_limit(mut self, max_entry_bytes: usize) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    pub async fn execute(&self, strategy: Strategy, request: &Request) -> Result<Handled, Error> {
        match strategy {
            Strategy::ShellRefresh => self.shell_refresh().await,
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
        }
    }

    /// Start the fallback lookup of `key` in one partition as its own task,
    /// so a successful fetch never waits on the store.
    fn spawn_fallback(&self, partition: &str, key: &RequestKey) -> JoinHandle<Option<Response>> {
        let store = Arc::clone(&self.store);
        let partition = partition.to_string();
        let key = key.clone();
        tokio::spawn(async move { fallback_copy(store.as_ref(), &partition, &key).await })
    }

    /// Start a background write of `response` into `partition` when the
    /// cacheability rule allows it.
    fn store_copy(&self, method: &Method, partition: &str, key: RequestKey, response: &Response) -> Option<PendingWrite> {
        if !is_cacheable(method, response) {
            tracing::debug!(%key, status = response.status, "response not cacheable");
            return None;
        }
        if response.body.len() > self.max_entry_bytes {
            tracing::debug!(%key, bytes = response.body.len(), limit = self.max_entry_bytes, "response too large to cache");
            return None;
        }

        let store = Arc::clone(&self.store);
        let partition = partition.to_string();
        let copy = response.clone();
        let handle = tokio::spawn(async move {
            let handle = store.open(&partition).await?;
            store.put(&handle, key, &copy).await?;
            tracing::debug!(%partition, "stored response");
            Ok::<(), Error>(())
        });
        Some(PendingWrite { handle })
    }
}

/// Look up `key` in one partition, treating store failures as a miss.
///
/// Used only for fallback copies, which must never turn a good network
/// response into an error.
async fn fallback_copy<S>(store: &S, partition: &str, key: &RequestKey) -> Option<Response>
where
    S: CacheStore + ?Sized,
{
    match lookup(store, partition, key).await {
        Ok(hit) => hit,
        Err(error) => {
            tracing::warn!(%partition, %key, %error, "cache lookup failed, treating as miss");
            None
        }
    }
}

async fn lookup<S>(store: &S, partition: &str, key: &RequestKey) -> Result<Option<Response>, Error>
where
    S: CacheStore + ?Sized,
{
    let handle = store.open(partition).await?;
    store.match_entry(&handle, key).await
}

/// Collect a fallback lookup started with [`Executor::spawn_fallback`].
async fn settle_fallback(lookup: JoinHandle<Option<Response>>) -> Option<Response> {
    match lookup.await {
        Ok(hit) => hit,
        Err(error) => {
            tracing::warn!(%error, "cache lookup task failed, treating as miss");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cacheable_rule() {
        assert!(is_cacheable(&Method::Get, &Response::new(200, "ok")));
        assert!(!is_cacheable(&Method::Post, &Response::new(200, "ok")));
        assert!(!is_cacheable(&Method::Get, &Response::new(404, "missing")));
        assert!(!is_cacheable(&Method::Get, &Response::new(500, "")));
        assert!(!is_cacheable(&Method::Get, &Response::error()));
        assert!(!is_cacheable(&Method::Head, &Response::new(200, "")));
    }

    #[tokio::test]
    async fn test_finish_without_write() {
        let handled = Handled::new(Response::new(200, "x"), ResponseSource::Cache);
        assert!(!handled.has_pending_write());
        let response = handled.finish().await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_finish_surfaces_write_error() {
        let write = PendingWrite { handle: tokio::spawn(async { Err(Error::UnknownPartition("gone".into())) }) };
        let handled = Handled::new(Response::new(200, "x"), ResponseSource::Network).with_write(Some(write));

        let result = handled.finish().await;
        assert!(matches!(result, Err(Error::UnknownPartition(_))));
    }

    #[tokio::test]
    async fn test_panicking_write_is_task_failure() {
        let write = PendingWrite { handle: tokio::spawn(async { panic!("store exploded") }) };
        let result = write.wait().await;
        assert!(matches!(result, Err(Error::TaskFailed(_))));
    }
}
