//! Scripted transport and fault-injecting store for strategy and lifecycle tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use shellcache_core::{CacheStore, Error, MemoryStore, PartitionHandle, Request, RequestKey, Response, Transport};

pub const ORIGIN: &str = "https://moodmusic.test";

pub fn url(path: &str) -> url::Url {
    url::Url::parse(&format!("{ORIGIN}{path}")).unwrap()
}

#[derive(Default)]
struct Script {
    routes: HashMap<String, Option<Response>>,
    offline: bool,
    calls: Vec<Request>,
}

/// Transport answering from a per-URL script. Unscripted URLs get a 404;
/// URLs scripted with [`FakeTransport::fail`] and every URL while offline
/// reject with a network error.
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<Script>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, response: Response) -> &Self {
        self.script.lock().unwrap().routes.insert(url(path).to_string(), Some(response));
        self
    }

    pub fn fail(&self, path: &str) -> &Self {
        self.script.lock().unwrap().routes.insert(url(path).to_string(), None);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.script.lock().unwrap().offline = offline;
    }

    pub fn calls(&self) -> Vec<Request> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        let target = url(path);
        self.script.lock().unwrap().calls.iter().filter(|r| r.url == target).count()
    }

    pub fn reset_calls(&self) {
        self.script.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(request.clone());
        if script.offline {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        match script.routes.get(request.url.as_str()) {
            Some(Some(response)) => Ok(response.clone().with_url(request.url.clone())),
            Some(None) => Err(Error::Network(format!("connection refused: {}", request.url))),
            None => Ok(Response::new(404, "not found").with_url(request.url.clone())),
        }
    }
}

/// Shell assets for the default manifest, all OK.
pub fn shell_transport() -> FakeTransport {
    let transport = FakeTransport::new();
    transport
        .respond("/", Response::new(200, "<html>root</html>").with_header("Content-Type", "text/html"))
        .respond("/index.html", Response::new(200, "<html>shell v1</html>").with_header("Content-Type", "text/html"))
        .respond("/manifest.json", Response::new(200, r#"{"name":"MoodMusic"}"#))
        .respond("/icons/MM192x192.png", Response::new(200, "png192"))
        .respond("/icons/MM256x256.png", Response::new(200, "png256"))
        .respond("/icons/MM384x384.png", Response::new(200, "png384"))
        .respond("/icons/MM512x512.png", Response::new(200, "png512"));
    transport
}

/// [`MemoryStore`] with injectable faults: one partition that refuses to be
/// deleted, a failing partition listing, and single-partition lookups that
/// never complete.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    stuck: Option<String>,
    broken_listing: bool,
    stalled_lookups: bool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stuck(mut self, partition: &str) -> Self {
        self.stuck = Some(partition.to_string());
        self
    }

    pub fn broken_listing(mut self) -> Self {
        self.broken_listing = true;
        self
    }

    pub fn stalled_lookups(mut self) -> Self {
        self.stalled_lookups = true;
        self
    }
}

#[async_trait]
impl CacheStore for FaultyStore {
    async fn open(&self, name: &str) -> Result<PartitionHandle, Error> {
        self.inner.open(name).await
    }

    async fn match_entry(&self, h: &PartitionHandle, k: &RequestKey) -> Result<Option<Response>, Error> {
        if self.stalled_lookups {
            std::future::pending::<()>().await;
        }
        self.inner.match_entry(h, k).await
    }

    async fn match_any(&self, k: &RequestKey) -> Result<Option<Response>, Error> {
        self.inner.match_any(k).await
    }

    async fn put(&self, h: &PartitionHandle, k: RequestKey, r: &Response) -> Result<(), Error> {
        self.inner.put(h, k, r).await
    }

    async fn keys(&self, h: &PartitionHandle) -> Result<Vec<RequestKey>, Error> {
        self.inner.keys(h).await
    }

    async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        if self.broken_listing {
            return Err(Error::MigrationFailed("partitions table unreadable".into()));
        }
        self.inner.list_partitions().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        if self.stuck.as_deref() == Some(name) {
            return Err(Error::UnknownPartition(name.to_string()));
        }
        self.inner.delete(name).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), Error> {
        self.inner.rename(from, to).await
    }
}
