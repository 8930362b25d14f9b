//! In-process partition store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::key::RequestKey;
use super::store::{CacheStore, PartitionHandle};
use crate::Error;
use crate::http::Response;

#[derive(Debug, Default)]
struct Partition {
    name: String,
    entries: Vec<(RequestKey, Response)>,
}

/// Partition store kept entirely in memory.
///
/// Same semantics as [`CacheDb`](super::CacheDb) without durability. Every
/// operation takes the lock once, so renames and overwrites are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<Vec<Partition>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, name: &str) -> Result<PartitionHandle, Error> {
        let mut partitions = self.partitions.write().await;
        if !partitions.iter().any(|p| p.name == name) {
            partitions.push(Partition { name: name.to_string(), entries: Vec::new() });
        }
        Ok(PartitionHandle::new(name))
    }

    async fn match_entry(&self, handle: &PartitionHandle, key: &RequestKey) -> Result<Option<Response>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|p| p.name == handle.name())
            .and_then(|p| p.entries.iter().find(|(k, _)| k == key))
            .map(|(_, r)| r.clone()))
    }

    async fn match_any(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find_map(|p| p.entries.iter().find(|(k, _)| k == key))
            .map(|(_, r)| r.clone()))
    }

    async fn put(&self, handle: &PartitionHandle, key: RequestKey, response: &Response) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        let partition = partitions
            .iter_mut()
            .find(|p| p.name == handle.name())
            .ok_or_else(|| Error::UnknownPartition(handle.name().to_string()))?;

        match partition.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = response.clone(),
            None => partition.entries.push((key, response.clone())),
        }
        Ok(())
    }

    async fn keys(&self, handle: &PartitionHandle) -> Result<Vec<RequestKey>, Error> {
        let partitions = self.partitions.read().await;
        partitions
            .iter()
            .find(|p| p.name == handle.name())
            .map(|p| p.entries.iter().map(|(k, _)| k.clone()).collect())
            .ok_or_else(|| Error::UnknownPartition(handle.name().to_string()))
    }

    async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        Ok(self.partitions.read().await.iter().map(|p| p.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|p| p.name != name);
        Ok(partitions.len() != before)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        if !partitions.iter().any(|p| p.name == from) {
            return Err(Error::UnknownPartition(from.to_string()));
        }
        if from != to {
            partitions.retain(|p| p.name != to);
            if let Some(p) = partitions.iter_mut().find(|p| p.name == from) {
                p.name = to.to_string();
            }
        }
        Ok(())
    }
}
