//! Partitioned cache store contract.

use async_trait::async_trait;

use super::key::RequestKey;
use crate::Error;
use crate::http::Response;

/// Handle to an opened partition.
///
/// Obtained from [`CacheStore::open`]; the partition is guaranteed to have
/// existed when the handle was created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionHandle {
    name: String,
}

impl PartitionHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Durable key-value store of response snapshots grouped in named partitions.
///
/// Implementations do not retry; store failures surface to the caller.
/// Concurrent writes to the same key are last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a partition, creating it if absent.
    async fn open(&self, name: &str) -> Result<PartitionHandle, Error>;

    /// Look up `key` in a single partition.
    async fn match_entry(&self, handle: &PartitionHandle, key: &RequestKey) -> Result<Option<Response>, Error>;

    /// Look up `key` across all partitions, oldest partition first.
    async fn match_any(&self, key: &RequestKey) -> Result<Option<Response>, Error>;

    /// Store a snapshot of `response` under `key`, replacing any previous entry.
    async fn put(&self, handle: &PartitionHandle, key: RequestKey, response: &Response) -> Result<(), Error>;

    /// Keys stored in a partition, in insertion order.
    async fn keys(&self, handle: &PartitionHandle) -> Result<Vec<RequestKey>, Error>;

    /// Names of all existing partitions, in creation order.
    async fn list_partitions(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and all its entries. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Atomically replace partition `to` with the contents of `from`.
    ///
    /// After success `from` no longer exists. Fails with
    /// [`Error::UnknownPartition`] if `from` does not exist.
    async fn rename(&self, from: &str, to: &str) -> Result<(), Error>;
}
