//! Install-time precaching of the shell manifest.
//!
//! All-or-nothing: every manifest asset is fetched before anything is
//! written, the batch lands in a staging partition, and the staging
//! partition is renamed over the static partition in one step. A failed
//! install leaves the static partition exactly as it was.

use futures::future::try_join_all;
use shellcache_core::{CacheStore, Error, PartitionNames, Request, RequestKey, Response, Transport};
use url::Url;

use crate::manifest::Manifest;

#[derive(Debug, Clone)]
pub struct PrecacheLoader {
    manifest: Manifest,
    names: PartitionNames,
    max_entry_bytes: usize,
}

impl PrecacheLoader {
    pub fn new(manifest: Manifest, names: PartitionNames) -> Self {
        Self { manifest, names, max_entry_bytes: usize::MAX }
    }

    /// A manifest asset larger than this fails the install.
    pub fn with_entry_limit(mut self, max_entry_bytes: usize) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Precache the manifest into the static partition.
    ///
    /// Returns the number of stored entries.
    pub async fn install<S, T>(&self, store: &S, transport: &T) -> Result<usize, Error>
    where
        S: CacheStore + ?Sized,
        T: Transport + ?Sized,
    {
        let staging = self.names.staging_name();
        // Leftover from an interrupted install.
        store.delete(&staging).await?;

        let result = match self.populate(store, transport, &staging).await {
            Ok(count) => store.rename(&staging, &self.names.static_name).await.map(|()| count),
            Err(e) => Err(e),
        };

        if result.is_err()
            && let Err(cleanup) = store.delete(&staging).await
        {
            tracing::warn!(%staging, error = %cleanup, "failed to remove staging partition");
        }

        result
    }

    async fn populate<S, T>(&self, store: &S, transport: &T, staging: &str) -> Result<usize, Error>
    where
        S: CacheStore + ?Sized,
        T: Transport + ?Sized,
    {
        let fetched =
            try_join_all(self.manifest.entries().map(|(path, url)| self.fetch_asset(transport, path, url))).await?;

        let handle = store.open(staging).await?;
        for (url, response) in &fetched {
            store.put(&handle, RequestKey::get(url), response).await?;
        }

        tracing::debug!(count = fetched.len(), %staging, "manifest staged");
        Ok(fetched.len())
    }

    async fn fetch_asset<T>(&self, transport: &T, path: &str, url: &Url) -> Result<(Url, Response), Error>
    where
        T: Transport + ?Sized,
    {
        let failed = |reason: String| Error::InstallFailed { path: path.to_string(), reason };

        let response = transport.fetch(&Request::get(url.clone())).await.map_err(|e| failed(e.to_string()))?;

        if !response.is_ok() {
            return Err(failed(format!("status {}", response.status)));
        }
        if response.body.len() > self.max_entry_bytes {
            return Err(failed(format!("{} bytes exceeds {}", response.body.len(), self.max_entry_bytes)));
        }

        Ok((url.clone(), response))
    }
}
