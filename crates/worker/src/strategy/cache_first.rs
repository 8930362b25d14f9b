//! Cache first with background fill, for same-origin static assets.

use shellcache_core::{CacheStore, Error, Request, RequestKey, Transport};

use super::{Executor, Handled, ResponseSource};

impl<S, T> Executor<S, T>
where
    S: CacheStore + 'static,
    T: Transport + 'static,
{
    /// Hits in any partition are returned without touching the network.
    /// A miss goes to the network; a network failure on a miss propagates.
    pub(super) async fn cache_first(&self, request: &Request) -> Result<Handled, Error> {
        let key = RequestKey::for_request(request);

        if let Some(hit) = self.store.match_any(&key).await? {
            tracing::debug!(%key, "static asset served from cache");
            return Ok(Handled::new(hit, ResponseSource::Cache));
        }

        let response = self.transport.fetch(request).await?;
        tracing::debug!(%key, status = response.status, "static asset fetched");

        let write = self.store_copy(&request.method, &self.names.static_name, key, &response);
        Ok(Handled::new(response, ResponseSource::Network).with_write(write))
    }
}
