//! Shell refresh with cached fallback, for navigations.

use shellcache_core::{CacheMode, CacheStore, Error, Method, Request, RequestKey, Response, Transport};

use super::{Executor, Handled, ResponseSource, settle_fallback};

impl<S, T> Executor<S, T>
where
    S: CacheStore + 'static,
    T: Transport + 'static,
{
    /// Every navigation resolves to the entry document, fetched past any
    /// intermediate cache. Never fails: offline with nothing cached yields
    /// [`Response::error`].
    pub(super) async fn shell_refresh(&self) -> Result<Handled, Error> {
        let key = RequestKey::get(&self.entry_document);
        let request = Request::get(self.entry_document.clone()).with_cache(CacheMode::NoStore);

        let cached = self.spawn_fallback(&self.names.static_name, &key);

        match self.transport.fetch(&request).await {
            Ok(response) => {
                cached.abort();
                tracing::debug!(status = response.status, "navigation served from network");
                let write = self.store_copy(&Method::Get, &self.names.static_name, key, &response);
                Ok(Handled::new(response, ResponseSource::Network).with_write(write))
            }
            Err(error) => match settle_fallback(cached).await {
                Some(shell) => {
                    tracing::warn!(%error, "navigation offline, serving cached shell");
                    Ok(Handled::new(shell, ResponseSource::Fallback))
                }
                None => {
                    tracing::warn!(%error, "navigation offline and no cached shell");
                    Ok(Handled::new(Response::error(), ResponseSource::NetworkError))
                }
            },
        }
    }
}
