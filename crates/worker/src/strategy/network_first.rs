//! Network first with cached fallback, for everything else.

use shellcache_core::{CacheStore, Error, Request, RequestKey, Transport};

use super::{Executor, Handled, ResponseSource, settle_fallback};

impl<S, T> Executor<S, T>
where
    S: CacheStore + 'static,
    T: Transport + 'static,
{
    pub(super) async fn network_first(&self, request: &Request) -> Result<Handled, Error> {
        let key = RequestKey::for_request(request);

        let cached = self.spawn_fallback(&self.names.runtime_name, &key);

        match self.transport.fetch(request).await {
            Ok(response) => {
                cached.abort();
                tracing::debug!(%key, status = response.status, "served from network");
                let write = self.store_copy(&request.method, &self.names.runtime_name, key, &response);
                Ok(Handled::new(response, ResponseSource::Network).with_write(write))
            }
            Err(error) => match settle_fallback(cached).await {
                Some(stale) => {
                    tracing::warn!(%key, %error, "network failed, serving cached copy");
                    Ok(Handled::new(stale, ResponseSource::Fallback))
                }
                None => {
                    tracing::warn!(%key, %error, "network failed with nothing cached");
                    Err(Error::NoCache(format!("{key} ({error})")))
                }
            },
        }
    }
}
