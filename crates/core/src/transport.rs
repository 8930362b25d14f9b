//! Network transport contract.

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Issues requests against the network.
///
/// Any HTTP status, 4xx and 5xx included, is a successful fetch. Only a
/// fetch that produced no response at all returns `Err`, normally
/// [`Error::Network`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
