//! Canonical request identity used as the cache key.

use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

use crate::http::{Method, Request};

/// Canonicalized `METHOD url` identity of a request.
///
/// The fragment is dropped and the host lowercased; the query string is
/// kept as sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        if let Some(host) = url.host_str().map(str::to_lowercase) {
            // Only fails for URLs that cannot carry a host, which host_str() already excluded.
            let _ = url.set_host(Some(&host));
        }
        Self(format!("{} {}", method.as_str(), url))
    }

    /// Key for a GET of `url`.
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::Get, url)
    }

    pub fn for_request(request: &Request) -> Self {
        Self::new(&request.method, &request.url)
    }

    /// Rebuild a key from its stored text form.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 hex digest of the key, used as the storage primary key.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_key_stability() {
        let k1 = RequestKey::get(&url("https://example.com/icons/a.png"));
        let k2 = RequestKey::get(&url("https://example.com/icons/a.png"));
        assert_eq!(k1, k2);
        assert_eq!(k1.digest(), k2.digest());
    }

    #[test]
    fn test_key_drops_fragment() {
        let key = RequestKey::get(&url("https://example.com/index.html#top"));
        assert_eq!(key.as_str(), "GET https://example.com/index.html");
    }

    #[test]
    fn test_key_lowercases_host() {
        let key = RequestKey::get(&url("https://EXAMPLE.com/a"));
        assert_eq!(key, RequestKey::get(&url("https://example.com/a")));
    }

    #[test]
    fn test_key_preserves_query() {
        let a = RequestKey::get(&url("https://example.com/api?mood=happy"));
        let b = RequestKey::get(&url("https://example.com/api?mood=sad"));
        assert_ne!(a, b);
        assert!(a.as_str().ends_with("?mood=happy"));
    }

    #[test]
    fn test_key_includes_method() {
        let get = RequestKey::new(&Method::Get, &url("https://example.com/api"));
        let post = RequestKey::new(&Method::Post, &url("https://example.com/api"));
        assert_ne!(get, post);
        assert_ne!(get.digest(), post.digest());
    }

    #[test]
    fn test_digest_format() {
        let digest = RequestKey::get(&url("https://example.com")).digest();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
