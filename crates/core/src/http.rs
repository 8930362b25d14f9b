//! Request and response model seen by the interception layer.
//!
//! A [`Response`] body is an immutable [`Bytes`] buffer, so cloning a
//! response is the "duplicate before storing" operation: both copies can be
//! read independently and neither can be consumed out from under the other.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Other(m) => m,
        }
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Ok(match upper.as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            _ => Method::Other(upper),
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the request was initiated by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

/// Transport-level cache directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    /// Bypass every intermediate HTTP cache so the origin is really consulted.
    NoStore,
}

/// An intercepted (or internally issued) request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub cache: CacheMode,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Build a plain GET request.
    pub fn get(url: Url) -> Self {
        Self { method: Method::Get, url, mode: RequestMode::default(), cache: CacheMode::default(), headers: Vec::new() }
    }

    /// Parse `url` and build a request with the given method.
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        let method = method.parse().unwrap_or(Method::Get);
        Ok(Self { method, ..Self::get(url) })
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Whether the target is reachable over the network at all.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }
}

/// Response type, mirroring the platform distinction between real and error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    #[default]
    Basic,
    /// Synthetic network-error response.
    Error,
}

/// A response snapshot: status, headers and a fully buffered body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub kind: ResponseKind,
    pub status: u16,
    pub status_text: String,
    pub url: Option<Url>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    /// A basic response with the given status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            kind: ResponseKind::Basic,
            status,
            status_text: String::new(),
            url: None,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// The generic network-error response: status 0, no headers, empty body.
    pub fn error() -> Self {
        Self { kind: ResponseKind::Error, ..Self::new(0, Bytes::new()) }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// True for 200..=299 on a non-error response.
    pub fn is_ok(&self) -> bool {
        self.kind == ResponseKind::Basic && (200..=299).contains(&self.status)
    }

    pub fn is_error(&self) -> bool {
        self.kind == ResponseKind::Error
    }

    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
