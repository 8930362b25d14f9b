//! Fixed list of shell assets precached at install.

use shellcache_core::{Error, WorkerConfig};
use url::Url;

/// Ordered shell paths, each resolved against the worker origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<(String, Url)>,
}

impl Manifest {
    /// Resolve `paths` against `origin`, keeping their order.
    pub fn new<'a>(origin: &Url, paths: impl IntoIterator<Item = &'a str>) -> Result<Self, Error> {
        let entries = paths
            .into_iter()
            .map(|path| {
                origin
                    .join(path)
                    .map(|url| (path.to_string(), url))
                    .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn from_config(config: &WorkerConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Self::new(&origin, config.precache.iter().map(String::as_str))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    /// `(path, absolute url)` pairs in manifest order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.entries.iter().map(|(path, url)| (path.as_str(), url))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|(p, _)| p == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
