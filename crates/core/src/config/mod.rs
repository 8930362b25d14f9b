//! Worker configuration with layered loading.
//!
//! Uses figment to layer, lowest to highest precedence:
//!
//! 1. Built-in defaults (the shipped build)
//! 2. A TOML file supplied by the host, if any
//!
//! The layer itself reads no environment variables; the host decides
//! where configuration comes from.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Build-time configuration of one worker version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Origin the worker is registered for. Requests to other origins are
    /// never classified as static assets.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every partition name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version of the shell partition. Bump on every shell change.
    #[serde(default = "default_static_version")]
    pub static_version: u32,

    /// Version of the runtime partition.
    #[serde(default = "default_runtime_version")]
    pub runtime_version: u32,

    /// Entry document served for every navigation.
    #[serde(default = "default_entry_document")]
    pub entry_document: String,

    /// Web-app manifest path, served cache-first.
    #[serde(default = "default_web_manifest")]
    pub web_manifest: String,

    /// Directory of icons, served cache-first. Must end in `/`.
    #[serde(default = "default_icon_dir")]
    pub icon_dir: String,

    /// Shell paths fetched at install, in order.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Path to the SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest response body written to the cache. Bigger responses are
    /// still served, and a bigger manifest asset fails the install.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_prefix() -> String {
    "mm".into()
}

fn default_static_version() -> u32 {
    2
}

fn default_runtime_version() -> u32 {
    1
}

fn default_entry_document() -> String {
    "/index.html".into()
}

fn default_web_manifest() -> String {
    "/manifest.json".into()
}

fn default_icon_dir() -> String {
    "/icons/".into()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/icons/MM192x192.png",
        "/icons/MM256x256.png",
        "/icons/MM384x384.png",
        "/icons/MM512x512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            static_version: default_static_version(),
            runtime_version: default_runtime_version(),
            entry_document: default_entry_document(),
            web_manifest: default_web_manifest(),
            icon_dir: default_icon_dir(),
            precache: default_precache(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

/// The two partition names owned by one worker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    pub static_name: String,
    pub runtime_name: String,
}

impl PartitionNames {
    /// Both names, static first.
    pub fn all(&self) -> [&str; 2] {
        [&self.static_name, &self.runtime_name]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.static_name == name || self.runtime_name == name
    }

    /// Scratch partition an install writes into before it is promoted.
    pub fn staging_name(&self) -> String {
        format!("{}.staging", self.static_name)
    }
}

impl WorkerConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Partition names for this version, e.g. `mm-static-v2` and `mm-runtime-v1`.
    pub fn partition_names(&self) -> PartitionNames {
        PartitionNames {
            static_name: format!("{}-static-v{}", self.cache_prefix, self.static_version),
            runtime_name: format!("{}-runtime-v{}", self.cache_prefix, self.runtime_version),
        }
    }

    /// Parsed origin URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration: defaults, overlaid with the TOML file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::LoadFailed(format!("{} does not exist", path.display())));
            }
            figment = figment.merge(Toml::file(path));
        }

        Self::extract(figment)
    }

    /// Load configuration from an in-memory TOML document layered over the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::extract(Figment::from(Serialized::defaults(Self::default())).merge(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
