//! Configuration validation rules.
//!
//! Run after every load so a bad build configuration fails before the
//! worker is ever installed.

use std::collections::HashSet;

use crate::config::WorkerConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - `cache_prefix` is empty or either version is 0
    /// - any path is not absolute, or `icon_dir` lacks a trailing `/`
    /// - `precache` is empty or lists a path twice
    /// - `timeout_ms` is outside 100ms..=5min or `max_bytes` outside 1..=50MB
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.static_version == 0 {
            return Err(invalid("static_version", "must be greater than 0"));
        }
        if self.runtime_version == 0 {
            return Err(invalid("runtime_version", "must be greater than 0"));
        }

        for (field, path) in
            [("entry_document", &self.entry_document), ("web_manifest", &self.web_manifest), ("icon_dir", &self.icon_dir)]
        {
            if !path.starts_with('/') {
                return Err(invalid(field, "must be an absolute path"));
            }
        }
        if !self.icon_dir.ends_with('/') {
            return Err(invalid("icon_dir", "must end with '/'"));
        }

        if self.precache.is_empty() {
            return Err(invalid("precache", "must list at least one path"));
        }
        let mut seen = HashSet::new();
        for path in &self.precache {
            if !path.starts_with('/') {
                return Err(invalid("precache", format!("{path} is not an absolute path")));
            }
            if !seen.insert(path.as_str()) {
                return Err(invalid("precache", format!("{path} is listed twice")));
            }
        }
        if !seen.contains(self.entry_document.as_str()) {
            tracing::warn!(
                entry_document = %self.entry_document,
                "precache does not include the entry document; offline navigation needs one online visit first"
            );
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        Ok(())
    }
}
