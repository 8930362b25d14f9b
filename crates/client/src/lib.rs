//! Network side of shellcache.
//!
//! This crate provides the reqwest-backed [`Transport`](shellcache_core::Transport)
//! the worker uses to reach the origin.

pub mod fetch;

pub use fetch::{FetchConfig, HttpTransport, UrlError, target_url};
