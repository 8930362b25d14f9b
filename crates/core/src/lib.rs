//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - The request/response model seen by the interception layer
//! - Partitioned cache stores (SQLite and in-memory)
//! - The network transport contract
//! - Unified error types
//! - Worker configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;

pub use cache::{CacheDb, CacheStore, MemoryStore, PartitionHandle, RequestKey};
pub use config::{ConfigError, PartitionNames, WorkerConfig};
pub use error::Error;
pub use http::{CacheMode, Method, Request, RequestMode, Response, ResponseKind};
pub use transport::Transport;
