//! Partitioned response cache.
//!
//! Responses are stored in named partitions under a canonical request key.
//! Two stores implement the [`CacheStore`] contract:
//!
//! - [`CacheDb`]: durable, SQLite via tokio-rusqlite (WAL, migrations)
//! - [`MemoryStore`]: in-process, for embedding and tests

pub mod connection;
pub mod key;
pub mod memory;
pub mod migrations;
pub mod partitions;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::RequestKey;
pub use memory::MemoryStore;
pub use store::{CacheStore, PartitionHandle};
