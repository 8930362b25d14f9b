//! Client-side interception and caching layer for a single-page app.
//!
//! A [`ShellWorker`] is one deployed version. The host drives it through
//! three checkpoints:
//!
//! 1. [`ShellWorker::on_install`] precaches the app shell into the static
//!    partition of this version.
//! 2. [`ShellWorker::on_activate`] deletes every partition belonging to
//!    other versions.
//! 3. [`ShellWorker::on_fetch`] classifies each outgoing request and answers
//!    it with the matching [`Strategy`], or lets it pass through.

pub mod classify;
pub mod lifecycle;
pub mod manifest;
pub mod precache;
pub mod strategy;
pub mod telemetry;
pub mod version;

#[cfg(test)]
mod testing;

pub use classify::{Route, Router};
pub use lifecycle::{ActivateOutcome, FetchOutcome, InstallOutcome, ShellWorker, WorkerState};
pub use manifest::Manifest;
pub use precache::PrecacheLoader;
pub use strategy::{Handled, PendingWrite, ResponseSource, Strategy};
pub use version::{PurgeFailure, PurgeReport, VersionManager};
