//! Structured logging for hosts embedding the worker.

use tracing_subscriber::EnvFilter;

/// Install a JSON subscriber writing to stderr.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Calling this more than
/// once, or after the host installed its own subscriber, is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();

    if installed.is_ok() {
        tracing::debug!("telemetry initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }
}
