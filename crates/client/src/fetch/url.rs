//! Target URL checks applied before any network I/O.

/// Error type for unreachable request targets.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

/// Normalize a request URL into the form sent on the wire.
///
/// 1. Reject anything but http/https (the `url` crate already refuses
///    http/https URLs without a host)
/// 2. Remove the fragment, which is never sent to the origin
/// 3. Keep the query string intact (do not reorder)
pub fn target_url(input: &url::Url) -> Result<url::Url, UrlError> {
    match input.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let mut target = input.clone();
    target.set_fragment(None);
    Ok(target)
}
