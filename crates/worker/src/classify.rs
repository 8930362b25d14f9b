//! Per-request route classification.
//!
//! Pure and stateless: the same request attributes always yield the same route.

use shellcache_core::{Request, WorkerConfig};
use url::{Origin, Url};

use crate::strategy::Strategy;

/// Where an intercepted request is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; the host handles it natively.
    Passthrough,
    /// Top-level navigation.
    Navigation,
    /// Same-origin icon or web-app manifest.
    StaticAsset,
    /// Everything else (APIs, cross-origin assets, ...).
    Generic,
}

impl Route {
    /// Strategy for this route, or `None` for passthrough.
    pub fn strategy(self) -> Option<Strategy> {
        match self {
            Route::Passthrough => None,
            Route::Navigation => Some(Strategy::ShellRefresh),
            Route::StaticAsset => Some(Strategy::CacheFirst),
            Route::Generic => Some(Strategy::NetworkFirst),
        }
    }
}

/// Classifies requests against the worker's origin and static asset paths.
#[derive(Debug, Clone)]
pub struct Router {
    origin: Origin,
    icon_dir: String,
    web_manifest: String,
}

impl Router {
    pub fn new(origin: &Url, icon_dir: impl Into<String>, web_manifest: impl Into<String>) -> Self {
        Self { origin: origin.origin(), icon_dir: icon_dir.into(), web_manifest: web_manifest.into() }
    }

    pub fn from_config(config: &WorkerConfig, origin: &Url) -> Self {
        Self::new(origin, config.icon_dir.as_str(), config.web_manifest.as_str())
    }

    pub fn classify(&self, request: &Request) -> Route {
        if !request.is_http() {
            return Route::Passthrough;
        }
        if request.is_navigation() {
            return Route::Navigation;
        }

        let path = request.url.path();
        if request.url.origin() == self.origin && (path.starts_with(&self.icon_dir) || path == self.web_manifest) {
            return Route::StaticAsset;
        }

        Route::Generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellcache_core::{Method, RequestMode};

    fn router() -> Router {
        Router::new(&Url::parse("https://moodmusic.test").unwrap(), "/icons/", "/manifest.json")
    }

    fn req(url: &str) -> Request {
        Request::parse("GET", url).unwrap()
    }

    #[test]
    fn test_non_http_is_passthrough() {
        let router = router();
        for url in ["chrome-extension://abc/script.js", "data:text/plain,hi", "blob:https://moodmusic.test/1"] {
            let request = req(url).with_mode(RequestMode::Navigate).with_method(Method::Post);
            assert_eq!(router.classify(&request), Route::Passthrough, "{url}");
        }
    }

    #[test]
    fn test_navigation_wins_over_static_path() {
        let request = req("https://moodmusic.test/manifest.json").with_mode(RequestMode::Navigate);
        assert_eq!(router().classify(&request), Route::Navigation);
    }

    #[test]
    fn test_cross_origin_navigation() {
        let request = req("https://other.test/").with_mode(RequestMode::Navigate);
        assert_eq!(router().classify(&request), Route::Navigation);
    }

    #[test]
    fn test_same_origin_icons_and_manifest() {
        let router = router();
        assert_eq!(router.classify(&req("https://moodmusic.test/icons/MM192x192.png")), Route::StaticAsset);
        assert_eq!(router.classify(&req("https://moodmusic.test/manifest.json")), Route::StaticAsset);
    }

    #[test]
    fn test_manifest_path_must_match_exactly() {
        let router = router();
        assert_eq!(router.classify(&req("https://moodmusic.test/manifest.json.bak")), Route::Generic);
        assert_eq!(router.classify(&req("https://moodmusic.test/iconsX/a.png")), Route::Generic);
    }

    #[test]
    fn test_cross_origin_icon_is_generic() {
        assert_eq!(router().classify(&req("https://cdn.test/icons/a.png")), Route::Generic);
        assert_eq!(router().classify(&req("http://moodmusic.test/icons/a.png")), Route::Generic);
    }

    #[test]
    fn test_api_is_generic() {
        assert_eq!(router().classify(&req("http://localhost:5000/api/recommend?mood=happy")), Route::Generic);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let router = router();
        let request = req("https://moodmusic.test/icons/MM256x256.png");
        assert_eq!(router.classify(&request), router.classify(&request.clone()));
    }

    #[test]
    fn test_route_strategy() {
        assert_eq!(Route::Passthrough.strategy(), None);
        assert_eq!(Route::Navigation.strategy(), Some(Strategy::ShellRefresh));
        assert_eq!(Route::StaticAsset.strategy(), Some(Strategy::CacheFirst));
        assert_eq!(Route::Generic.strategy(), Some(Strategy::NetworkFirst));
    }
}
