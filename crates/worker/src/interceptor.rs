//! Fetch interceptor: cache-first lookup with network fallback.
//!
//! Each intercepted request is handled independently and statelessly. A
//! cache hit replays the stored response without touching the network; a
//! miss issues exactly one network fetch and returns its response
//! unmodified, status included. Misses are never written back to the cache
//! (no lazy population), so the cache stays read-only at steady state.

use swcache_client::{AssetFetcher, FetchResponse, Url};
use swcache_core::{CacheDb, CacheEntry, Error};

/// Outcome of intercepting a request.
#[derive(Debug)]
pub enum Intercepted {
    /// Served from the cache; the network was not consulted.
    Hit(CacheEntry),
    /// Cache miss; the live network response, passed through unmodified.
    Network(FetchResponse),
}

/// Intercept a request for `url`.
///
/// # Errors
///
/// A miss with the network unreachable propagates the fetch error to the
/// caller, which surfaces as the failed response for that request.
pub async fn handle(
    db: &CacheDb, fetcher: &dyn AssetFetcher, cache_name: &str, url: &Url,
) -> Result<Intercepted, Error> {
    if let Some(entry) = db.match_url(cache_name, url.as_str()).await? {
        tracing::debug!(%url, cache = cache_name, "cache hit");
        return Ok(Intercepted::Hit(entry));
    }

    tracing::debug!(%url, cache = cache_name, "cache miss, fetching from network");
    let response = fetcher.fetch(url).await?;
    Ok(Intercepted::Network(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install;
    use crate::stub::StubFetcher;
    use swcache_core::AppConfig;

    async fn installed_db(fetcher: &StubFetcher) -> CacheDb {
        let db = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig::default();
        install::run(&db, fetcher, &config).await.unwrap();
        db
    }

    fn shell_routes() -> Vec<(&'static str, &'static str)> {
        vec![
            ("http://localhost:8000/", "text/html"),
            ("http://localhost:8000/index.html", "text/html"),
            ("http://localhost:8000/app.js", "application/javascript"),
            ("http://localhost:8000/app.wasm", "application/wasm"),
        ]
    }

    #[tokio::test]
    async fn test_hit_serves_cached_without_network() {
        let install_fetcher = StubFetcher::serving(&shell_routes());
        let db = installed_db(&install_fetcher).await;

        // A separate fetcher for steady state, so install calls don't count.
        let fetcher = StubFetcher::serving(&shell_routes());
        let url = Url::parse("http://localhost:8000/index.html").unwrap();

        let result = handle(&db, &fetcher, "epe", &url).await.unwrap();
        match result {
            Intercepted::Hit(entry) => {
                assert_eq!(entry.url, "http://localhost:8000/index.html");
                assert_eq!(entry.status, 200);
                assert_eq!(entry.body, StubFetcher::body_for("http://localhost:8000/index.html"));
            }
            Intercepted::Network(_) => panic!("expected cache hit"),
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_hit_even_when_offline() {
        let install_fetcher = StubFetcher::serving(&shell_routes());
        let db = installed_db(&install_fetcher).await;

        let fetcher = StubFetcher::offline();
        let url = Url::parse("http://localhost:8000/app.wasm").unwrap();

        let result = handle(&db, &fetcher, "epe", &url).await.unwrap();
        assert!(matches!(result, Intercepted::Hit(_)));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_exactly_once() {
        let install_fetcher = StubFetcher::serving(&shell_routes());
        let db = installed_db(&install_fetcher).await;

        let mut routes = shell_routes();
        routes.push(("http://localhost:8000/extra.css", "text/css"));
        let fetcher = StubFetcher::serving(&routes);
        let url = Url::parse("http://localhost:8000/extra.css").unwrap();

        let result = handle(&db, &fetcher, "epe", &url).await.unwrap();
        match result {
            Intercepted::Network(response) => {
                assert_eq!(response.status.as_u16(), 200);
                assert_eq!(response.content_type.as_deref(), Some("text/css"));
                assert_eq!(&response.bytes[..], StubFetcher::body_for("http://localhost:8000/extra.css"));
            }
            Intercepted::Hit(_) => panic!("expected network passthrough"),
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_miss_passes_through_error_status() {
        let install_fetcher = StubFetcher::serving(&shell_routes());
        let db = installed_db(&install_fetcher).await;

        let fetcher = StubFetcher::serving(&shell_routes());
        let url = Url::parse("http://localhost:8000/unknown.png").unwrap();

        let result = handle(&db, &fetcher, "epe", &url).await.unwrap();
        match result {
            Intercepted::Network(response) => assert_eq!(response.status.as_u16(), 404),
            Intercepted::Hit(_) => panic!("expected network passthrough"),
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_miss_does_not_populate_cache() {
        let install_fetcher = StubFetcher::serving(&shell_routes());
        let db = installed_db(&install_fetcher).await;

        let mut routes = shell_routes();
        routes.push(("http://localhost:8000/extra.css", "text/css"));
        let fetcher = StubFetcher::serving(&routes);
        let url = Url::parse("http://localhost:8000/extra.css").unwrap();

        handle(&db, &fetcher, "epe", &url).await.unwrap();
        handle(&db, &fetcher, "epe", &url).await.unwrap();

        // No lazy population: both requests went to the network.
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(db.entry_count("epe").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_miss_offline_fails() {
        let install_fetcher = StubFetcher::serving(&shell_routes());
        let db = installed_db(&install_fetcher).await;

        let fetcher = StubFetcher::offline();
        let url = Url::parse("http://localhost:8000/unknown.png").unwrap();

        let result = handle(&db, &fetcher, "epe", &url).await;
        assert!(matches!(result, Err(Error::HttpError(_))));
        assert_eq!(fetcher.calls(), 1);
    }
}
