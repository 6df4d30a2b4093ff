//! Counting stub fetcher for handler tests.
//!
//! Stands in for the network so tests can assert exactly how many fetches
//! a code path performs (zero on cache hit, one on miss).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use swcache_client::{AssetFetcher, FetchResponse, HeaderMap, StatusCode, Url};
use swcache_core::Error;

pub struct StubFetcher {
    routes: HashMap<String, (String, Vec<u8>)>,
    offline: bool,
    calls: AtomicUsize,
}

impl StubFetcher {
    /// A stub that answers 200 with a deterministic body for the given
    /// (url, content type) routes, and 404 for anything else.
    pub fn serving(routes: &[(&str, &str)]) -> Self {
        let routes = routes
            .iter()
            .map(|(url, ct)| ((*url).to_string(), ((*ct).to_string(), Self::body_for(url))))
            .collect();
        Self { routes, offline: false, calls: AtomicUsize::new(0) }
    }

    /// A stub where every fetch fails with a network error.
    pub fn offline() -> Self {
        Self { routes: HashMap::new(), offline: true, calls: AtomicUsize::new(0) }
    }

    /// The body the stub serves for a URL.
    pub fn body_for(url: &str) -> Vec<u8> {
        format!("stub body for {url}").into_bytes()
    }

    /// Number of fetches performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetFetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.offline {
            return Err(Error::HttpError(format!("network unreachable: {url}")));
        }

        let (status, content_type, body) = match self.routes.get(url.as_str()) {
            Some((ct, body)) => (StatusCode::OK, Some(ct.clone()), body.clone()),
            None => (StatusCode::NOT_FOUND, None, Vec::new()),
        };

        Ok(FetchResponse {
            url: url.clone(),
            final_url: url.clone(),
            status,
            content_type,
            bytes: Bytes::from(body),
            headers: HeaderMap::new(),
            fetch_ms: 0,
        })
    }
}
