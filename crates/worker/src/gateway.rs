//! HTTP gateway: the host-environment side of the worker.
//!
//! A fallback route maps every incoming request path onto the configured
//! origin and hands it to the interceptor. Cache hits and network
//! passthroughs are rebuilt into HTTP responses; interceptor failures
//! surface as 502 Bad Gateway. Each request is handled independently, and
//! nothing here writes to the cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use swcache_client::{AssetFetcher, FetchResponse, Url, fetch::canonicalize};
use swcache_core::{AppConfig, CacheDb, CacheEntry, Error};

use crate::interceptor::{self, Intercepted};

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    db: CacheDb,
    fetcher: Arc<dyn AssetFetcher>,
    cache_name: String,
    origin: Url,
}

impl GatewayState {
    pub fn new(db: CacheDb, fetcher: Arc<dyn AssetFetcher>, config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { db, fetcher, cache_name: config.cache_name.clone(), origin })
    }
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new().fallback(intercept).with_state(state)
}

/// Bind and serve the gateway until the process is stopped.
pub async fn serve(state: GatewayState, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = bind_addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn intercept(State(state): State<GatewayState>, uri: Uri) -> Response {
    let url = match request_url(&state.origin, &uri) {
        Ok(url) => url,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match interceptor::handle(&state.db, state.fetcher.as_ref(), &state.cache_name, &url).await {
        Ok(Intercepted::Hit(entry)) => entry_response(&entry),
        Ok(Intercepted::Network(response)) => network_response(&response),
        Err(e) => {
            tracing::warn!(%url, error = %e, "intercepted request failed");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

/// Map an incoming request URI onto the configured origin.
///
/// The path and query carry over; the canonical result is the cache key
/// the install step stored entries under. The joined URL must stay on the
/// configured origin: a request target like `//evil.com/steal` is a
/// network-path reference that `Url::join` would resolve onto another
/// host, turning the gateway into an open proxy.
fn request_url(origin: &Url, uri: &Uri) -> Result<Url, Error> {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let joined = origin.join(path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let url = canonicalize(joined.as_str()).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    if !same_origin(&url, origin) {
        return Err(Error::InvalidUrl(format!("request not on configured origin: {path}")));
    }

    Ok(url)
}

/// Whether two URLs share scheme, host, and effective port.
fn same_origin(url: &Url, origin: &Url) -> bool {
    url.scheme() == origin.scheme()
        && url.host_str() == origin.host_str()
        && url.port_or_known_default() == origin.port_or_known_default()
}

/// Headers that must not be replayed from storage: the stored body is
/// already decoded, and framing is the server's business.
fn replayable(name: &str) -> bool {
    !matches!(
        name.to_ascii_lowercase().as_str(),
        "content-length" | "content-encoding" | "transfer-encoding" | "connection" | "content-type"
    )
}

/// Rebuild an HTTP response from a stored cache entry.
fn entry_response(entry: &CacheEntry) -> Response {
    let mut builder = Response::builder().status(entry.status);

    if let Some(ct) = &entry.content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }

    if let Some(json) = &entry.headers_json
        && let Ok(map) = serde_json::from_str::<BTreeMap<String, String>>(json)
    {
        for (name, value) in map {
            if replayable(&name) {
                builder = builder.header(&name, &value);
            }
        }
    }

    match builder.body(Body::from(entry.body.clone())) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(url = %entry.url, error = %e, "failed to rebuild cached response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Pass a live network response through unmodified.
fn network_response(response: &FetchResponse) -> Response {
    let mut builder = Response::builder().status(response.status.as_u16());

    if let Some(ct) = &response.content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }

    for (name, value) in response.headers.iter() {
        if replayable(name.as_str())
            && let Ok(v) = value.to_str()
        {
            builder = builder.header(name.as_str(), v);
        }
    }

    match builder.body(Body::from(response.bytes.clone())) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(url = %response.url, error = %e, "failed to rebuild network response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_request_url_root() {
        let origin = Url::parse("http://localhost:8000").unwrap();
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(request_url(&origin, &uri).unwrap().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_request_url_path_and_query() {
        let origin = Url::parse("http://localhost:8000").unwrap();
        let uri: Uri = "/app.js?v=2".parse().unwrap();
        assert_eq!(
            request_url(&origin, &uri).unwrap().as_str(),
            "http://localhost:8000/app.js?v=2"
        );
    }

    #[test]
    fn test_request_url_rejects_network_path_reference() {
        let origin = Url::parse("http://localhost:8000").unwrap();
        // Raw request line "GET //evil.com/steal HTTP/1.1" arrives as an
        // origin-form target whose path starts with "//".
        let uri = Uri::builder().path_and_query("//evil.com/steal").build().unwrap();
        let result = request_url(&origin, &uri);
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_request_url_rejects_network_path_reference_with_query() {
        let origin = Url::parse("http://localhost:8000").unwrap();
        let uri = Uri::builder().path_and_query("//evil.com/steal?a=1").build().unwrap();
        assert!(request_url(&origin, &uri).is_err());
    }

    #[test]
    fn test_same_origin_requires_matching_host() {
        let origin = Url::parse("http://localhost:8000").unwrap();
        assert!(!same_origin(&Url::parse("http://evil.com/steal").unwrap(), &origin));
        assert!(same_origin(&Url::parse("http://localhost:8000/app.js").unwrap(), &origin));
    }

    #[test]
    fn test_same_origin_requires_matching_port_and_scheme() {
        let origin = Url::parse("http://localhost:8000").unwrap();
        assert!(!same_origin(&Url::parse("http://localhost:9000/").unwrap(), &origin));
        assert!(!same_origin(&Url::parse("https://localhost:8000/").unwrap(), &origin));

        // Default ports count as equal to explicit ones.
        let https_origin = Url::parse("https://app.example.com").unwrap();
        assert!(same_origin(&Url::parse("https://app.example.com:443/x").unwrap(), &https_origin));
    }

    #[test]
    fn test_replayable_filters_framing_headers() {
        assert!(!replayable("Content-Length"));
        assert!(!replayable("content-encoding"));
        assert!(!replayable("transfer-encoding"));
        assert!(replayable("etag"));
        assert!(replayable("cache-control"));
    }

    #[tokio::test]
    async fn test_entry_response_replays_stored_fields() {
        let mut entry = CacheEntry::new(
            "epe",
            "http://localhost:8000/index.html",
            200,
            Some("text/html".to_string()),
            b"<html></html>".to_vec(),
        );
        entry.headers_json = Some(r#"{"etag":"\"abc\"","content-length":"999"}"#.to_string());

        let response = entry_response(&entry);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/html");
        assert_eq!(response.headers().get(header::ETAG).unwrap(), "\"abc\"");
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none() || {
            // axum may set framing itself, but never from the stored value
            response.headers().get(header::CONTENT_LENGTH).unwrap() != "999"
        });

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<html></html>");
    }

    #[tokio::test]
    async fn test_entry_response_error_status() {
        let entry = CacheEntry::new("epe", "http://localhost:8000/gone", 410, None, Vec::new());
        let response = entry_response(&entry);
        assert_eq!(response.status(), StatusCode::GONE);
    }
}
