//! Install step: pre-populate the named cache with the application shell.
//!
//! Fetches every asset in the configured list and stores all of them in one
//! transaction. Any single failure (network error or non-success status)
//! fails the whole install and leaves the cache unpopulated, matching
//! `Cache.addAll` semantics: a 404 on one of four assets must not silently
//! cache the other three.

use std::collections::BTreeMap;
use std::path::Path;

use swcache_client::{AssetFetcher, HeaderMap, fetch::resolve};
use swcache_core::{AppConfig, CacheDb, CacheEntry, Error};

/// Run the install step.
///
/// Opens (creating if absent) the cache named by configuration, fetches
/// every URL in the asset list, and stores the captured responses keyed by
/// canonical URL. No retry logic.
pub async fn run(db: &CacheDb, fetcher: &dyn AssetFetcher, config: &AppConfig) -> Result<(), Error> {
    let origin = url::Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let assets = asset_list(config)?;

    db.open_cache(&config.cache_name).await?;

    let mut entries = Vec::with_capacity(assets.len());
    for path in &assets {
        let url = resolve(&origin, path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let response = fetcher
            .fetch(&url)
            .await
            .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;

        if !response.status.is_success() {
            return Err(Error::InstallFailed(format!(
                "status {} for {path}",
                response.status.as_u16()
            )));
        }

        let mut entry = CacheEntry::new(
            &config.cache_name,
            url.as_str(),
            response.status.as_u16(),
            response.content_type.clone(),
            response.bytes.to_vec(),
        );
        entry.headers_json = headers_to_json(&response.headers);
        entries.push(entry);
    }

    let count = entries.len();
    db.insert_entries(entries).await?;

    tracing::info!(cache = %config.cache_name, entries = count, "install complete");

    Ok(())
}

/// Resolve the asset list: the precache manifest when configured,
/// otherwise the inline config list.
fn asset_list(config: &AppConfig) -> Result<Vec<String>, Error> {
    match &config.manifest_path {
        Some(path) => read_manifest(path),
        None => Ok(config.precache.clone()),
    }
}

/// Read a JSON precache manifest: an array of relative asset paths.
fn read_manifest(path: &Path) -> Result<Vec<String>, Error> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::ManifestError(format!("{}: {e}", path.display())))?;
    let assets: Vec<String> =
        serde_json::from_str(&raw).map_err(|e| Error::ManifestError(format!("{}: {e}", path.display())))?;
    if assets.is_empty() {
        tracing::warn!(manifest = %path.display(), "precache manifest is empty; install will cache nothing");
    }
    Ok(assets)
}

/// Serialize response headers for storage.
///
/// Non-UTF-8 header values are dropped rather than failing the install.
fn headers_to_json(headers: &HeaderMap) -> Option<String> {
    let map: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect();
    serde_json::to_string(&map).ok()
}
