//! Cache entry key generation.

use sha2::{Digest, Sha256};

/// Compute the entry key for a URL within a named cache.
///
/// Keys are scoped to the cache name so the same URL can live in
/// several caches without colliding.
pub fn entry_key(cache_name: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cache_name.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = entry_key("epe", "https://example.com/index.html");
        let key2 = entry_key("epe", "https://example.com/index.html");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_different_cache() {
        let key1 = entry_key("epe", "https://example.com/index.html");
        let key2 = entry_key("other", "https://example.com/index.html");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_key_different_url() {
        let key1 = entry_key("epe", "https://example.com/app.js");
        let key2 = entry_key("epe", "https://example.com/app.wasm");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_key_format() {
        let key = entry_key("epe", "https://example.com/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
