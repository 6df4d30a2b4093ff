//! Cache entry operations.
//!
//! Provides functions for opening named caches, populating them with
//! captured responses, and matching requests against stored entries.

use super::connection::CacheDb;
use super::hash::entry_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A captured response stored in a named cache.
///
/// Keyed by the canonical request URL; holds everything needed to
/// replay the response without touching the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub cache_name: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub fetched_at: String,
}

impl CacheEntry {
    /// Build an entry for a cache, deriving the key from the URL.
    pub fn new(cache_name: &str, url: &str, status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            key: entry_key(cache_name, url),
            cache_name: cache_name.to_string(),
            url: url.to_string(),
            status,
            content_type,
            headers_json: None,
            body,
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl CacheDb {
    /// Open a named cache, creating it if absent.
    pub async fn open_cache(&self, name: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("cache name must not be empty".to_string()));
        }
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO caches (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert a batch of entries in a single transaction.
    ///
    /// All-or-nothing: if any insert fails the transaction rolls back and
    /// the cache is left exactly as it was. Uses UPSERT semantics per key,
    /// so re-installing refreshes existing entries.
    pub async fn insert_entries(&self, entries: Vec<CacheEntry>) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for entry in &entries {
                    tx.execute(
                        "INSERT INTO entries (
                            key, cache_name, url, status, content_type,
                            headers_json, body, fetched_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                        ON CONFLICT(cache_name, key) DO UPDATE SET
                            url = excluded.url,
                            status = excluded.status,
                            content_type = excluded.content_type,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            fetched_at = excluded.fetched_at",
                        params![
                            &entry.key,
                            &entry.cache_name,
                            &entry.url,
                            entry.status,
                            &entry.content_type,
                            &entry.headers_json,
                            &entry.body,
                            &entry.fetched_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Match a URL against a named cache.
    ///
    /// Returns None on a cache miss.
    pub async fn match_url(&self, cache_name: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        let cache_name = cache_name.to_string();
        let key = entry_key(&cache_name, url);
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT
                        key, cache_name, url, status, content_type,
                        headers_json, body, fetched_at
                    FROM entries WHERE cache_name = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![cache_name, key], |row| {
                    Ok(CacheEntry {
                        key: row.get(0)?,
                        cache_name: row.get(1)?,
                        url: row.get(2)?,
                        status: row.get(3)?,
                        content_type: row.get(4)?,
                        headers_json: row.get(5)?,
                        body: row.get(6)?,
                        fetched_at: row.get(7)?,
                    })
                });

                match result {
                    Ok(e) => Ok(Some(e)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List the URLs stored in a named cache, in insertion order.
    pub async fn entry_keys(&self, cache_name: &str) -> Result<Vec<String>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM entries WHERE cache_name = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![cache_name], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Count the entries in a named cache.
    pub async fn entry_count(&self, cache_name: &str) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE cache_name = ?1",
                    params![cache_name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a named cache and all its entries.
    ///
    /// Returns the number of entries removed. Entries go with the cache
    /// via the foreign key cascade.
    pub async fn delete_cache(&self, cache_name: &str) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE cache_name = ?1",
                    params![cache_name],
                    |row| row.get(0),
                )?;
                conn.execute("DELETE FROM caches WHERE name = ?1", params![cache_name])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
