//! SQLite-backed storage for named response caches.
//!
//! This module provides a persistent cache using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Named caches with open-or-create semantics
//! - URL-keyed response entries (SHA-256 keys)
//! - Single-transaction bulk population (all-or-nothing install)
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
