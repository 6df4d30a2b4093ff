//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Named-cache storage with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry};
pub use config::AppConfig;
pub use error::Error;
