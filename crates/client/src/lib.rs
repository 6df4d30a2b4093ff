//! Client code for swcache.
//!
//! This crate provides the HTTP fetch pipeline used by the install handler
//! and the fetch interceptor, plus the trait seam that lets tests stand in
//! for the network.

pub mod fetch;

pub use fetch::{AssetFetcher, FetchClient, FetchConfig, FetchResponse};

pub use reqwest::{StatusCode, Url, header::HeaderMap};
