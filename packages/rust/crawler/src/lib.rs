//! Page retrieval for lead enrichment.
//!
//! This crate provides:
//! - [`PageFetcher`]: the fetch capability the pipeline depends on
//! - [`HttpFetcher`]: the `reqwest` implementation with browser identity,
//!   bounded timeout, capped redirects and SSRF protection

pub mod fetcher;

pub use fetcher::{HttpFetcher, PageFetcher};
