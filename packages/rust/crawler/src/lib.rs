//! Page fetching for SiteScout research jobs.
//!
//! This crate provides:
//! - [`candidates`] — the fixed, ordered list of URLs probed per domain
//! - [`fetcher`] — single-page fetch with timeout, size cap, and retry
//! - [`engine`] — concurrency-capped orchestration with early stopping

pub mod candidates;
pub mod engine;
pub mod fetcher;

pub use candidates::{CANDIDATE_PATHS, build_urls, build_urls_with_scheme};
pub use engine::{FetchLimits, FetchOrchestrator};
pub use fetcher::{PageFetcher, PageSource, backoff_delay};
