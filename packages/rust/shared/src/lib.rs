//! Shared types, error model, and configuration for SiteScout.
//!
//! This crate is the foundation depended on by all other SiteScout crates.
//! It provides:
//! - [`SiteScoutError`] — the unified error type
//! - Domain types ([`ResearchInput`], [`PageResult`], [`PageSignals`],
//!   [`AggregatedSignals`], [`ResearchResult`], [`JobState`])
//! - Configuration ([`ResearchConfig`], [`FetchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{DEFAULT_USER_AGENT, FetchConfig, ResearchConfig, load_config_from};
pub use error::{Result, SiteScoutError};
pub use types::{
    AggregatedSignals, JobId, JobState, PageResult, PageSignals, PageStatus, ResearchInput,
    ResearchResult, ResearchStatus, SocialPlatform,
};
