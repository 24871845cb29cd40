//! Research job orchestration for SiteScout.
//!
//! Ties candidate URL building, bounded fetching, signal extraction, and
//! aggregation into one deadline-bounded job (see [`run_research_job`]).

pub mod pipeline;
pub mod state;

pub use pipeline::{ResearchJob, run_research_job, run_research_job_with};
pub use state::JobTracker;
