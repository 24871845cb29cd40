//! Signal extraction and aggregation.
//!
//! Turns fetched HTML into structured [`PageSignals`](sitescout_shared::PageSignals)
//! and merges many of them into one
//! [`AggregatedSignals`](sitescout_shared::AggregatedSignals). Everything here
//! is pure and synchronous: no I/O, no shared state.

mod aggregate;
mod extract;
mod text;

pub use aggregate::aggregate;
pub use extract::{MAX_HEADINGS, MAX_TEXT_CHARS, MIN_TEXT_CHARS, extract, social_platform};
