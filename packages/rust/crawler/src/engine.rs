//! Bounded fetch orchestrator.
//!
//! Dispatches candidate URLs in list order to a fixed number of concurrent
//! fetch tasks and stops when enough pages succeeded, the attempt budget is
//! spent, or the list runs out. All bookkeeping lives in the dispatch loop;
//! tasks only report their own [`PageResult`].

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use sitescout_shared::{PageResult, ResearchConfig};

use crate::fetcher::PageSource;

// ---------------------------------------------------------------------------
// FetchLimits
// ---------------------------------------------------------------------------

/// Stopping conditions for one batch of fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Maximum fetches in flight at once.
    pub max_concurrent: usize,
    /// Stop once this many `ok` pages were collected.
    pub max_successful: usize,
    /// Maximum URLs dispatched in total.
    pub max_attempts: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self::from(&ResearchConfig::default())
    }
}

impl From<&ResearchConfig> for FetchLimits {
    fn from(config: &ResearchConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            max_successful: config.max_successful,
            max_attempts: config.max_attempts,
        }
    }
}

// ---------------------------------------------------------------------------
// FetchOrchestrator
// ---------------------------------------------------------------------------

/// Runs many page fetches under a concurrency cap with early stopping.
pub struct FetchOrchestrator<S> {
    source: Arc<S>,
    limits: FetchLimits,
}

impl<S: PageSource> FetchOrchestrator<S> {
    pub fn new(source: Arc<S>, limits: FetchLimits) -> Self {
        Self { source, limits }
    }

    /// Fetch `urls` front to back and return every recorded outcome in completion order.
    ///
    /// When the success limit is reached, fetches still in flight are aborted
    /// and their outcomes discarded, so the result never holds more than
    /// `max_successful` ok pages or more than `max_attempts` entries.
    /// Cancelling `cancel` stops dispatching and abandons in-flight fetches.
    #[instrument(skip_all, fields(urls = urls.len()))]
    pub async fn fetch_many(&self, urls: Vec<String>, cancel: &CancellationToken) -> Vec<PageResult> {
        let limits = self.limits;
        let semaphore = Arc::new(Semaphore::new(limits.max_concurrent));
        let mut queue: VecDeque<String> = urls.into();
        let mut in_flight: JoinSet<Option<PageResult>> = JoinSet::new();
        let mut results: Vec<PageResult> = Vec::new();
        let mut attempts: usize = 0;
        let mut successes: usize = 0;

        loop {
            // Fill free worker slots in list order.
            while !cancel.is_cancelled()
                && successes < limits.max_successful
                && attempts < limits.max_attempts
            {
                let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                    break;
                };
                let Some(url) = queue.pop_front() else {
                    break;
                };

                attempts += 1;
                debug!(%url, attempt = attempts, "dispatching fetch");

                let source = Arc::clone(&self.source);
                let token = cancel.child_token();
                in_flight.spawn(async move {
                    let _permit = permit;
                    tokio::select! {
                        page = source.fetch_page(&url) => Some(page),
                        () = token.cancelled() => None,
                    }
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok(Some(page)) => {
                    if page.is_ok() {
                        successes += 1;
                    }
                    debug!(url = %page.url, status = %page.status, successes, "fetch completed");
                    results.push(page);
                }
                Ok(None) => debug!("fetch cancelled"),
                Err(e) => warn!(error = %e, "fetch task did not complete"),
            }

            if successes >= limits.max_successful {
                if !in_flight.is_empty() {
                    debug!(
                        in_flight = in_flight.len(),
                        "success limit reached, aborting in-flight fetches"
                    );
                }
                in_flight.abort_all();
                break;
            }
        }

        info!(
            dispatched = attempts,
            recorded = results.len(),
            ok = successes,
            remaining = queue.len(),
            cancelled = cancel.is_cancelled(),
            "fetch batch finished"
        );

        results
    }
}
