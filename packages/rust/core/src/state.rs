//! Job state tracking.

use tracing::debug;

use sitescout_shared::{JobState, Result, SiteScoutError};

/// Current state of one job plus every state it has passed through.
#[derive(Debug, Clone)]
pub struct JobTracker {
    state: JobState,
    history: Vec<JobState>,
}

impl JobTracker {
    /// A tracker in [`JobState::Init`].
    pub fn new() -> Self {
        Self {
            state: JobState::Init,
            history: vec![JobState::Init],
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    /// Move to `next`, rejecting edges the pipeline does not have.
    pub fn advance(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SiteScoutError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = %self.state, to = %next, "job state transition");
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}
