//! Core domain types for SiteScout research jobs.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{Result, SiteScoutError};

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for research job identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new time-sortable job identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ResearchInput
// ---------------------------------------------------------------------------

/// What the caller asks to research: a bare domain and an optional company name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchInput {
    /// Domain without scheme, e.g. `acme.com` (a scheme or path is tolerated and stripped).
    pub domain: String,
    /// Human-readable company name, echoed into the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl ResearchInput {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            company_name: None,
        }
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    /// Lowercased host (plus optional port) with any scheme, path and trailing dot removed.
    pub fn normalized_domain(&self) -> Result<String> {
        let lowered = self.domain.trim().to_ascii_lowercase();
        let without_scheme = lowered
            .strip_prefix("https://")
            .or_else(|| lowered.strip_prefix("http://"))
            .unwrap_or(&lowered);
        let host = without_scheme
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('.');

        if host.is_empty() {
            return Err(SiteScoutError::validation("domain is empty"));
        }

        let parsed = Url::parse(&format!("https://{host}/"))
            .map_err(|e| SiteScoutError::validation(format!("invalid domain {host:?}: {e}")))?;
        if parsed.host_str().is_none() || !parsed.username().is_empty() || parsed.password().is_some()
        {
            return Err(SiteScoutError::validation(format!(
                "invalid domain {host:?}: expected a bare host name"
            )));
        }

        Ok(host.to_string())
    }
}

// ---------------------------------------------------------------------------
// PageResult
// ---------------------------------------------------------------------------

/// Classification of one page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Ok,
    /// Non-2xx (other than 403/429), non-HTML, or a network error.
    Failed,
    /// The per-request deadline elapsed.
    Timeout,
    /// HTTP 403 or 429.
    Blocked,
    /// The body exceeded the size cap.
    TooLarge,
}

impl PageStatus {
    /// Only transient outcomes are worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Failed | Self::Timeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Blocked => "blocked",
            Self::TooLarge => "too_large",
        }
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of fetching one candidate URL. `html` and `signals` are only set when `status` is `ok`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// The URL that was requested.
    pub url: String,
    /// Final classification after any retries.
    pub status: PageStatus,
    /// HTTP status code of the final response, if one was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Decoded HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Signals extracted from `html`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<PageSignals>,
    /// Short diagnostic for non-ok outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock time spent on this URL, retries and backoff included.
    pub duration_ms: u64,
    /// Number of requests issued for this URL (1 + retries).
    pub attempts: u32,
}

impl PageResult {
    /// A successful fetch carrying its HTML body.
    pub fn ok(url: impl Into<String>, html: String, http_status: u16, elapsed: Duration) -> Self {
        Self {
            url: url.into(),
            status: PageStatus::Ok,
            http_status: Some(http_status),
            html: Some(html),
            signals: None,
            error: None,
            duration_ms: millis(elapsed),
            attempts: 1,
        }
    }

    /// A non-ok fetch outcome with its diagnostic.
    pub fn failure(
        url: impl Into<String>,
        status: PageStatus,
        error: impl Into<String>,
        http_status: Option<u16>,
        elapsed: Duration,
    ) -> Self {
        debug_assert!(status != PageStatus::Ok, "failure() called with ok status");
        Self {
            url: url.into(),
            status,
            http_status,
            html: None,
            signals: None,
            error: Some(error.into()),
            duration_ms: millis(elapsed),
            attempts: 1,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == PageStatus::Ok
    }

    /// Attach extracted signals. Ignored for non-ok pages.
    pub fn with_signals(mut self, signals: PageSignals) -> Self {
        if self.is_ok() {
            self.signals = Some(signals);
        }
        self
    }

    /// Record the attempt count and total elapsed time across retries.
    pub fn with_attempts(mut self, attempts: u32, elapsed: Duration) -> Self {
        self.attempts = attempts;
        self.duration_ms = millis(elapsed);
        self
    }

    /// Drop the HTML body (signals are kept).
    pub fn without_html(mut self) -> Self {
        self.html = None;
        self
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Social networks recognised in anchor links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    LinkedIn,
    Twitter,
    Facebook,
    Instagram,
    YouTube,
}

impl SocialPlatform {
    pub const ALL: [SocialPlatform; 5] = [
        Self::LinkedIn,
        Self::Twitter,
        Self::Facebook,
        Self::Instagram,
        Self::YouTube,
    ];

    /// Registrable domains belonging to this platform.
    pub fn domains(self) -> &'static [&'static str] {
        match self {
            Self::LinkedIn => &["linkedin.com"],
            Self::Twitter => &["twitter.com", "x.com"],
            Self::Facebook => &["facebook.com", "fb.com"],
            Self::Instagram => &["instagram.com"],
            Self::YouTube => &["youtube.com", "youtu.be"],
        }
    }
}

/// Facts extracted from a single HTML page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSignals {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    /// `h1`–`h3` texts, deduplicated, at most 30.
    pub headings: Vec<String>,
    /// Visible body text, whitespace-collapsed and length-bounded.
    pub cleaned_text: String,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub social_links: BTreeMap<SocialPlatform, String>,
}

/// Domain-level merge of every successful page's signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedSignals {
    pub title: String,
    pub meta_description: String,
    pub headings: Vec<String>,
    pub cleaned_text: String,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub social_links: BTreeMap<SocialPlatform, String>,
}

impl AggregatedSignals {
    /// True when no field carries any information.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.meta_description.is_empty()
            && self.headings.is_empty()
            && self.cleaned_text.is_empty()
            && self.emails.is_empty()
            && self.phones.is_empty()
            && self.social_links.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Job state and result
// ---------------------------------------------------------------------------

/// Lifecycle of a single research job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Init,
    Fetching,
    Extracting,
    Aggregating,
    Done,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::TimedOut)
    }

    /// Forward edges of the pipeline, plus `Failed`/`TimedOut` from any non-terminal state.
    pub fn can_transition_to(self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if matches!(next, Self::Failed | Self::TimedOut) {
            return true;
        }
        matches!(
            (self, next),
            (Self::Init, Self::Fetching)
                | (Self::Fetching, Self::Extracting)
                | (Self::Extracting, Self::Aggregating)
                | (Self::Aggregating, Self::Done)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final status of a research job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    /// At least one page was fetched, extracted and aggregated.
    Completed,
    /// No page could be fetched, or the input was unusable.
    Failed,
    /// The job deadline fired first.
    Timeout,
}

impl std::fmt::Display for ResearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        })
    }
}

/// Everything a research job produced. Every job returns one of these, whatever happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub job_id: JobId,
    pub status: ResearchStatus,
    /// The domain as researched (normalized when normalization succeeded).
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Every recorded fetch outcome, in completion order.
    pub pages: Vec<PageResult>,
    /// Aggregate of the ok pages; empty unless `status` is `completed`.
    pub signals: AggregatedSignals,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResearchResult {
    /// Pages whose fetch succeeded.
    pub fn ok_pages(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|p| p.is_ok())
    }

    /// Number of recorded pages with the given status.
    pub fn count_status(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
