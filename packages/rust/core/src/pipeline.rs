//! End-to-end research job: domain → candidate URLs → fetch → extract → aggregate.
//!
//! The whole pipeline races one hard deadline. Every path, including bad
//! input and the deadline firing, ends in a fully-formed [`ResearchResult`].

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, field, info, instrument, warn};

use sitescout_crawler::{FetchLimits, FetchOrchestrator, PageFetcher, PageSource};
use sitescout_shared::{
    AggregatedSignals, JobId, JobState, PageResult, PageSignals, PageStatus, ResearchConfig,
    ResearchInput, ResearchResult, ResearchStatus, Result,
};

use crate::state::JobTracker;

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Research `input` with the default configuration.
pub async fn run_research_job(input: &ResearchInput) -> ResearchResult {
    run_research_job_with(ResearchConfig::default(), input).await
}

/// Research `input` with an explicit configuration.
///
/// Configuration or client-construction problems come back as a `failed` result.
pub async fn run_research_job_with(config: ResearchConfig, input: &ResearchInput) -> ResearchResult {
    match ResearchJob::new(config) {
        Ok(job) => job.run(input).await,
        Err(e) => {
            warn!(error = %e, "research job could not start");
            JobReport::new(input).finish(
                ResearchStatus::Failed,
                Vec::new(),
                AggregatedSignals::default(),
                Some(e.to_string()),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// ResearchJob
// ---------------------------------------------------------------------------

/// A configured research pipeline. Holds no per-job state; `run` may be called many times.
pub struct ResearchJob<S = PageFetcher> {
    config: ResearchConfig,
    source: Arc<S>,
}

impl ResearchJob<PageFetcher> {
    /// Create a job runner that fetches over HTTP.
    pub fn new(config: ResearchConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = PageFetcher::new(config.fetch.clone())?;
        Ok(Self {
            config,
            source: Arc::new(fetcher),
        })
    }
}

impl<S: PageSource> ResearchJob<S> {
    /// Create a job runner over any page source.
    pub fn with_source(config: ResearchConfig, source: Arc<S>) -> Self {
        Self { config, source }
    }

    /// Run one job to completion, failure, or deadline.
    #[instrument(skip_all, fields(domain = %input.domain, job_id = field::Empty))]
    pub async fn run(&self, input: &ResearchInput) -> ResearchResult {
        let report = JobReport::new(input);
        Span::current().record("job_id", field::display(&report.job_id));
        info!(company = input.company_name.as_deref().unwrap_or_default(), "starting research job");

        let mut tracker = JobTracker::new();
        let cancel = CancellationToken::new();

        let outcome = tokio::select! {
            outcome = self.run_stages(input, &mut tracker, &cancel) => outcome,
            () = tokio::time::sleep(self.config.job_timeout()) => {
                cancel.cancel();
                Ok(StageOutcome::TimedOut)
            }
        };

        let result = match outcome {
            Ok(StageOutcome::Completed { pages, signals }) => {
                report.finish(ResearchStatus::Completed, pages, signals, None)
            }
            Ok(StageOutcome::Failed { pages, error }) => report.finish(
                ResearchStatus::Failed,
                pages,
                AggregatedSignals::default(),
                Some(error),
            ),
            Ok(StageOutcome::TimedOut) => {
                let error = format!(
                    "research job exceeded its {}ms deadline while {}",
                    self.config.job_timeout_ms,
                    tracker.state()
                );
                settle(&mut tracker, JobState::TimedOut);
                report.finish(
                    ResearchStatus::Timeout,
                    Vec::new(),
                    AggregatedSignals::default(),
                    Some(error),
                )
            }
            Err(e) => {
                settle(&mut tracker, JobState::Failed);
                report.finish(
                    ResearchStatus::Failed,
                    Vec::new(),
                    AggregatedSignals::default(),
                    Some(e.to_string()),
                )
            }
        };

        debug!(history = ?tracker.history(), "job state history");
        info!(
            status = %result.status,
            pages = result.pages.len(),
            ok_pages = result.count_status(PageStatus::Ok),
            duration_ms = result.duration_ms,
            "research job finished"
        );

        result
    }

    /// INIT → FETCHING → EXTRACTING → AGGREGATING → DONE, or FAILED when nothing was fetched.
    async fn run_stages(
        &self,
        input: &ResearchInput,
        tracker: &mut JobTracker,
        cancel: &CancellationToken,
    ) -> Result<StageOutcome> {
        let domain = input.normalized_domain()?;
        let urls = sitescout_crawler::build_urls_with_scheme(&self.config.scheme, &domain);
        debug!(candidates = urls.len(), "candidate urls built");

        tracker.advance(JobState::Fetching)?;
        let orchestrator =
            FetchOrchestrator::new(Arc::clone(&self.source), FetchLimits::from(&self.config));
        let pages = orchestrator.fetch_many(urls.clone(), cancel).await;

        if !pages.iter().any(PageResult::is_ok) {
            tracker.advance(JobState::Failed)?;
            let error = no_pages_error(&domain, &pages);
            warn!(%error, "research job failed");
            return Ok(StageOutcome::Failed { pages, error });
        }

        tracker.advance(JobState::Extracting)?;
        let mut extracted = Vec::with_capacity(pages.len());
        for page in pages {
            if !page.is_ok() {
                extracted.push(page);
                continue;
            }
            let signals =
                sitescout_signals::extract(&page.url, page.html.as_deref().unwrap_or_default());
            extracted.push(page.with_signals(signals));
            // Parsing is CPU-bound; give the deadline a chance to fire between pages.
            tokio::task::yield_now().await;
        }

        tracker.advance(JobState::Aggregating)?;
        let signals_in_order = in_candidate_order(&urls, &extracted);
        let signals = sitescout_signals::aggregate(&signals_in_order);

        tracker.advance(JobState::Done)?;
        Ok(StageOutcome::Completed {
            pages: extracted,
            signals,
        })
    }
}

// ---------------------------------------------------------------------------
// Result assembly
// ---------------------------------------------------------------------------

enum StageOutcome {
    Completed {
        pages: Vec<PageResult>,
        signals: AggregatedSignals,
    },
    Failed {
        pages: Vec<PageResult>,
        error: String,
    },
    TimedOut,
}

/// Identity and timing captured when a job starts.
struct JobReport {
    job_id: JobId,
    domain: String,
    company_name: Option<String>,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl JobReport {
    fn new(input: &ResearchInput) -> Self {
        Self {
            job_id: JobId::new(),
            domain: input
                .normalized_domain()
                .unwrap_or_else(|_| input.domain.trim().to_string()),
            company_name: input.company_name.clone(),
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    fn finish(
        self,
        status: ResearchStatus,
        pages: Vec<PageResult>,
        signals: AggregatedSignals,
        error: Option<String>,
    ) -> ResearchResult {
        ResearchResult {
            job_id: self.job_id,
            status,
            domain: self.domain,
            company_name: self.company_name,
            pages,
            signals,
            started_at: self.started_at,
            duration_ms: u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            error,
        }
    }
}

/// Extracted signals ordered by their URL's position in `candidates`, not by completion time.
fn in_candidate_order(candidates: &[String], pages: &[PageResult]) -> Vec<PageSignals> {
    let rank = |url: &str| {
        candidates
            .iter()
            .position(|c| c == url)
            .unwrap_or(candidates.len())
    };
    let mut ranked: Vec<(usize, &PageSignals)> = pages
        .iter()
        .filter_map(|p| p.signals.as_ref().map(|s| (rank(&p.url), s)))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, s)| s.clone()).collect()
}

/// Move to a terminal state, logging instead of failing if the tracker is already terminal.
fn settle(tracker: &mut JobTracker, terminal: JobState) {
    if let Err(e) = tracker.advance(terminal) {
        warn!(error = %e, "could not record terminal job state");
    }
}

/// `no pages fetched from acme.com (6 attempted: 4 blocked, 2 failed)`.
fn no_pages_error(domain: &str, pages: &[PageResult]) -> String {
    let breakdown: Vec<String> = [
        PageStatus::Blocked,
        PageStatus::Failed,
        PageStatus::Timeout,
        PageStatus::TooLarge,
    ]
    .into_iter()
    .filter_map(|status| {
        let count = pages.iter().filter(|p| p.status == status).count();
        (count > 0).then(|| format!("{count} {status}"))
    })
    .collect();

    if breakdown.is_empty() {
        format!("no pages fetched from {domain} (0 attempted)")
    } else {
        format!(
            "no pages fetched from {domain} ({} attempted: {})",
            pages.len(),
            breakdown.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sitescout_shared::{FetchConfig, SocialPlatform};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn local_config() -> ResearchConfig {
        ResearchConfig {
            scheme: "http".into(),
            fetch: FetchConfig {
                request_timeout_ms: 2_000,
                backoff_base_ms: 1,
                backoff_max_ms: 4,
                ..FetchConfig::default()
            },
            ..ResearchConfig::default()
        }
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
    }

    fn input_for(server: &MockServer) -> ResearchInput {
        ResearchInput::new(server.address().to_string()).with_company_name("Acme Corp")
    }

    async fn mount_page(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html(body))
            .mount(server)
            .await;
    }

    async fn requested_paths(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }

    #[tokio::test]
    async fn completes_after_four_successes() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><head><title>Acme</title></head><body><h1>Welcome</h1>
               <a href="https://linkedin.com/company/acme">in</a></body></html>"#,
        )
        .await;
        mount_page(
            &server,
            "/about",
            r#"<html><head><title>About Acme Corporation</title>
               <meta name="description" content="Widgets since 1950"></head>
               <body><h1>About us</h1><p>Founded in Springfield.</p></body></html>"#,
        )
        .await;
        mount_page(
            &server,
            "/pricing",
            "<html><head><title>Pricing</title></head><body><h2>Plans</h2></body></html>",
        )
        .await;
        mount_page(
            &server,
            "/contact",
            r#"<html><head><title>Contact</title></head><body>
               <p>Write to hello@acme.test or call (555) 123-4567.</p></body></html>"#,
        )
        .await;
        // Every other path falls through to wiremock's default 404.

        let job = ResearchJob::new(local_config()).unwrap();
        let result = job.run(&input_for(&server)).await;

        assert_eq!(result.status, ResearchStatus::Completed, "{:?}", result.error);
        assert!(result.error.is_none());
        assert_eq!(result.company_name.as_deref(), Some("Acme Corp"));
        assert_eq!(result.count_status(PageStatus::Ok), 4);
        assert!(result.pages.len() <= 6);
        assert!(result.ok_pages().all(|p| p.signals.is_some() && p.html.is_some()));
        assert!(
            result
                .pages
                .iter()
                .filter(|p| !p.is_ok())
                .all(|p| p.signals.is_none())
        );

        let signals = &result.signals;
        assert_eq!(signals.title, "About Acme Corporation");
        assert_eq!(signals.meta_description, "Widgets since 1950");
        assert_eq!(signals.emails, vec!["hello@acme.test"]);
        assert_eq!(signals.phones, vec!["(555) 123-4567"]);
        assert!(signals.headings.contains(&"Welcome".to_string()));
        assert!(signals.social_links.contains_key(&SocialPlatform::LinkedIn));

        let requested = requested_paths(&server).await;
        for never in ["/services", "/products", "/team"] {
            assert!(!requested.iter().any(|p| p == never), "{never} was requested");
        }
    }

    #[tokio::test]
    async fn all_blocked_fails_without_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(6)
            .mount(&server)
            .await;

        let job = ResearchJob::new(local_config()).unwrap();
        let result = job.run(&input_for(&server)).await;

        assert_eq!(result.status, ResearchStatus::Failed);
        assert_eq!(result.pages.len(), 6);
        assert!(result.pages.iter().all(|p| p.status == PageStatus::Blocked));
        assert!(result.pages.iter().all(|p| p.attempts == 1));
        assert!(result.signals.is_empty());
        let error = result.error.unwrap();
        assert!(error.contains("no pages fetched"), "{error}");
        assert!(error.contains("6 blocked"), "{error}");
    }

    #[tokio::test]
    async fn oversized_page_is_excluded_from_extraction() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            "<html><head><title>Small root</title></head><body>hi</body></html>",
        )
        .await;
        let huge = format!(
            "<html><head><title>Huge page title that would win</title></head><body>{}</body></html>",
            "x".repeat(16 * 1024)
        );
        Mock::given(method("GET"))
            .and(path("/about"))
            .respond_with(html(&huge))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = local_config();
        config.fetch.max_body_bytes = 4 * 1024;
        let job = ResearchJob::new(config).unwrap();
        let result = job.run(&input_for(&server)).await;

        assert_eq!(result.status, ResearchStatus::Completed);
        let about = result
            .pages
            .iter()
            .find(|p| p.url.ends_with("/about"))
            .expect("about page recorded");
        assert_eq!(about.status, PageStatus::TooLarge);
        assert_eq!(about.attempts, 1);
        assert!(about.signals.is_none());
        assert_eq!(result.signals.title, "Small root");
    }

    #[tokio::test]
    async fn deadline_yields_timeout_with_empty_signals() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html("<html><title>Too slow</title></html>").set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let mut config = local_config();
        config.job_timeout_ms = 300;
        config.fetch.request_timeout_ms = 200;
        let job = ResearchJob::new(config).unwrap();

        let started = Instant::now();
        let result = job.run(&input_for(&server)).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(result.status, ResearchStatus::Timeout);
        assert!(result.signals.is_empty());
        assert!(result.pages.is_empty());
        let error = result.error.unwrap();
        assert!(error.contains("300ms deadline"), "{error}");
        assert!(error.contains("fetching"), "{error}");
    }

    #[tokio::test]
    async fn invalid_domain_fails_before_fetching() {
        let result = run_research_job(&ResearchInput::new("   ")).await;
        assert_eq!(result.status, ResearchStatus::Failed);
        assert!(result.pages.is_empty());
        assert!(result.error.unwrap().contains("domain is empty"));
    }

    #[tokio::test]
    async fn invalid_config_is_reported_as_failure() {
        let config = ResearchConfig {
            max_attempts: 0,
            ..ResearchConfig::default()
        };
        let result = run_research_job_with(config, &ResearchInput::new("acme.com")).await;
        assert_eq!(result.status, ResearchStatus::Failed);
        assert_eq!(result.domain, "acme.com");
        assert!(result.error.unwrap().contains("max_attempts"));
    }

    /// Serves `/` slowly and `/about` quickly; every other path is a 404.
    struct UnevenSource;

    impl PageSource for UnevenSource {
        fn fetch_page(&self, url: &str) -> impl Future<Output = PageResult> + Send {
            let url = url.to_string();
            async move {
                let (delay, name) = if url.ends_with("acme.test/") {
                    (80, "Root")
                } else if url.ends_with("/about") {
                    (5, "Abou")
                } else {
                    (1, "")
                };
                let elapsed = Duration::from_millis(delay);
                tokio::time::sleep(elapsed).await;
                if name.is_empty() {
                    return PageResult::failure(url, PageStatus::Failed, "HTTP 404", Some(404), elapsed);
                }
                let html = format!(
                    r#"<html><head><title>{name} Title</title></head><body>
                       <h1>{name} heading</h1>
                       <a href="https://linkedin.com/company/{name}">in</a></body></html>"#
                );
                PageResult::ok(url, html, 200, elapsed)
            }
        }
    }

    #[tokio::test]
    async fn aggregation_follows_candidate_order_not_completion_order() {
        let job = ResearchJob::with_source(ResearchConfig::default(), Arc::new(UnevenSource));
        let result = job.run(&ResearchInput::new("acme.test")).await;

        assert_eq!(result.status, ResearchStatus::Completed, "{:?}", result.error);
        let ok_urls: Vec<&str> = result.ok_pages().map(|p| p.url.as_str()).collect();
        assert_eq!(ok_urls, vec!["https://acme.test/about", "https://acme.test/"]);

        assert_eq!(result.signals.title, "Root Title");
        assert_eq!(result.signals.headings, vec!["Root heading", "Abou heading"]);
        assert_eq!(
            result.signals.social_links.get(&SocialPlatform::LinkedIn).map(String::as_str),
            Some("https://linkedin.com/company/Root")
        );
    }

    #[test]
    fn candidate_order_puts_unknown_urls_last() {
        let candidates = vec!["https://a/".to_string(), "https://a/about".to_string()];
        let signals_for = |url: &str| PageSignals {
            url: url.into(),
            ..Default::default()
        };
        let pages = vec![
            PageResult::ok("https://a/other", String::new(), 200, Duration::ZERO)
                .with_signals(signals_for("https://a/other")),
            PageResult::failure("https://a/team", PageStatus::Failed, "HTTP 404", Some(404), Duration::ZERO),
            PageResult::ok("https://a/about", String::new(), 200, Duration::ZERO)
                .with_signals(signals_for("https://a/about")),
            PageResult::ok("https://a/", String::new(), 200, Duration::ZERO)
                .with_signals(signals_for("https://a/")),
        ];
        let urls: Vec<String> = in_candidate_order(&candidates, &pages)
            .into_iter()
            .map(|s| s.url)
            .collect();
        assert_eq!(urls, vec!["https://a/", "https://a/about", "https://a/other"]);
    }

    #[test]
    fn no_pages_error_breakdown() {
        let elapsed = Duration::ZERO;
        let pages = vec![
            PageResult::failure("a", PageStatus::Blocked, "HTTP 403", Some(403), elapsed),
            PageResult::failure("b", PageStatus::Failed, "HTTP 404", Some(404), elapsed),
            PageResult::failure("c", PageStatus::Blocked, "HTTP 429", Some(429), elapsed),
        ];
        assert_eq!(
            no_pages_error("acme.com", &pages),
            "no pages fetched from acme.com (3 attempted: 2 blocked, 1 failed)"
        );
        assert_eq!(
            no_pages_error("acme.com", &[]),
            "no pages fetched from acme.com (0 attempted)"
        );
    }

    #[test]
    fn result_serializes_with_snake_case_statuses() {
        let result = JobReport::new(&ResearchInput::new("Acme.com")).finish(
            ResearchStatus::Timeout,
            Vec::new(),
            AggregatedSignals::default(),
            Some("deadline".into()),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "timeout");
        assert_eq!(json["domain"], "acme.com");
        assert!(json.get("company_name").is_none());
    }
}
