// Test mocks for the research pipeline.
//
// One mock per trait boundary plus an in-memory ResearchStore:
// - MockSearch (SearchProvider) — canned results or canned failure
// - MockScraper (SiteScraper) — URL → page map, unregistered URLs fail
// - MockSynthesizer (ReportSynthesizer) — fixed report, records calls
// - MockMailer (ReportMailer) — records sends, optionally failing
// - MemoryStore (ResearchStore) — stateful in-memory jobs/runs
//
// No network, no database, no Docker. `cargo test` in seconds.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use periscope_common::{
    DeliveryMethod, ExecutionMode, GeoFocus, Job, PeriscopeError, ReportFormat, ResearchDepth,
    Run, RunStatus, ScheduleType, SearchResult,
};
use periscope_report::{Citation, Report, ReportMetadata, Section};
use periscope_retrieval::{
    ReportMailer, ReportSynthesizer, RetrievalError, ScrapedSite, SearchOutcome, SearchProvider,
    SearchRequest, SiteScraper, UnreachableSource,
};

use crate::store::ResearchStore;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A minimal manual markdown job. Tests override the fields they exercise.
pub fn make_job(description: &str) -> Job {
    Job {
        id: Uuid::new_v4(),
        description: description.to_string(),
        enhanced_description: None,
        industry: None,
        depth: ResearchDepth::Standard,
        source_types: vec![],
        geo_focus: GeoFocus::Global,
        country: None,
        custom_sites: vec![],
        report_format: ReportFormat::Markdown,
        delivery: DeliveryMethod::None,
        delivery_email: None,
        schedule: ScheduleType::Manual,
        interval_days: None,
        execution_mode: ExecutionMode::Manual,
        active: true,
        last_run_at: None,
        next_run_at: None,
        created_at: Utc::now(),
    }
}

pub fn make_pending_run(job_id: Uuid) -> Run {
    Run {
        id: Uuid::new_v4(),
        job_id,
        status: RunStatus::Pending,
        started_at: None,
        completed_at: None,
        report_content: None,
        report_format: None,
        error_message: None,
        email_sent: None,
        created_at: Utc::now(),
    }
}

pub fn make_report(title: &str) -> Report {
    Report {
        title: title.to_string(),
        executive_summary: "Summary of findings.".to_string(),
        sections: vec![Section {
            heading: "Findings".to_string(),
            body: "Body of findings.".to_string(),
            citation_ids: vec!["c1".to_string()],
        }],
        citations: vec![Citation {
            id: "c1".to_string(),
            text: "Primary source".to_string(),
            source_url: "https://example.com/source".to_string(),
            confidence: 0.9,
        }],
        metadata: ReportMetadata {
            total_sources: 1,
            verified_claims: 1,
            confidence: 0.8,
            generated_at: Utc::now(),
        },
    }
}

pub fn make_search_result(title: &str, url: &str, text: &str) -> SearchResult {
    SearchResult {
        url: url.to_string(),
        title: title.to_string(),
        description: String::new(),
        text: text.to_string(),
        published_at: None,
        status: None,
    }
}

// ---------------------------------------------------------------------------
// MockSearch
// ---------------------------------------------------------------------------

pub struct MockSearch {
    results: Vec<SearchResult>,
    failure: Option<(String, Vec<UnreachableSource>)>,
    pub requests: Mutex<Vec<SearchRequest>>,
}

impl MockSearch {
    pub fn with_results(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str, unreachable: Vec<UnreachableSource>) -> Self {
        Self {
            results: Vec::new(),
            failure: Some((message.to_string(), unreachable)),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, RetrievalError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some((message, unreachable)) = &self.failure {
            return Err(RetrievalError::SearchFailed {
                message: message.clone(),
                unreachable: unreachable.clone(),
            });
        }
        Ok(SearchOutcome {
            results: self.results.clone(),
            unreachable: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

/// URL → page map. Unregistered URLs return an error, which the compile
/// stage must treat as a skippable partial failure.
pub struct MockScraper {
    pages: HashMap<String, (Option<String>, String)>,
}

impl MockScraper {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }

    pub fn with_page(mut self, url: &str, title: Option<&str>, markdown: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            (title.map(str::to_string), markdown.to_string()),
        );
        self
    }
}

#[async_trait]
impl SiteScraper for MockScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedSite, RetrievalError> {
        match self.pages.get(url) {
            Some((title, markdown)) => Ok(ScrapedSite {
                url: url.to_string(),
                title: title.clone(),
                markdown: markdown.clone(),
            }),
            None => Err(RetrievalError::FetchFailed(format!("no page for {url}"))),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer
// ---------------------------------------------------------------------------

pub struct MockSynthesizer {
    report: Report,
    fail: bool,
    /// (query, corpus) pairs seen by the mock.
    pub calls: Mutex<Vec<(String, String)>>,
}

impl MockSynthesizer {
    pub fn returning(report: Report) -> Self {
        Self {
            report,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            report: make_report("unused"),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReportSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        query: &str,
        corpus: &str,
        _format: ReportFormat,
    ) -> Result<Report, RetrievalError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), corpus.to_string()));
        if self.fail {
            return Err(RetrievalError::SynthesisFailed(
                "model unavailable".to_string(),
            ));
        }
        Ok(self.report.clone())
    }
}

// ---------------------------------------------------------------------------
// MockMailer
// ---------------------------------------------------------------------------

pub struct MockMailer {
    fail: bool,
    /// (to, subject-title) pairs for delivered mail.
    pub sent: Mutex<Vec<(String, String)>>,
}

impl MockMailer {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReportMailer for MockMailer {
    async fn send_report(
        &self,
        to: &str,
        job_title: &str,
        _content: &str,
        _format: ReportFormat,
    ) -> Result<(), RetrievalError> {
        if self.fail {
            return Err(RetrievalError::MailFailed("smtp unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), job_title.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Stateful in-memory ResearchStore with the same claim semantics as the
/// Postgres implementation.
#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
    runs: Mutex<HashMap<Uuid, Run>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_job(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub fn insert_run(&self, run: Run) {
        self.runs.lock().unwrap().insert(run.id, run);
    }

    pub fn get_job(&self, id: Uuid) -> Option<Job> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    pub fn get_run(&self, id: Uuid) -> Option<Run> {
        self.runs.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl ResearchStore for MemoryStore {
    async fn job(&self, id: Uuid) -> Result<Option<Job>, PeriscopeError> {
        Ok(self.get_job(id))
    }

    async fn run(&self, id: Uuid) -> Result<Option<Run>, PeriscopeError> {
        Ok(self.get_run(id))
    }

    async fn oldest_pending_run(&self) -> Result<Option<Run>, PeriscopeError> {
        let runs = self.runs.lock().unwrap();
        Ok(runs
            .values()
            .filter(|r| r.status == RunStatus::Pending)
            .min_by_key(|r| r.created_at)
            .cloned())
    }

    async fn next_due_job(&self, now: DateTime<Utc>) -> Result<Option<Job>, PeriscopeError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .values()
            .filter(|j| {
                j.active
                    && j.execution_mode == ExecutionMode::Automatic
                    && j.schedule != ScheduleType::Manual
                    && j.next_run_at.is_some_and(|t| t <= now)
            })
            .min_by_key(|j| j.next_run_at)
            .cloned())
    }

    async fn create_pending_run(&self, job_id: Uuid) -> Result<Run, PeriscopeError> {
        let run = make_pending_run(job_id);
        self.insert_run(run.clone());
        Ok(run)
    }

    async fn claim_run(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, PeriscopeError> {
        let mut runs = self.runs.lock().unwrap();
        match runs.get_mut(&id) {
            Some(run) if run.status == RunStatus::Pending => {
                run.status = RunStatus::Running;
                run.started_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_run(
        &self,
        id: Uuid,
        content: &str,
        format: ReportFormat,
        now: DateTime<Utc>,
    ) -> Result<(), PeriscopeError> {
        let mut runs = self.runs.lock().unwrap();
        if let Some(run) = runs.get_mut(&id) {
            run.status = RunStatus::Completed;
            run.completed_at = Some(now);
            run.report_content = Some(content.to_string());
            run.report_format = Some(format);
        }
        Ok(())
    }

    async fn fail_run(
        &self,
        id: Uuid,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PeriscopeError> {
        let mut runs = self.runs.lock().unwrap();
        if let Some(run) = runs.get_mut(&id) {
            run.status = RunStatus::Failed;
            run.completed_at = Some(now);
            run.error_message = Some(message.to_string());
        }
        Ok(())
    }

    async fn record_email_outcome(&self, id: Uuid, sent: bool) -> Result<(), PeriscopeError> {
        let mut runs = self.runs.lock().unwrap();
        if let Some(run) = runs.get_mut(&id) {
            run.email_sent = Some(sent);
        }
        Ok(())
    }

    async fn update_job_schedule(
        &self,
        job_id: Uuid,
        last_run_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<(), PeriscopeError> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(&job_id) {
            job.last_run_at = Some(last_run_at);
            job.next_run_at = next_run_at;
        }
        Ok(())
    }
}
