//! The trigger entry point: selects (or is handed) one run, claims it, and
//! drives the fetch → compile → synthesize → render → deliver sequence with
//! explicit run-state tracking.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use periscope_common::{Job, PeriscopeError, ReportFormat, Run};
use periscope_report::render;
use periscope_retrieval::{ReportMailer, ReportSynthesizer, SearchProvider, SiteScraper};

use crate::compile;
use crate::delivery;
use crate::geo;
use crate::query;
use crate::scheduler;
use crate::store::ResearchStore;

/// Trigger payload: a specific run to execute, or empty to select the next
/// due work. `task_id` and `run_id` come together or not at all.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerRequest {
    pub task_id: Option<Uuid>,
    pub run_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Drives one research run per trigger invocation. All collaborators sit
/// behind traits so the whole flow runs against mocks.
pub struct ResearchRunner {
    store: Arc<dyn ResearchStore>,
    search: Arc<dyn SearchProvider>,
    scraper: Arc<dyn SiteScraper>,
    synthesizer: Arc<dyn ReportSynthesizer>,
    mailer: Arc<dyn ReportMailer>,
}

impl ResearchRunner {
    pub fn new(
        store: Arc<dyn ResearchStore>,
        search: Arc<dyn SearchProvider>,
        scraper: Arc<dyn SiteScraper>,
        synthesizer: Arc<dyn ReportSynthesizer>,
        mailer: Arc<dyn ReportMailer>,
    ) -> Self {
        Self {
            store,
            search,
            scraper,
            synthesizer,
            mailer,
        }
    }

    /// Execute at most one due run.
    ///
    /// Input errors (unknown ids, mismatched pair, inactive job, run not
    /// pending) surface as `Err` with nothing mutated — the 4xx-equivalent.
    /// Pipeline failures are folded into the run's `failed` state and the
    /// response's `error` field; they never escape as `Err`.
    pub async fn trigger(
        &self,
        request: TriggerRequest,
    ) -> Result<TriggerResponse, PeriscopeError> {
        let Some((job, run)) = self.select_work(&request).await? else {
            info!("No due research work");
            return Ok(TriggerResponse {
                success: true,
                ..Default::default()
            });
        };

        // Claim before any network or compute work. Losing the claim means a
        // concurrent trigger got there first — treat like any other input error.
        if !self.store.claim_run(run.id, Utc::now()).await? {
            return Err(PeriscopeError::Validation(format!(
                "run {} is not pending",
                run.id
            )));
        }

        info!(job_id = %job.id, run_id = %run.id, "Research run started");

        let outcome = self.execute(&job).await;
        let finished = Utc::now();

        let response = match outcome {
            Ok((content, format)) => {
                self.store
                    .complete_run(run.id, &content, format, finished)
                    .await?;

                let email_sent =
                    delivery::dispatch(self.mailer.as_ref(), &job, &content, format).await;
                if let Some(sent) = email_sent {
                    self.store.record_email_outcome(run.id, sent).await?;
                }

                let report_length = content.chars().count();
                info!(run_id = %run.id, report_length, "Research run completed");
                TriggerResponse {
                    success: true,
                    task_id: Some(job.id),
                    run_id: Some(run.id),
                    report_length: Some(report_length),
                    email_sent,
                    error: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                error!(run_id = %run.id, error = %message, "Research run failed");
                self.store.fail_run(run.id, &message, finished).await?;
                TriggerResponse {
                    success: false,
                    task_id: Some(job.id),
                    run_id: Some(run.id),
                    report_length: None,
                    email_sent: None,
                    error: Some(message),
                }
            }
        };

        // Job bookkeeping happens after every attempt, success or failure.
        let next = scheduler::next_run_at(&job, finished);
        self.store
            .update_job_schedule(job.id, finished, next)
            .await?;

        Ok(response)
    }

    /// Resolve the work for this invocation: the requested run, else the
    /// oldest pending run, else a fresh run for the earliest-due job.
    async fn select_work(
        &self,
        request: &TriggerRequest,
    ) -> Result<Option<(Job, Run)>, PeriscopeError> {
        match (request.task_id, request.run_id) {
            (Some(task_id), Some(run_id)) => {
                let run = self.store.run(run_id).await?.ok_or_else(|| {
                    PeriscopeError::Validation(format!("unknown run {run_id}"))
                })?;
                if run.job_id != task_id {
                    return Err(PeriscopeError::Validation(format!(
                        "run {run_id} does not belong to task {task_id}"
                    )));
                }
                let job = self.store.job(task_id).await?.ok_or_else(|| {
                    PeriscopeError::Validation(format!("unknown task {task_id}"))
                })?;
                if !job.active {
                    return Err(PeriscopeError::Validation(format!(
                        "task {task_id} is inactive"
                    )));
                }
                Ok(Some((job, run)))
            }
            (None, None) => {
                if let Some(run) = self.store.oldest_pending_run().await? {
                    let job = self.store.job(run.job_id).await?.ok_or_else(|| {
                        PeriscopeError::Database(format!(
                            "run {} references a missing job",
                            run.id
                        ))
                    })?;
                    return Ok(Some((job, run)));
                }
                if let Some(job) = self.store.next_due_job(Utc::now()).await? {
                    let run = self.store.create_pending_run(job.id).await?;
                    return Ok(Some((job, run)));
                }
                Ok(None)
            }
            _ => Err(PeriscopeError::Validation(
                "taskId and runId must be provided together".to_string(),
            )),
        }
    }

    /// The fetch → compile → synthesize → render sequence. Every failure
    /// funnels back to `trigger`, which owns the failed transition.
    async fn execute(&self, job: &Job) -> Result<(String, ReportFormat), PeriscopeError> {
        let query = query::compose_query(job);
        let code = geo::normalize_country(job.country.as_deref());
        let strict = geo::is_strict_context(code, &query);
        info!(query = %query, strict, "Composed research query");

        let results = compile::fetch_sources(
            self.search.as_ref(),
            self.scraper.as_ref(),
            job,
            &query,
            strict,
            code,
        )
        .await?;
        let corpus = compile::compile_corpus(&results)?;
        info!(
            sources = results.len(),
            corpus_chars = corpus.chars().count(),
            "Corpus compiled"
        );

        let report = self
            .synthesizer
            .synthesize(&query, &corpus, job.report_format)
            .await
            .map_err(|e| PeriscopeError::Analysis(e.to_string()))?;

        let document = render(&report, job.report_format)
            .map_err(|e| PeriscopeError::Analysis(e.to_string()))?;
        let content = String::from_utf8_lossy(&document.content).into_owned();
        Ok((content, job.report_format))
    }
}
