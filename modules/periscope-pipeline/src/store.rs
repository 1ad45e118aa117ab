//! Job and run persistence.
//!
//! Postgres lives behind the `ResearchStore` trait so the pipeline can be
//! exercised with an in-memory store — no database, no Docker. Run claiming
//! is a single conditional UPDATE: the executor proceeds only when exactly
//! one row transitioned pending → running, so two concurrent triggers can
//! never double-pick the same run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use periscope_common::{
    DeliveryMethod, ExecutionMode, GeoFocus, Job, PeriscopeError, ReportFormat, ResearchDepth,
    Run, RunStatus, ScheduleType, SourceTag,
};

type Result<T> = std::result::Result<T, PeriscopeError>;

#[async_trait]
pub trait ResearchStore: Send + Sync {
    async fn job(&self, id: Uuid) -> Result<Option<Job>>;
    async fn run(&self, id: Uuid) -> Result<Option<Run>>;

    /// The single oldest pending run, if any. Never a batch.
    async fn oldest_pending_run(&self) -> Result<Option<Run>>;

    /// The single earliest-due active automatic job, if any.
    async fn next_due_job(&self, now: DateTime<Utc>) -> Result<Option<Job>>;

    async fn create_pending_run(&self, job_id: Uuid) -> Result<Run>;

    /// Atomically claim a pending run (pending → running, stamping
    /// `started_at`). Returns false when the run was already claimed or is
    /// not pending — the caller must not execute it.
    async fn claim_run(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    async fn complete_run(
        &self,
        id: Uuid,
        content: &str,
        format: ReportFormat,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn fail_run(&self, id: Uuid, message: &str, now: DateTime<Utc>) -> Result<()>;

    /// Record the delivery outcome on the run, independent of run status.
    async fn record_email_outcome(&self, id: Uuid, sent: bool) -> Result<()>;

    /// Stamp `last_run_at` and persist the next due time after an attempt,
    /// success and failure alike.
    async fn update_job_schedule(
        &self,
        job_id: Uuid,
        last_run_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

// --- Postgres implementation ---

pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    description: String,
    enhanced_description: Option<String>,
    industry: Option<String>,
    depth: String,
    source_types: Vec<String>,
    geo_focus: String,
    country: Option<String>,
    custom_sites: Vec<String>,
    report_format: String,
    delivery: String,
    delivery_email: Option<String>,
    schedule: String,
    interval_days: Option<i64>,
    execution_mode: String,
    active: bool,
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    job_id: Uuid,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    report_content: Option<String>,
    report_format: Option<String>,
    error_message: Option<String>,
    email_sent: Option<bool>,
    created_at: DateTime<Utc>,
}

fn job_from_row(row: JobRow) -> Result<Job> {
    Ok(Job {
        id: row.id,
        description: row.description,
        enhanced_description: row.enhanced_description,
        industry: row.industry,
        depth: ResearchDepth::parse(&row.depth),
        source_types: row.source_types.iter().map(|s| SourceTag::parse(s)).collect(),
        geo_focus: GeoFocus::parse(&row.geo_focus),
        country: row.country,
        custom_sites: row.custom_sites,
        report_format: ReportFormat::parse(&row.report_format).ok_or_else(|| {
            PeriscopeError::Database(format!("invalid report format: {}", row.report_format))
        })?,
        delivery: DeliveryMethod::parse(&row.delivery).ok_or_else(|| {
            PeriscopeError::Database(format!("invalid delivery method: {}", row.delivery))
        })?,
        delivery_email: row.delivery_email,
        schedule: ScheduleType::parse(&row.schedule).ok_or_else(|| {
            PeriscopeError::Database(format!("invalid schedule type: {}", row.schedule))
        })?,
        interval_days: row.interval_days,
        execution_mode: ExecutionMode::parse(&row.execution_mode).ok_or_else(|| {
            PeriscopeError::Database(format!("invalid execution mode: {}", row.execution_mode))
        })?,
        active: row.active,
        last_run_at: row.last_run_at,
        next_run_at: row.next_run_at,
        created_at: row.created_at,
    })
}

fn run_from_row(row: RunRow) -> Result<Run> {
    Ok(Run {
        id: row.id,
        job_id: row.job_id,
        status: RunStatus::parse(&row.status).ok_or_else(|| {
            PeriscopeError::Database(format!("invalid run status: {}", row.status))
        })?,
        started_at: row.started_at,
        completed_at: row.completed_at,
        report_content: row.report_content,
        report_format: match row.report_format.as_deref() {
            Some(raw) => Some(ReportFormat::parse(raw).ok_or_else(|| {
                PeriscopeError::Database(format!("invalid report format: {raw}"))
            })?),
            None => None,
        },
        error_message: row.error_message,
        email_sent: row.email_sent,
        created_at: row.created_at,
    })
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PeriscopeError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ResearchStore for PgStore {
    async fn job(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM research_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PeriscopeError::Database(e.to_string()))?;
        row.map(job_from_row).transpose()
    }

    async fn run(&self, id: Uuid) -> Result<Option<Run>> {
        let row = sqlx::query_as::<_, RunRow>("SELECT * FROM research_runs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PeriscopeError::Database(e.to_string()))?;
        row.map(run_from_row).transpose()
    }

    async fn oldest_pending_run(&self) -> Result<Option<Run>> {
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            SELECT * FROM research_runs
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PeriscopeError::Database(e.to_string()))?;
        row.map(run_from_row).transpose()
    }

    async fn next_due_job(&self, now: DateTime<Utc>) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM research_jobs
            WHERE active
              AND execution_mode = 'automatic'
              AND schedule <> 'manual'
              AND next_run_at IS NOT NULL
              AND next_run_at <= $1
            ORDER BY next_run_at ASC
            LIMIT 1
            "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PeriscopeError::Database(e.to_string()))?;
        row.map(job_from_row).transpose()
    }

    async fn create_pending_run(&self, job_id: Uuid) -> Result<Run> {
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            INSERT INTO research_runs (id, job_id, status)
            VALUES ($1, $2, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PeriscopeError::Database(e.to_string()))?;
        run_from_row(row)
    }

    async fn claim_run(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE research_runs
            SET status = 'running', started_at = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| PeriscopeError::Database(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete_run(
        &self,
        id: Uuid,
        content: &str,
        format: ReportFormat,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE research_runs
            SET status = 'completed', completed_at = $2,
                report_content = $3, report_format = $4
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(content)
        .bind(format.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| PeriscopeError::Database(e.to_string()))?;
        if result.rows_affected() != 1 {
            warn!(run_id = %id, "Completed a run that was not running");
        }
        Ok(())
    }

    async fn fail_run(&self, id: Uuid, message: &str, now: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE research_runs
            SET status = 'failed', completed_at = $2, error_message = $3
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(|e| PeriscopeError::Database(e.to_string()))?;
        if result.rows_affected() != 1 {
            warn!(run_id = %id, "Failed a run that was not running");
        }
        Ok(())
    }

    async fn record_email_outcome(&self, id: Uuid, sent: bool) -> Result<()> {
        // Delivery bookkeeping must never take down a completed run.
        let result = sqlx::query("UPDATE research_runs SET email_sent = $2 WHERE id = $1")
            .bind(id)
            .bind(sent)
            .execute(&self.pool)
            .await;
        if let Err(e) = result {
            warn!(run_id = %id, error = %e, "Failed to record email outcome");
        }
        Ok(())
    }

    async fn update_job_schedule(
        &self,
        job_id: Uuid,
        last_run_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE research_jobs SET last_run_at = $2, next_run_at = $3 WHERE id = $1",
        )
        .bind(job_id)
        .bind(last_run_at)
        .bind(next_run_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PeriscopeError::Database(e.to_string()))?;
        Ok(())
    }
}
