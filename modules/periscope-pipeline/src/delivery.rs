//! Email delivery of finished reports, deliberately decoupled from run
//! outcome: a delivery failure is recorded on the run, never raised.

use periscope_common::{Job, ReportFormat};
use periscope_retrieval::ReportMailer;
use tracing::{info, warn};

/// Attempt delivery for a completed run.
///
/// Returns `None` when the job is not configured for email (no attempt is
/// made), otherwise `Some(sent)`.
pub async fn dispatch(
    mailer: &dyn ReportMailer,
    job: &Job,
    content: &str,
    format: ReportFormat,
) -> Option<bool> {
    if !job.delivery.includes_email() {
        return None;
    }
    let to = match job.delivery_email.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(to) => to,
        None => {
            warn!(job_id = %job.id, "Email delivery configured without a delivery address");
            return None;
        }
    };

    match mailer.send_report(to, &job.description, content, format).await {
        Ok(()) => {
            info!(job_id = %job.id, to, "Report delivered by email");
            Some(true)
        }
        Err(e) => {
            warn!(job_id = %job.id, to, error = %e, "Report email failed");
            Some(false)
        }
    }
}
