// End-to-end pipeline tests against mock capabilities and the in-memory
// store: no network, no database.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use periscope_common::{
    DeliveryMethod, ExecutionMode, ReportFormat, RunStatus, ScheduleType, SourceTag,
};
use periscope_pipeline::testing::{
    make_job, make_pending_run, make_report, make_search_result, MemoryStore, MockMailer,
    MockScraper, MockSearch, MockSynthesizer,
};
use periscope_pipeline::{ResearchRunner, TriggerRequest};
use periscope_retrieval::UnreachableSource;

struct Harness {
    store: Arc<MemoryStore>,
    search: Arc<MockSearch>,
    synthesizer: Arc<MockSynthesizer>,
    mailer: Arc<MockMailer>,
    runner: ResearchRunner,
}

fn harness(search: MockSearch, scraper: MockScraper, synthesizer: MockSynthesizer) -> Harness {
    harness_with_mailer(search, scraper, synthesizer, MockMailer::new())
}

fn harness_with_mailer(
    search: MockSearch,
    scraper: MockScraper,
    synthesizer: MockSynthesizer,
    mailer: MockMailer,
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let search = Arc::new(search);
    let synthesizer = Arc::new(synthesizer);
    let mailer = Arc::new(mailer);
    let runner = ResearchRunner::new(
        store.clone(),
        search.clone(),
        Arc::new(scraper),
        synthesizer.clone(),
        mailer.clone(),
    );
    Harness {
        store,
        search,
        synthesizer,
        mailer,
        runner,
    }
}

fn default_search() -> MockSearch {
    MockSearch::with_results(vec![make_search_result(
        "Background article",
        "https://news.example/article",
        &"substantial article body ".repeat(20),
    )])
}

#[tokio::test]
async fn completed_run_has_report_and_no_error() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("Chip Exports")),
    );
    let job = make_job("AI chip export policy");
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    let response = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.task_id, Some(job.id));
    assert_eq!(response.run_id, Some(run.id));
    assert!(response.report_length.unwrap() > 0);
    assert_eq!(response.error, None);

    let stored = h.store.get_run(run.id).unwrap();
    assert_eq!(stored.status, RunStatus::Completed);
    assert!(stored.started_at.is_some());
    assert!(stored.completed_at.is_some());
    assert!(stored.report_content.as_deref().unwrap().contains("Chip Exports"));
    assert_eq!(stored.report_format, Some(ReportFormat::Markdown));
    assert_eq!(stored.error_message, None);
}

#[tokio::test]
async fn failed_search_marks_run_failed_with_unreachable_sources() {
    let h = harness(
        MockSearch::failing(
            "no reachable sources met the minimum",
            vec![UnreachableSource {
                name: "X".to_string(),
                reason: "timeout".to_string(),
            }],
        ),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("unused")),
    );
    let job = make_job("AI chip export policy");
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    let response = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap();

    assert!(!response.success);
    let error = response.error.unwrap();
    assert!(error.contains("Unreachable: X (timeout)"), "{error}");

    let stored = h.store.get_run(run.id).unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert!(stored.error_message.as_deref().unwrap().contains("Unreachable: X (timeout)"));
    assert_eq!(stored.report_content, None);
    assert_eq!(stored.report_format, None);
}

#[tokio::test]
async fn saudi_weekly_job_forces_strict_mode_and_composed_clauses() {
    let h = harness(
        MockSearch::failing(
            "zero reachable sources",
            vec![UnreachableSource {
                name: "X".to_string(),
                reason: "timeout".to_string(),
            }],
        ),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("unused")),
    );
    let mut job = make_job("AI chip export policy");
    job.country = Some("Saudi Arabia".to_string());
    job.source_types = vec![SourceTag::News, SourceTag::Government];
    job.schedule = ScheduleType::Weekly;
    job.execution_mode = ExecutionMode::Automatic;
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    let response = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap();

    assert!(!response.success);
    assert!(response.error.unwrap().contains("Unreachable: X (timeout)"));

    let requests = h.search.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].strict_mode);
    assert_eq!(requests[0].min_sources, 3);
    assert!(requests[0].query.contains("Tadawul"));
    assert!(requests[0].query.contains("news sources, government sources"));
    drop(requests);

    // A failed attempt still advances the schedule.
    let stored_job = h.store.get_job(job.id).unwrap();
    assert!(stored_job.last_run_at.is_some());
    assert!(stored_job.next_run_at.unwrap() > Utc::now());
}

#[tokio::test]
async fn synthesis_failure_marks_run_failed() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::failing(),
    );
    let job = make_job("quantum networking");
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    let response = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap();

    assert!(!response.success);
    let stored = h.store.get_run(run.id).unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert!(!stored.error_message.unwrap().is_empty());
    assert_eq!(stored.report_content, None);
}

#[tokio::test]
async fn thin_corpus_fails_with_insufficient_content() {
    let h = harness(
        MockSearch::with_results(vec![make_search_result(
            "Tiny",
            "https://tiny.example",
            "ok",
        )]),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("unused")),
    );
    let job = make_job("obscure topic");
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    let response = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap();

    assert!(!response.success);
    let stored = h.store.get_run(run.id).unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert!(stored
        .error_message
        .unwrap()
        .to_lowercase()
        .contains("insufficient content"));
}

#[tokio::test]
async fn custom_site_failure_does_not_abort_the_run() {
    let search = default_search();
    let scraper = MockScraper::new().with_page(
        "https://reachable.example",
        Some("Reachable"),
        &"custom site analysis ".repeat(20),
    );
    let h = harness(
        search,
        scraper,
        MockSynthesizer::returning(make_report("Resilient")),
    );
    let mut job = make_job("resilience");
    job.custom_sites = vec![
        "https://unreachable.example".to_string(),
        "https://reachable.example".to_string(),
    ];
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    let response = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap();

    assert!(response.success);
    let calls = h.synthesizer.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    // The reachable custom site made it into the corpus; the dead one is absent.
    assert!(calls[0].1.contains("Reachable"));
    assert!(!calls[0].1.contains("unreachable.example"));
}

#[tokio::test]
async fn email_delivery_failure_keeps_run_completed() {
    let h = harness_with_mailer(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("Delivered")),
        MockMailer::failing(),
    );
    let mut job = make_job("delivery test");
    job.delivery = DeliveryMethod::Email;
    job.delivery_email = Some("analyst@example.com".to_string());
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    let response = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.email_sent, Some(false));

    let stored = h.store.get_run(run.id).unwrap();
    assert_eq!(stored.status, RunStatus::Completed);
    assert_eq!(stored.email_sent, Some(false));
    assert!(stored.report_content.is_some());
}

#[tokio::test]
async fn email_delivery_success_is_recorded() {
    let h = harness_with_mailer(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("Delivered")),
        MockMailer::new(),
    );
    let mut job = make_job("delivery test");
    job.delivery = DeliveryMethod::Both;
    job.delivery_email = Some("analyst@example.com".to_string());
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    let response = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap();

    assert_eq!(response.email_sent, Some(true));
    assert_eq!(h.store.get_run(run.id).unwrap().email_sent, Some(true));
    assert_eq!(h.mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn run_cannot_be_executed_twice() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("Once")),
    );
    let job = make_job("once only");
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    let request = TriggerRequest {
        task_id: Some(job.id),
        run_id: Some(run.id),
    };
    h.runner.trigger(request.clone()).await.unwrap();

    // Second attempt loses the claim: input error, run state untouched.
    let err = h.runner.trigger(request).await.unwrap_err();
    assert!(err.is_input_error());
    assert_eq!(h.store.get_run(run.id).unwrap().status, RunStatus::Completed);
    assert_eq!(h.search.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn mismatched_task_and_run_is_an_input_error() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("unused")),
    );
    let job = make_job("a");
    let other = make_job("b");
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_job(other.clone());
    h.store.insert_run(run.clone());

    let err = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(other.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap_err();

    assert!(err.is_input_error());
    // Nothing mutated.
    assert_eq!(h.store.get_run(run.id).unwrap().status, RunStatus::Pending);
}

#[tokio::test]
async fn half_specified_trigger_is_an_input_error() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("unused")),
    );
    let err = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(Uuid::new_v4()),
            run_id: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_input_error());
}

#[tokio::test]
async fn inactive_job_is_an_input_error() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("unused")),
    );
    let mut job = make_job("paused");
    job.active = false;
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    let err = h
        .runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap_err();
    assert!(err.is_input_error());
    assert_eq!(h.store.get_run(run.id).unwrap().status, RunStatus::Pending);
}

#[tokio::test]
async fn empty_trigger_selects_oldest_pending_run() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("Oldest")),
    );
    let job = make_job("queue order");
    h.store.insert_job(job.clone());

    let mut older = make_pending_run(job.id);
    older.created_at = Utc::now() - Duration::hours(2);
    let newer = make_pending_run(job.id);
    h.store.insert_run(older.clone());
    h.store.insert_run(newer.clone());

    let response = h.runner.trigger(TriggerRequest::default()).await.unwrap();

    assert_eq!(response.run_id, Some(older.id));
    assert_eq!(h.store.get_run(older.id).unwrap().status, RunStatus::Completed);
    assert_eq!(h.store.get_run(newer.id).unwrap().status, RunStatus::Pending);
}

#[tokio::test]
async fn empty_trigger_creates_a_run_for_the_due_job() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("Due")),
    );
    let mut job = make_job("due weekly digest");
    job.schedule = ScheduleType::Weekly;
    job.execution_mode = ExecutionMode::Automatic;
    job.next_run_at = Some(Utc::now() - Duration::minutes(5));
    h.store.insert_job(job.clone());

    let response = h.runner.trigger(TriggerRequest::default()).await.unwrap();

    assert!(response.success);
    assert_eq!(response.task_id, Some(job.id));
    let run = h.store.get_run(response.run_id.unwrap()).unwrap();
    assert_eq!(run.status, RunStatus::Completed);

    let stored_job = h.store.get_job(job.id).unwrap();
    assert!(stored_job.next_run_at.unwrap() > Utc::now());
    assert!(stored_job.last_run_at.is_some());
}

#[tokio::test]
async fn manual_job_never_gets_a_next_run() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("Manual")),
    );
    let job = make_job("one-off dig");
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    h.runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap();

    let stored_job = h.store.get_job(job.id).unwrap();
    assert!(stored_job.last_run_at.is_some());
    assert_eq!(stored_job.next_run_at, None);
}

#[tokio::test]
async fn empty_trigger_with_no_work_succeeds_quietly() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("unused")),
    );
    let response = h.runner.trigger(TriggerRequest::default()).await.unwrap();
    assert!(response.success);
    assert_eq!(response.task_id, None);
    assert_eq!(response.run_id, None);
    assert_eq!(h.search.requests.lock().unwrap().len(), 0);
}

#[tokio::test]
async fn rendered_report_format_follows_the_job() {
    let h = harness(
        default_search(),
        MockScraper::new(),
        MockSynthesizer::returning(make_report("Formatted")),
    );
    let mut job = make_job("format check");
    job.report_format = ReportFormat::Html;
    let run = make_pending_run(job.id);
    h.store.insert_job(job.clone());
    h.store.insert_run(run.clone());

    h.runner
        .trigger(TriggerRequest {
            task_id: Some(job.id),
            run_id: Some(run.id),
        })
        .await
        .unwrap();

    let stored = h.store.get_run(run.id).unwrap();
    assert_eq!(stored.report_format, Some(ReportFormat::Html));
    let content = stored.report_content.unwrap();
    assert!(content.contains("<h1>Formatted</h1>"));
}
