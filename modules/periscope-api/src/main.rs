use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use periscope_common::Config;
use periscope_pipeline::{PgStore, ResearchRunner, ResearchStore, TriggerRequest};
use periscope_retrieval::{
    DisabledMailer, HttpScraper, HttpSearchProvider, HttpSynthesizer, ReportMailer, SmtpMailer,
};

mod routes;

pub struct AppState {
    pub runner: ResearchRunner,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("periscope=info".parse()?))
        .init();

    info!("Periscope API starting...");

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = PgStore::new(pool);
    store.migrate().await?;
    let store: Arc<dyn ResearchStore> = Arc::new(store);

    let mailer: Arc<dyn ReportMailer> = match (
        &config.smtp_host,
        &config.smtp_username,
        &config.smtp_password,
        &config.smtp_from,
    ) {
        (Some(host), Some(user), Some(pass), Some(from)) => {
            Arc::new(SmtpMailer::new(host, user, pass, from)?)
        }
        _ => {
            warn!("SMTP not fully configured, email delivery disabled");
            Arc::new(DisabledMailer)
        }
    };

    let runner = ResearchRunner::new(
        store,
        Arc::new(HttpSearchProvider::new(
            &config.search_api_url,
            &config.search_api_key,
        )),
        Arc::new(HttpScraper::new(
            &config.scrape_api_url,
            &config.scrape_api_key,
        )),
        Arc::new(HttpSynthesizer::new(&config.anthropic_api_key)),
        mailer,
    );

    let state = Arc::new(AppState { runner });

    // Background trigger loop: at most one due run per tick.
    let loop_state = state.clone();
    let interval_secs = config.trigger_interval_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            match loop_state.runner.trigger(TriggerRequest::default()).await {
                Ok(response) if response.run_id.is_some() => {
                    info!(
                        run_id = ?response.run_id,
                        success = response.success,
                        "Scheduled trigger processed a run"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Scheduled trigger failed"),
            }
        }
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Trigger: execute a specific run or select the next due work
        .route("/api/research/trigger", post(routes::trigger))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Periscope API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
