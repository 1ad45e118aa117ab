// Report synthesis over an Anthropic-style messages endpoint.
//
// The model is asked for Report-shaped JSON (schema generated from the
// Report type). Model output that fails to parse is wrapped into a
// single-section Report so callers always receive the structured form.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use periscope_common::ReportFormat;
use periscope_report::{Report, ReportMetadata, Section};

use crate::error::{Result, RetrievalError};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const MAX_TOKENS: u32 = 8192;

#[async_trait]
pub trait ReportSynthesizer: Send + Sync {
    /// Turn a compiled corpus plus the research query into a structured
    /// report. `format` is a rendering hint for prose style only; the
    /// returned value is always the structured form.
    async fn synthesize(&self, query: &str, corpus: &str, format: ReportFormat) -> Result<Report>;
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

// --- HTTP implementation ---

pub struct HttpSynthesizer {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpSynthesizer {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: ANTHROPIC_API_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    fn system_prompt(format: ReportFormat) -> String {
        let schema = schemars::schema_for!(Report);
        let schema_json =
            serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string());
        format!(
            "You are a research analyst. Using only the provided source material, \
             write a research report with an executive summary, thematic sections, \
             and citations back to the sources. Section bodies should read well as \
             {format}. Respond with a single JSON object matching this schema and \
             nothing else:\n\n{schema_json}"
        )
    }
}

#[async_trait]
impl ReportSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, query: &str, corpus: &str, format: ReportFormat) -> Result<Report> {
        let system = Self::system_prompt(format);
        let request = ChatRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: &system,
            messages: vec![WireMessage {
                role: "user",
                content: format!("Research query: {query}\n\nSource material:\n\n{corpus}"),
            }],
        };

        debug!(model = %self.model, corpus_chars = corpus.len(), "Synthesis request");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| RetrievalError::SynthesisFailed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::SynthesisFailed(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::SynthesisFailed(format!("invalid response: {e}")))?;

        let text: String = chat.content.into_iter().map(|b| b.text).collect();
        if text.trim().is_empty() {
            return Err(RetrievalError::SynthesisFailed(
                "model returned empty output".to_string(),
            ));
        }

        match parse_report_json(&text) {
            Some(report) => Ok(report),
            None => {
                warn!("Model output was not valid report JSON, wrapping prose");
                Ok(wrap_prose_report(query, &text, count_corpus_sources(corpus)))
            }
        }
    }
}

// --- Output handling ---

/// Parse model output as a Report, tolerating a surrounding markdown code
/// fence. Returns `None` when the output is not the structured form.
pub fn parse_report_json(text: &str) -> Option<Report> {
    let trimmed = text.trim();
    let body = strip_code_fence(trimmed);
    serde_json::from_str(body).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") up to the first newline.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").map(str::trim).unwrap_or(text)
}

/// Fallback for prose output: a single-section Report with metadata derived
/// from the corpus, so the pipeline always holds the structured form.
pub fn wrap_prose_report(query: &str, prose: &str, total_sources: u32) -> Report {
    let title = match query.char_indices().nth(80) {
        Some((idx, _)) => format!("{}…", &query[..idx].trim_end()),
        None => query.to_string(),
    };
    let executive_summary = prose
        .trim()
        .split("\n\n")
        .next()
        .unwrap_or("")
        .chars()
        .take(400)
        .collect();
    Report {
        title,
        executive_summary,
        sections: vec![Section {
            heading: "Findings".to_string(),
            body: prose.trim().to_string(),
            citation_ids: Vec::new(),
        }],
        citations: Vec::new(),
        metadata: ReportMetadata {
            total_sources,
            verified_claims: 0,
            confidence: 0.5,
            generated_at: Utc::now(),
        },
    }
}

/// Count the source blocks in a compiled corpus.
fn count_corpus_sources(corpus: &str) -> u32 {
    corpus.matches("## Source: ").count() as u32
}
