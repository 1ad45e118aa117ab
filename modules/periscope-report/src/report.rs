use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The structured result of one research run: the renderer's input contract.
///
/// A Run owns at most one Report at a time; the Report has no persistence
/// lifecycle of its own beyond the Run it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Report {
    pub title: String,
    pub executive_summary: String,
    pub sections: Vec<Section>,
    pub citations: Vec<Citation>,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub heading: String,
    pub body: String,
    /// Identifiers into `Report::citations`. A dangling identifier is
    /// tolerated by every renderer, never a crash.
    #[serde(default)]
    pub citation_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Citation {
    pub id: String,
    /// Display text of the cited claim or source.
    pub text: String,
    pub source_url: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportMetadata {
    pub total_sources: u32,
    pub verified_claims: u32,
    /// Overall confidence in [0, 1].
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Look up a citation by identifier. Returns `None` for dangling
    /// references so renderers can degrade instead of failing.
    pub fn citation(&self, id: &str) -> Option<&Citation> {
        self.citations.iter().find(|c| c.id == id)
    }
}
