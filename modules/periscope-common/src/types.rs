use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

// --- Run lifecycle ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    /// Terminal runs are never revisited.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Job enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDepth {
    Quick,
    Standard,
    Deep,
}

impl ResearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchDepth::Quick => "quick",
            ResearchDepth::Standard => "standard",
            ResearchDepth::Deep => "deep",
        }
    }

    /// Unknown depth strings fall back to the default depth.
    pub fn parse(s: &str) -> Self {
        match s {
            "quick" => ResearchDepth::Quick,
            "deep" => ResearchDepth::Deep,
            _ => ResearchDepth::Standard,
        }
    }
}

impl Default for ResearchDepth {
    fn default() -> Self {
        ResearchDepth::Standard
    }
}

/// Source-type tag a job can select. Unrecognized tags are carried verbatim
/// in `Other` so downstream label lookups can fall back to the raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceTag {
    News,
    Academic,
    Social,
    Government,
    Corporate,
    Blogs,
    Other(String),
}

impl SourceTag {
    pub fn as_str(&self) -> &str {
        match self {
            SourceTag::News => "news",
            SourceTag::Academic => "academic",
            SourceTag::Social => "social",
            SourceTag::Government => "government",
            SourceTag::Corporate => "corporate",
            SourceTag::Blogs => "blogs",
            SourceTag::Other(raw) => raw,
        }
    }

    /// Total mapping: never fails, unknown tags become `Other`.
    pub fn parse(s: &str) -> Self {
        match s {
            "news" => SourceTag::News,
            "academic" => SourceTag::Academic,
            "social" => SourceTag::Social,
            "government" => SourceTag::Government,
            "corporate" => SourceTag::Corporate,
            "blogs" => SourceTag::Blogs,
            other => SourceTag::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for SourceTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(SourceTag::parse(&s))
    }
}

/// Geographic focus of a job. `Region` carries the raw focus slug
/// (e.g. "middle-east") so query composition can render it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoFocus {
    Global,
    Country,
    Region(String),
}

impl GeoFocus {
    pub fn as_str(&self) -> &str {
        match self {
            GeoFocus::Global => "global",
            GeoFocus::Country => "country",
            GeoFocus::Region(slug) => slug,
        }
    }

    /// Total mapping: anything that is not "global" or "country" is a region slug.
    pub fn parse(s: &str) -> Self {
        match s {
            "global" => GeoFocus::Global,
            "country" => GeoFocus::Country,
            other => GeoFocus::Region(other.to_string()),
        }
    }
}

impl Serialize for GeoFocus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GeoFocus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(GeoFocus::parse(&s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    None,
    Email,
    Both,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::None => "none",
            DeliveryMethod::Email => "email",
            DeliveryMethod::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(DeliveryMethod::None),
            "email" => Some(DeliveryMethod::Email),
            "both" => Some(DeliveryMethod::Both),
            _ => None,
        }
    }

    pub fn includes_email(&self) -> bool {
        matches!(self, DeliveryMethod::Email | DeliveryMethod::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Manual,
    Daily,
    Weekly,
    Monthly,
    Annually,
    Custom,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Manual => "manual",
            ScheduleType::Daily => "daily",
            ScheduleType::Weekly => "weekly",
            ScheduleType::Monthly => "monthly",
            ScheduleType::Annually => "annually",
            ScheduleType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(ScheduleType::Manual),
            "daily" => Some(ScheduleType::Daily),
            "weekly" => Some(ScheduleType::Weekly),
            "monthly" => Some(ScheduleType::Monthly),
            "annually" => Some(ScheduleType::Annually),
            "custom" => Some(ScheduleType::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Manual,
    Automatic,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Manual => "manual",
            ExecutionMode::Automatic => "automatic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(ExecutionMode::Manual),
            "automatic" => Some(ExecutionMode::Automatic),
            _ => None,
        }
    }
}

/// Output format for a rendered report. A closed set — adding a format is a
/// compile-time-checked extension, not a string-match default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Html,
    Markdown,
    Json,
    Pdf,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Markdown => "markdown",
            ReportFormat::Json => "json",
            ReportFormat::Pdf => "pdf",
        }
    }

    /// Parse a client-supplied format string. "md" is an accepted alias for
    /// markdown; anything else is the caller's error, not a crash.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "html" => Some(ReportFormat::Html),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            "json" => Some(ReportFormat::Json),
            "pdf" => Some(ReportFormat::Pdf),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Job ---

/// A persisted, user-authored research task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub description: String,
    pub enhanced_description: Option<String>,
    pub industry: Option<String>,
    pub depth: ResearchDepth,
    pub source_types: Vec<SourceTag>,
    pub geo_focus: GeoFocus,
    pub country: Option<String>,
    /// Custom website URLs. At most the first 5 are consulted per run.
    pub custom_sites: Vec<String>,
    pub report_format: ReportFormat,
    pub delivery: DeliveryMethod,
    pub delivery_email: Option<String>,
    pub schedule: ScheduleType,
    /// Interval in days for `ScheduleType::Custom` (default 7 if unset).
    pub interval_days: Option<i64>,
    pub execution_mode: ExecutionMode,
    pub active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Invariant: `None` whenever schedule or execution mode is manual.
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// The text a run researches: the AI-enhanced description when present,
    /// the raw description otherwise.
    pub fn effective_description(&self) -> &str {
        match self.enhanced_description.as_deref() {
            Some(enhanced) if !enhanced.trim().is_empty() => enhanced,
            _ => &self.description,
        }
    }
}

// --- Run ---

/// One concrete execution attempt of a Job.
///
/// Status transitions are monotonic: pending → running → {completed|failed}.
/// Timestamps stay null until the corresponding transition occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub report_content: Option<String>,
    pub report_format: Option<ReportFormat>,
    pub error_message: Option<String>,
    /// Null until a delivery attempt was made; independent of run status.
    pub email_sent: Option<bool>,
    pub created_at: DateTime<Utc>,
}

// --- SearchResult ---

/// One retrieved source during a run. Ephemeral: folded into the compiled
/// corpus and discarded after analysis, never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub description: String,
    /// Extracted main-content text. Empty when scraping produced nothing.
    pub text: String,
    pub published_at: Option<String>,
    pub status: Option<String>,
}
