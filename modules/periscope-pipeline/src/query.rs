//! Builds the natural-language research query from a job's structured fields.
//!
//! Clause order is fixed: description, industry, geography, sources. A
//! clause is omitted entirely when its trigger condition is false.

use periscope_common::{GeoFocus, Job, SourceTag};

use crate::geo::{self, STRICT_JURISDICTION};

/// Fixed clause for the strict jurisdiction, naming its canonical market
/// institutions.
const SAUDI_MARKET_CLAUSE: &str = "with specific focus on the Saudi Arabian market, \
     Tadawul-listed companies, and regulatory positions from the CMA and SAMA";

/// Label table for the sources clause. Unrecognized tags render verbatim.
fn source_label(tag: &SourceTag) -> &str {
    match tag {
        SourceTag::News => "news sources",
        SourceTag::Academic => "academic papers",
        SourceTag::Social => "social media",
        SourceTag::Government => "government sources",
        SourceTag::Corporate => "corporate reports",
        SourceTag::Blogs => "industry blogs",
        SourceTag::Other(raw) => raw,
    }
}

/// Compose the research query for one job.
///
/// The sources clause fires only for 1–3 selected tags: zero tags means no
/// filter, and four or more covers every category, so neither end adds
/// signal. That range is product policy — preserve it exactly.
pub fn compose_query(job: &Job) -> String {
    let mut clauses: Vec<String> = vec![job.effective_description().to_string()];

    if let Some(industry) = job.industry.as_deref().filter(|s| !s.trim().is_empty()) {
        clauses.push(format!("in the {industry} industry"));
    }

    let code = geo::normalize_country(job.country.as_deref());
    if code == Some(STRICT_JURISDICTION) {
        clauses.push(SAUDI_MARKET_CLAUSE.to_string());
    } else if job.geo_focus == GeoFocus::Country
        && job
            .country
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    {
        let country = job.country.as_deref().unwrap_or_default().trim();
        clauses.push(format!("focused on {country}"));
    } else if job.geo_focus != GeoFocus::Global {
        clauses.push(format!("in {}", job.geo_focus.as_str().replace('-', " ")));
    }

    let tag_count = job.source_types.len();
    if (1..=3).contains(&tag_count) {
        let labels: Vec<&str> = job.source_types.iter().map(source_label).collect();
        clauses.push(format!("prioritizing {}", labels.join(", ")));
    }

    clauses.join(" ")
}
