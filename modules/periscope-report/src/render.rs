//! Renders a structured [`Report`] into one of the four deliverable formats.
//!
//! All variants reproduce the full report content (title, summary, every
//! section, every citation, all metadata). The PDF variant is a deliberate
//! degraded-fidelity mode: a plain-text byte stream with non-ASCII stripped
//! and the textual payload capped at 4000 characters — not a PDF layout
//! engine. HTML and PDF escape all user-supplied text.

use periscope_common::ReportFormat;
use thiserror::Error;

use crate::report::Report;

/// Characters of text payload the PDF variant keeps.
const PDF_TEXT_CAP: usize = 4000;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A rendered deliverable: raw bytes plus the metadata a download or email
/// attachment needs.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub content: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Render a report into the requested format. The format set is closed:
/// adding a variant extends [`ReportFormat`] and this match, checked at
/// compile time.
pub fn render(report: &Report, format: ReportFormat) -> Result<RenderedDocument, RenderError> {
    let document = match format {
        ReportFormat::Html => RenderedDocument {
            content: render_html(report).into_bytes(),
            content_type: "text/html; charset=utf-8",
            filename: format!("{}.html", filename_stem(&report.title)),
        },
        ReportFormat::Markdown => RenderedDocument {
            content: render_markdown(report).into_bytes(),
            content_type: "text/markdown; charset=utf-8",
            filename: format!("{}.md", filename_stem(&report.title)),
        },
        ReportFormat::Json => RenderedDocument {
            content: serde_json::to_vec_pretty(report)?,
            content_type: "application/json",
            filename: format!("{}.json", filename_stem(&report.title)),
        },
        ReportFormat::Pdf => RenderedDocument {
            content: render_pdf(report),
            content_type: "application/pdf",
            filename: format!("{}.pdf", filename_stem(&report.title)),
        },
    };
    Ok(document)
}

/// Escape `& < > " '` so user-supplied text cannot inject markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_html(report: &Report) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&report.title)));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(&report.title)));
    html.push_str(&format!(
        "<p><em>{}</em></p>\n",
        escape_html(&report.executive_summary)
    ));

    for section in &report.sections {
        html.push_str(&format!("<h2>{}</h2>\n", escape_html(&section.heading)));
        html.push_str(&format!(
            "<p>{}</p>\n",
            escape_html(&section.body).replace('\n', "<br>\n")
        ));
        if !section.citation_ids.is_empty() {
            let refs: Vec<String> = section
                .citation_ids
                .iter()
                .map(|id| match report.citation(id) {
                    Some(citation) => escape_html(&citation.text),
                    // Dangling reference: show the raw identifier.
                    None => escape_html(id),
                })
                .collect();
            html.push_str(&format!("<p><small>Sources: {}</small></p>\n", refs.join("; ")));
        }
    }

    if !report.citations.is_empty() {
        html.push_str("<h2>Citations</h2>\n<ol>\n");
        for citation in &report.citations {
            html.push_str(&format!(
                "<li>{} — <a href=\"{}\">{}</a> (confidence {})</li>\n",
                escape_html(&citation.text),
                escape_html(&citation.source_url),
                escape_html(&citation.source_url),
                citation.confidence,
            ));
        }
        html.push_str("</ol>\n");
    }

    html.push_str(&format!(
        "<hr>\n<p><small>Sources analyzed: {} · Verified claims: {} · Overall confidence: {} · Generated: {}</small></p>\n",
        report.metadata.total_sources,
        report.metadata.verified_claims,
        report.metadata.confidence,
        report.metadata.generated_at.to_rfc3339(),
    ));
    html.push_str("</body>\n</html>\n");
    html
}

fn render_markdown(report: &Report) -> String {
    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", report.title));
    md.push_str("## Executive Summary\n\n");
    md.push_str(&format!("{}\n\n", report.executive_summary));

    for section in &report.sections {
        md.push_str(&format!("## {}\n\n", section.heading));
        md.push_str(&format!("{}\n\n", section.body));
        if !section.citation_ids.is_empty() {
            md.push_str(&format!("*Sources: {}*\n\n", section.citation_ids.join(", ")));
        }
    }

    if !report.citations.is_empty() {
        md.push_str("## Citations\n\n");
        for (i, citation) in report.citations.iter().enumerate() {
            md.push_str(&format!(
                "{}. {} — {} (confidence {})\n",
                i + 1,
                citation.text,
                citation.source_url,
                citation.confidence,
            ));
        }
        md.push('\n');
    }

    md.push_str("---\n");
    md.push_str(&format!(
        "Sources analyzed: {} · Verified claims: {} · Overall confidence: {} · Generated: {}\n",
        report.metadata.total_sources,
        report.metadata.verified_claims,
        report.metadata.confidence,
        report.metadata.generated_at.to_rfc3339(),
    ));
    md
}

/// Degraded-fidelity byte stream standing in for a typeset PDF: escaped,
/// ASCII-only plain text with the payload capped at [`PDF_TEXT_CAP`] chars.
fn render_pdf(report: &Report) -> Vec<u8> {
    let mut text = String::new();
    text.push_str(&format!("{}\n{}\n\n", escape_html(&report.title), "=".repeat(40)));
    text.push_str(&format!("EXECUTIVE SUMMARY\n\n{}\n\n", escape_html(&report.executive_summary)));

    for section in &report.sections {
        text.push_str(&format!(
            "{}\n{}\n{}\n\n",
            escape_html(&section.heading),
            "-".repeat(40),
            escape_html(&section.body)
        ));
    }

    if !report.citations.is_empty() {
        text.push_str("CITATIONS\n\n");
        for (i, citation) in report.citations.iter().enumerate() {
            text.push_str(&format!(
                "[{}] {} - {} (confidence {})\n",
                i + 1,
                escape_html(&citation.text),
                escape_html(&citation.source_url),
                citation.confidence,
            ));
        }
        text.push('\n');
    }

    text.push_str(&format!(
        "Sources analyzed: {} | Verified claims: {} | Overall confidence: {} | Generated: {}\n",
        report.metadata.total_sources,
        report.metadata.verified_claims,
        report.metadata.confidence,
        report.metadata.generated_at.to_rfc3339(),
    ));

    let ascii: String = text.chars().filter(|c| c.is_ascii()).collect();
    truncate_chars(&ascii, PDF_TEXT_CAP).to_string().into_bytes()
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Filesystem-safe stem derived from the report title.
fn filename_stem(title: &str) -> String {
    let stem: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let stem = stem.trim_matches('-').to_string();
    let stem: String = stem.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
    if stem.is_empty() {
        "report".to_string()
    } else {
        truncate_chars(&stem, 48).trim_matches('-').to_string()
    }
}
