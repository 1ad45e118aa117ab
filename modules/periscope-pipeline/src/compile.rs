//! Fetch & compile stage: policy-parameterized search plus custom-site
//! scrapes, folded into one bounded corpus for analysis.

use periscope_common::{Job, PeriscopeError, ResearchDepth, SearchResult};
use periscope_retrieval::{
    RetrievalError, SearchProvider, SearchRequest, SiteScraper,
};
use tracing::{info, warn};

/// Custom websites consulted per run, regardless of how many are configured.
pub const MAX_CUSTOM_SITES: usize = 5;
/// Per-source cap on extracted text within the corpus.
pub const SOURCE_TEXT_CAP: usize = 5_000;
/// Cap on the whole compiled corpus.
pub const CORPUS_CAP: usize = 50_000;
/// A corpus below this floor fails the run: the single content-quality gate.
pub const MIN_CORPUS_CHARS: usize = 100;

/// Result-count budget for the search, by research depth.
pub fn result_budget(depth: ResearchDepth) -> u32 {
    match depth {
        ResearchDepth::Quick => 5,
        ResearchDepth::Deep => 15,
        ResearchDepth::Standard => 10,
    }
}

/// Minimum acceptable reachable sources. Strict contexts demand more.
pub fn min_sources(strict: bool) -> u32 {
    if strict {
        3
    } else {
        2
    }
}

/// Run the search and augment with the job's custom sites.
///
/// Search failure is a hard failure of the run. Custom sites are scraped
/// one at a time; each failure is logged and skipped — a single bad site
/// never aborts the run.
pub async fn fetch_sources(
    search: &dyn SearchProvider,
    scraper: &dyn SiteScraper,
    job: &Job,
    query: &str,
    strict: bool,
    country_code: Option<&str>,
) -> Result<Vec<SearchResult>, PeriscopeError> {
    let request = SearchRequest {
        query: query.to_string(),
        limit: result_budget(job.depth),
        scrape_content: true,
        strict_mode: strict,
        min_sources: min_sources(strict),
        country_code: country_code.map(str::to_string),
    };

    let outcome = search.search(&request).await.map_err(search_failure)?;
    if !outcome.unreachable.is_empty() {
        warn!(
            unreachable = outcome.unreachable.len(),
            "Some sources were unreachable"
        );
    }

    let mut results = outcome.results;

    for url in job.custom_sites.iter().take(MAX_CUSTOM_SITES) {
        match scraper.scrape(url).await {
            Ok(site) => {
                info!(url, chars = site.markdown.chars().count(), "Custom site scraped");
                results.push(SearchResult {
                    title: site.title.unwrap_or_else(|| site.url.clone()),
                    url: site.url,
                    description: String::new(),
                    text: site.markdown,
                    published_at: None,
                    status: Some("custom".to_string()),
                });
            }
            Err(e) => {
                warn!(url, error = %e, "Custom site scrape failed, skipping");
            }
        }
    }

    Ok(results)
}

/// Map a retrieval failure to the run-level search error, folding any
/// unreachable sources into the message as `name (reason)` pairs.
fn search_failure(err: RetrievalError) -> PeriscopeError {
    match err {
        RetrievalError::SearchFailed {
            message,
            unreachable,
        } if !unreachable.is_empty() => {
            let pairs: Vec<String> = unreachable
                .iter()
                .map(|u| format!("{} ({})", u.name, u.reason))
                .collect();
            PeriscopeError::Search(format!("{message}. Unreachable: {}", pairs.join(", ")))
        }
        RetrievalError::SearchFailed { message, .. } => PeriscopeError::Search(message),
        other => PeriscopeError::Search(other.to_string()),
    }
}

/// Compile retrieved sources into one bounded corpus. Results with no
/// extracted text are dropped; each source body is capped, then the whole
/// corpus is capped.
pub fn compile_corpus(results: &[SearchResult]) -> Result<String, PeriscopeError> {
    let mut corpus = String::new();
    for result in results {
        if result.text.trim().is_empty() {
            continue;
        }
        corpus.push_str(&format!(
            "## Source: {}\nURL: {}\n\n{}\n\n---\n",
            result.title,
            result.url,
            truncate_chars(&result.text, SOURCE_TEXT_CAP)
        ));
    }

    let corpus = truncate_chars(&corpus, CORPUS_CAP);
    if corpus.chars().count() < MIN_CORPUS_CHARS {
        return Err(PeriscopeError::InsufficientContent);
    }
    Ok(corpus.to_string())
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{make_job, MockScraper, MockSearch};
    use periscope_common::ResearchDepth;

    fn result(title: &str, url: &str, text: &str) -> SearchResult {
        SearchResult {
            url: url.to_string(),
            title: title.to_string(),
            description: String::new(),
            text: text.to_string(),
            published_at: None,
            status: None,
        }
    }

    #[test]
    fn depth_maps_to_result_budget() {
        assert_eq!(result_budget(ResearchDepth::Quick), 5);
        assert_eq!(result_budget(ResearchDepth::Standard), 10);
        assert_eq!(result_budget(ResearchDepth::Deep), 15);
    }

    #[test]
    fn strict_mode_raises_min_sources() {
        assert_eq!(min_sources(false), 2);
        assert_eq!(min_sources(true), 3);
    }

    #[test]
    fn corpus_block_format() {
        let corpus =
            compile_corpus(&[result("Title", "https://a.example", &"x".repeat(200))]).unwrap();
        assert!(corpus.starts_with("## Source: Title\nURL: https://a.example\n\n"));
        assert!(corpus.ends_with("\n\n---\n"));
    }

    #[test]
    fn empty_text_results_are_dropped() {
        let results = vec![
            result("Empty", "https://e.example", "   "),
            result("Full", "https://f.example", &"y".repeat(200)),
        ];
        let corpus = compile_corpus(&results).unwrap();
        assert!(!corpus.contains("Empty"));
        assert!(corpus.contains("Full"));
    }

    #[test]
    fn per_source_and_total_caps_hold() {
        let results: Vec<SearchResult> = (0..20)
            .map(|i| result(&format!("S{i}"), "https://s.example", &"z".repeat(9_000)))
            .collect();
        let corpus = compile_corpus(&results).unwrap();
        assert!(corpus.chars().count() <= CORPUS_CAP);
        // Each block carries at most the per-source cap of body text.
        let first_block = corpus.split("---").next().unwrap();
        assert!(first_block.chars().filter(|c| *c == 'z').count() <= SOURCE_TEXT_CAP);
    }

    #[test]
    fn short_corpus_fails_with_insufficient_content() {
        let err = compile_corpus(&[result("Tiny", "https://t.example", "ok")]).unwrap_err();
        assert!(matches!(err, PeriscopeError::InsufficientContent));

        let err = compile_corpus(&[]).unwrap_err();
        assert!(matches!(err, PeriscopeError::InsufficientContent));
    }

    #[tokio::test]
    async fn custom_site_failures_never_abort_the_fetch() {
        let mut job = make_job("topic");
        job.custom_sites = vec![
            "https://good.example".to_string(),
            "https://bad.example".to_string(),
        ];

        let search = MockSearch::with_results(vec![result("Web", "https://w.example", "body")]);
        let scraper = MockScraper::new()
            .with_page("https://good.example", Some("Good"), "custom content");

        let results = fetch_sources(&search, &scraper, &job, "topic", false, None)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "Good");
        assert_eq!(results[1].status.as_deref(), Some("custom"));
    }

    #[tokio::test]
    async fn only_first_five_custom_sites_are_consulted() {
        let mut job = make_job("topic");
        job.custom_sites = (0..8).map(|i| format!("https://s{i}.example")).collect();

        let mut scraper = MockScraper::new();
        for i in 0..8 {
            scraper = scraper.with_page(
                &format!("https://s{i}.example"),
                Some(&format!("S{i}")),
                "content",
            );
        }
        let search = MockSearch::with_results(vec![]);

        let results = fetch_sources(&search, &scraper, &job, "topic", false, None)
            .await
            .unwrap();
        assert_eq!(results.len(), MAX_CUSTOM_SITES);
    }

    #[tokio::test]
    async fn search_failure_includes_unreachable_pairs() {
        let job = make_job("topic");
        let search = MockSearch::failing(
            "no reachable sources",
            vec![periscope_retrieval::UnreachableSource {
                name: "X".to_string(),
                reason: "timeout".to_string(),
            }],
        );
        let scraper = MockScraper::new();

        let err = fetch_sources(&search, &scraper, &job, "topic", true, None)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Unreachable: X (timeout)"), "{message}");
    }

    #[tokio::test]
    async fn strict_flag_flows_into_the_search_request() {
        let job = make_job("topic");
        let search = MockSearch::with_results(vec![result("R", "https://r.example", "text")]);
        let scraper = MockScraper::new();

        fetch_sources(&search, &scraper, &job, "topic", true, Some("sa"))
            .await
            .unwrap();

        let requests = search.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].strict_mode);
        assert_eq!(requests[0].min_sources, 3);
        assert_eq!(requests[0].country_code.as_deref(), Some("sa"));
        assert!(requests[0].scrape_content);
    }
}
