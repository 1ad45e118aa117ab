//! Country normalization and jurisdiction policy.
//!
//! Free-text country input is normalized against a closed synonym table to a
//! canonical lowercase ISO-3166 alpha-2 code; unknown input yields no code,
//! not an error. A second predicate decides whether the strict verification
//! policy applies — either by code, or by jurisdiction keywords in the query
//! text, because free-text queries can imply a jurisdiction even when the
//! structured country field is empty.

/// Canonical code of the jurisdiction that triggers strict verification.
pub const STRICT_JURISDICTION: &str = "sa";

/// Alias → canonical code. Lookup happens after lowercasing, trimming, and
/// collapsing `_`/`-` to single spaces.
const COUNTRY_SYNONYMS: &[(&str, &str)] = &[
    ("saudi arabia", "sa"),
    ("kingdom of saudi arabia", "sa"),
    ("ksa", "sa"),
    ("saudi", "sa"),
    ("sa", "sa"),
    ("united arab emirates", "ae"),
    ("uae", "ae"),
    ("emirates", "ae"),
    ("ae", "ae"),
    ("qatar", "qa"),
    ("qa", "qa"),
    ("kuwait", "kw"),
    ("kw", "kw"),
    ("bahrain", "bh"),
    ("bh", "bh"),
    ("oman", "om"),
    ("om", "om"),
    ("egypt", "eg"),
    ("eg", "eg"),
    ("united states", "us"),
    ("united states of america", "us"),
    ("usa", "us"),
    ("america", "us"),
    ("us", "us"),
    ("united kingdom", "gb"),
    ("great britain", "gb"),
    ("britain", "gb"),
    ("england", "gb"),
    ("uk", "gb"),
    ("gb", "gb"),
    ("germany", "de"),
    ("de", "de"),
    ("france", "fr"),
    ("fr", "fr"),
    ("india", "in"),
    ("in", "in"),
    ("china", "cn"),
    ("cn", "cn"),
    ("japan", "jp"),
    ("jp", "jp"),
];

/// Keywords that imply the strict jurisdiction regardless of the country
/// field. Matched case-insensitively on word boundaries.
const STRICT_KEYWORDS: &[&str] = &[
    "saudi",
    "saudi arabia",
    "ksa",
    "tadawul",
    "nomu",
    "riyadh",
    "jeddah",
    "dammam",
    "vision 2030",
    "sama",
    "cma",
];

/// Normalize free-text country input to a canonical alpha-2 code.
/// Unknown input is not an error — it simply resolves to no code.
pub fn normalize_country(input: Option<&str>) -> Option<&'static str> {
    let raw = input?;
    let lowered = raw.to_lowercase().replace(['_', '-'], " ");
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    COUNTRY_SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == collapsed)
        .map(|(_, code)| *code)
}

/// Whether the strict verification policy applies: the resolved code is the
/// strict jurisdiction, or the query text names it. Callers must not skip
/// the keyword fallback — a query can imply the jurisdiction on its own.
pub fn is_strict_context(code: Option<&str>, query_text: &str) -> bool {
    if code == Some(STRICT_JURISDICTION) {
        return true;
    }
    let lowered = query_text.to_lowercase();
    STRICT_KEYWORDS.iter().any(|kw| contains_word(&lowered, kw))
}

/// Whole-word containment: `needle` must not be embedded in a larger
/// alphanumeric token.
fn contains_word(haystack: &str, needle: &str) -> bool {
    for (idx, matched) in haystack.match_indices(needle) {
        let before_ok = haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[idx + matched.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
    }
    false
}
