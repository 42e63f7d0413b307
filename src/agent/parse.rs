//! Parsing helpers for pipeline stages: fund-name extraction from the
//! query analysis, search-term parsing from free-form generator output,
//! comparison intent detection, and result deduplication.

use crate::core::fund::FundSummary;
use anyhow::{Result, bail};
use std::collections::HashMap;

/// Placeholder values a generator may emit in place of a fund name.
const NAME_SENTINELS: [&str; 3] = ["none", "not mentioned", "not specified"];

const COMPARISON_KEYWORDS: [&str; 11] = [
    "compare",
    "comparison",
    "versus",
    "vs",
    "vs.",
    "better",
    "difference",
    "differences",
    "which is better",
    "contrast",
    "against",
];

/// Extracts candidate fund names from the query analysis text.
///
/// Any line containing the token "fund" and a colon yields the text
/// after the first colon, unless it is empty or a sentinel value.
pub fn extract_fund_names(analysis: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in analysis.lines() {
        if !line.to_lowercase().contains("fund") {
            continue;
        }
        if let Some((_, name_part)) = line.split_once(':') {
            let name = name_part.trim();
            if !name.is_empty() && !NAME_SENTINELS.contains(&name.to_lowercase().as_str()) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Parses search terms from a generator response.
///
/// Preference order: items inside the first bracketed list (as
/// double-quoted substrings, then single-quoted, then comma-split);
/// without a bracketed list, newline-split when newlines exist, else
/// comma-split. Producing zero usable terms is an error so the caller
/// can fall back to a raw-query search.
pub fn parse_search_terms(text: &str) -> Result<Vec<String>> {
    let terms = match bracketed_span(text) {
        Some(span) => {
            let mut terms = quoted_substrings(span, '"');
            if terms.is_empty() {
                terms = quoted_substrings(span, '\'');
            }
            if terms.is_empty() {
                terms = split_collect(span, ',');
            }
            terms
        }
        None => {
            if text.contains('\n') {
                split_collect(text, '\n')
            } else {
                split_collect(text, ',')
            }
        }
    };

    if terms.is_empty() {
        bail!("No search terms found in response");
    }
    Ok(terms)
}

/// Whether the query asks for a fund comparison.
pub fn is_comparison_query(query: &str) -> bool {
    let query = query.to_lowercase();
    COMPARISON_KEYWORDS
        .iter()
        .any(|keyword| query.contains(keyword))
}

/// Deduplicates search results by scheme code: first-seen position,
/// last-seen value.
pub fn dedup_by_scheme_code(results: Vec<FundSummary>) -> Vec<FundSummary> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<FundSummary> = Vec::new();
    for summary in results {
        match seen.get(&summary.scheme_code) {
            Some(&index) => unique[index] = summary,
            None => {
                seen.insert(summary.scheme_code.clone(), unique.len());
                unique.push(summary);
            }
        }
    }
    unique
}

/// Content of the first `[...]` span, possibly spanning lines.
fn bracketed_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let rest = &text[start + 1..];
    let end = rest.find(']')?;
    Some(&rest[..end])
}

/// All substrings delimited by `quote` pairs.
fn quoted_substrings(text: &str, quote: char) -> Vec<String> {
    let mut terms = Vec::new();
    let mut parts = text.split(quote);
    // Text before the first quote is not an item
    parts.next();
    while let (Some(inside), Some(_)) = (parts.next(), parts.next()) {
        if !inside.trim().is_empty() {
            terms.push(inside.to_string());
        }
    }
    terms
}

fn split_collect(text: &str, separator: char) -> Vec<String> {
    text.split(separator)
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}
