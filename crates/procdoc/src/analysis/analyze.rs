//! Analysis stage: aggregate statistics over the merged extracted text.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::extract::ExtractionOutput;

use super::{AnalysisError, ContentAnalysis, TermCount};

/// Maximum number of ranked key terms kept on the analysis result.
const MAX_KEY_TERMS: usize = 20;

fn amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[$€£]\s?\d[\d,]*(?:\.\d{1,2})?|\b\d[\d,]*(?:\.\d{1,2})?\s?(?:USD|EUR|GBP|CHF)\b")
            .unwrap()
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b\d{4}-\d{2}-\d{2}\b|\b\d{1,2}/\d{1,2}/\d{2,4}\b|\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4}\b",
        )
        .unwrap()
    })
}

/// Extracts monetary amount mentions from text, deduplicated in order of
/// first appearance.
pub(crate) fn find_amounts(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in amount_regex().find_iter(text) {
        let amount = m.as_str().trim().to_string();
        if !seen.contains(&amount) {
            seen.push(amount);
        }
    }
    seen
}

fn find_dates(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in date_regex().find_iter(text) {
        let date = m.as_str().trim().to_string();
        if !seen.contains(&date) {
            seen.push(date);
        }
    }
    seen
}

/// Analyzes the merged text of all extracted documents.
///
/// Fails with [`AnalysisError::EmptyCorpus`] when no document yielded any
/// text (e.g. image-only PDFs).
pub fn analyze(extraction: &ExtractionOutput) -> Result<ContentAnalysis, AnalysisError> {
    let merged = extraction.merged_text();
    if merged.trim().is_empty() {
        return Err(AnalysisError::EmptyCorpus);
    }

    let word_count = merged.split_whitespace().count();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for term in super::tokenize(&merged) {
        *counts.entry(term).or_insert(0) += 1;
    }

    let mut key_terms: Vec<TermCount> = counts
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();
    // Ties break alphabetically so the ranking is stable.
    key_terms.sort_by(|a, b| b.count.cmp(&a.count).then(a.term.cmp(&b.term)));
    key_terms.truncate(MAX_KEY_TERMS);

    Ok(ContentAnalysis {
        word_count,
        document_count: extraction.documents.len(),
        key_terms,
        amounts: find_amounts(&merged),
        dates: find_dates(&merged),
    })
}
