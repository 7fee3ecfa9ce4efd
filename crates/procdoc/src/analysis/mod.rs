//! Content analysis over extracted text: term statistics, cross-document
//! comparison and insight generation.
//!
//! All three stages are deterministic over their inputs; only the
//! orchestrator writes their results onto the job record.

pub mod analyze;
pub mod compare;
pub mod insights;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::record::DocumentRef;

pub use analyze::analyze;
pub use compare::compare;
pub use insights::generate_insights;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No text content to analyze")]
    EmptyCorpus,

    #[error("Comparison requires at least two documents, got {0}")]
    NotEnoughDocuments(usize),
}

/// A term and how often it occurs, ranked by count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

/// Analysis stage output: aggregate statistics over the merged text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    pub word_count: usize,
    pub document_count: usize,
    pub key_terms: Vec<TermCount>,
    pub amounts: Vec<String>,
    pub dates: Vec<String>,
}

/// Terms that appear in one document but not the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTerms {
    pub storage_key: String,
    pub terms: Vec<String>,
}

/// Range of monetary amounts seen across the compared documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

/// Comparison stage output, produced only for multi-document jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentComparison {
    pub document_count: usize,
    /// Jaccard similarity of the documents' term sets, averaged over pairs.
    pub similarity: f64,
    pub shared_terms: Vec<String>,
    pub distinctive_terms: Vec<DocumentTerms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_range: Option<AmountRange>,
}

/// Insight stage output. `key_points` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightReport {
    pub summary: String,
    pub key_points: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Final stored payload, written to the blob store on completion.
///
/// `next_steps` is a single prose field and `source_documents` carries the
/// full document references, declared types included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub summary: String,
    pub key_points: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_steps: String,
    pub source_documents: Vec<DocumentRef>,
}

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "been", "from", "they", "this", "that", "with", "will",
    "would", "there", "their", "what", "which", "when", "were", "than", "then", "them", "these",
    "those", "such", "into", "also", "each", "other", "more", "some", "shall", "may", "must",
    "upon", "under", "its", "his", "she", "him", "who", "how", "why", "where", "per", "via",
];

/// Lowercases and splits text into significant terms: alphabetic tokens of
/// three or more characters that are not stop words.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().any(|c| c.is_alphabetic()))
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// The distinct term set of a text.
pub(crate) fn term_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}
