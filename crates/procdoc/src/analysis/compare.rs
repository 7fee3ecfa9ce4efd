//! Comparison stage: term-set overlap across the documents of a
//! multi-document job.

use std::collections::HashSet;

use crate::extract::ExtractionOutput;

use super::analyze::find_amounts;
use super::{term_set, AmountRange, AnalysisError, DocumentComparison, DocumentTerms};

/// Cap on listed shared terms.
const MAX_SHARED_TERMS: usize = 20;
/// Cap on listed distinctive terms per document.
const MAX_DISTINCTIVE_TERMS: usize = 10;

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Parses a detected amount mention ("$1,200.50", "300 EUR") into a number.
fn amount_value(amount: &str) -> Option<f64> {
    let cleaned: String = amount
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().ok()
}

/// Compares the documents of a job by their term sets.
///
/// Requires at least two documents; single-document jobs skip this stage
/// entirely.
pub fn compare(extraction: &ExtractionOutput) -> Result<DocumentComparison, AnalysisError> {
    let docs = &extraction.documents;
    if docs.len() < 2 {
        return Err(AnalysisError::NotEnoughDocuments(docs.len()));
    }

    let sets: Vec<HashSet<String>> = docs.iter().map(|d| term_set(&d.text)).collect();

    // Pairwise Jaccard, averaged over all pairs.
    let mut pair_sum = 0.0;
    let mut pair_count = 0usize;
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            pair_sum += jaccard(&sets[i], &sets[j]);
            pair_count += 1;
        }
    }
    let similarity = pair_sum / pair_count as f64;

    // Terms present in every document.
    let mut shared: Vec<String> = sets
        .iter()
        .skip(1)
        .fold(sets[0].clone(), |acc, s| {
            acc.intersection(s).cloned().collect()
        })
        .into_iter()
        .collect();
    shared.sort();
    shared.truncate(MAX_SHARED_TERMS);

    // Terms unique to a single document.
    let mut distinctive = Vec::new();
    for (i, doc) in docs.iter().enumerate() {
        let mut unique: Vec<String> = sets[i]
            .iter()
            .filter(|t| {
                sets.iter()
                    .enumerate()
                    .all(|(j, other)| j == i || !other.contains(*t))
            })
            .cloned()
            .collect();
        unique.sort();
        unique.truncate(MAX_DISTINCTIVE_TERMS);
        distinctive.push(DocumentTerms {
            storage_key: doc.storage_key.clone(),
            terms: unique,
        });
    }

    let values: Vec<f64> = docs
        .iter()
        .flat_map(|d| find_amounts(&d.text))
        .filter_map(|a| amount_value(&a))
        .collect();
    let amount_range = if values.is_empty() {
        None
    } else {
        Some(AmountRange {
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        })
    };

    Ok(DocumentComparison {
        document_count: docs.len(),
        similarity,
        shared_terms: shared,
        distinctive_terms: distinctive,
        amount_range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DocumentExtraction;
    use crate::job::record::DocumentType;

    fn extraction_of(texts: &[&str]) -> ExtractionOutput {
        ExtractionOutput {
            documents: texts
                .iter()
                .enumerate()
                .map(|(i, t)| DocumentExtraction {
                    storage_key: format!("doc{}", i),
                    declared_type: DocumentType::Pdf,
                    text: t.to_string(),
                    structured: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_single_document_is_rejected() {
        let result = compare(&extraction_of(&["only one document"]));
        assert!(matches!(result, Err(AnalysisError::NotEnoughDocuments(1))));
    }

    #[test]
    fn test_identical_documents_have_full_similarity() {
        let comparison = compare(&extraction_of(&[
            "supplier contract pricing",
            "supplier contract pricing",
        ]))
        .unwrap();
        assert!((comparison.similarity - 1.0).abs() < 1e-9);
        assert_eq!(
            comparison.shared_terms,
            vec!["contract", "pricing", "supplier"]
        );
    }

    #[test]
    fn test_disjoint_documents_have_zero_similarity() {
        let comparison =
            compare(&extraction_of(&["alpha beta gamma", "delta epsilon zeta"])).unwrap();
        assert_eq!(comparison.similarity, 0.0);
        assert!(comparison.shared_terms.is_empty());
    }

    #[test]
    fn test_distinctive_terms_per_document() {
        let comparison = compare(&extraction_of(&[
            "supplier contract warranty",
            "supplier contract penalty",
        ]))
        .unwrap();

        assert_eq!(comparison.distinctive_terms.len(), 2);
        assert_eq!(comparison.distinctive_terms[0].terms, vec!["warranty"]);
        assert_eq!(comparison.distinctive_terms[1].terms, vec!["penalty"]);
    }

    #[test]
    fn test_amount_range_across_documents() {
        let comparison = compare(&extraction_of(&[
            "Quote total $500.00 for parts",
            "Quote total $1,250.00 for parts",
        ]))
        .unwrap();

        let range = comparison.amount_range.unwrap();
        assert_eq!(range.min, 500.0);
        assert_eq!(range.max, 1250.0);
    }

    #[test]
    fn test_no_amounts_yields_no_range() {
        let comparison =
            compare(&extraction_of(&["no money here", "none here either"])).unwrap();
        assert!(comparison.amount_range.is_none());
    }

    #[test]
    fn test_three_documents() {
        let comparison = compare(&extraction_of(&[
            "supplier alpha pricing",
            "supplier beta pricing",
            "supplier gamma pricing",
        ]))
        .unwrap();
        assert_eq!(comparison.document_count, 3);
        assert!(comparison.shared_terms.contains(&"supplier".to_string()));
        assert!(comparison.shared_terms.contains(&"pricing".to_string()));
        assert!(comparison.similarity > 0.0 && comparison.similarity < 1.0);
    }
}
