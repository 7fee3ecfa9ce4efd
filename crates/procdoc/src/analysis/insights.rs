//! Insight stage: turns the analysis (and optional comparison) into a
//! human-readable report.

use super::{ContentAnalysis, DocumentComparison, InsightReport};

/// Similarity above which compared documents are called near-duplicates.
const HIGH_SIMILARITY: f64 = 0.8;
/// Similarity below which compared documents are called largely unrelated.
const LOW_SIMILARITY: f64 = 0.2;

/// Builds the insight report. Always produces at least one key point.
pub fn generate_insights(
    analysis: &ContentAnalysis,
    comparison: Option<&DocumentComparison>,
) -> InsightReport {
    let mut key_points = Vec::new();
    let mut recommendations = Vec::new();
    let mut next_steps = Vec::new();

    let doc_word = if analysis.document_count == 1 {
        "document"
    } else {
        "documents"
    };
    let summary = format!(
        "Analyzed {} {} totaling {} words.",
        analysis.document_count, doc_word, analysis.word_count
    );

    if let Some(top) = analysis.key_terms.first() {
        let others: Vec<&str> = analysis
            .key_terms
            .iter()
            .skip(1)
            .take(4)
            .map(|t| t.term.as_str())
            .collect();
        if others.is_empty() {
            key_points.push(format!(
                "The dominant topic is '{}' ({} mentions).",
                top.term, top.count
            ));
        } else {
            key_points.push(format!(
                "The dominant topic is '{}' ({} mentions); other frequent terms: {}.",
                top.term,
                top.count,
                others.join(", ")
            ));
        }
    }

    if !analysis.amounts.is_empty() {
        key_points.push(format!(
            "{} monetary amounts referenced, including {}.",
            analysis.amounts.len(),
            analysis.amounts[0]
        ));
        recommendations
            .push("Verify the referenced amounts against the purchase order.".to_string());
    }

    if !analysis.dates.is_empty() {
        key_points.push(format!(
            "{} dates referenced, including {}.",
            analysis.dates.len(),
            analysis.dates[0]
        ));
        next_steps.push("Confirm the referenced dates fit the procurement timeline.".to_string());
    }

    if let Some(comparison) = comparison {
        let similarity_pct = (comparison.similarity * 100.0).round();
        key_points.push(format!(
            "The {} documents overlap at {}% term similarity.",
            comparison.document_count, similarity_pct
        ));

        if comparison.similarity >= HIGH_SIMILARITY {
            recommendations.push(
                "The documents are near-duplicates; check whether one supersedes the other."
                    .to_string(),
            );
        } else if comparison.similarity <= LOW_SIMILARITY {
            recommendations.push(
                "The documents share little content; confirm they belong to the same request."
                    .to_string(),
            );
        }

        if !comparison.shared_terms.is_empty() {
            next_steps.push(format!(
                "Review the shared topics: {}.",
                comparison.shared_terms[..comparison.shared_terms.len().min(5)].join(", ")
            ));
        }
        if let Some(range) = &comparison.amount_range {
            if range.max > range.min {
                key_points.push(format!(
                    "Quoted amounts range from {:.2} to {:.2}.",
                    range.min, range.max
                ));
                recommendations
                    .push("Reconcile the differing amounts across documents.".to_string());
            }
        }
    }

    if key_points.is_empty() {
        key_points.push(format!(
            "The {} contained {} words with no standout terms, amounts or dates.",
            doc_word, analysis.word_count
        ));
    }

    if next_steps.is_empty() {
        next_steps.push("Review the stored analysis report.".to_string());
    }

    InsightReport {
        summary,
        key_points,
        recommendations,
        next_steps,
    }
}
