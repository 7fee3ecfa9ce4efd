//! Text extraction: per-type extractors behind a common registry.
//!
//! Each supported document type has one [`Extractor`]. The registry is the
//! single source of truth for which declared types the pipeline accepts;
//! the orchestrator checks membership for every document before any
//! extraction work starts.

pub mod csv;
pub mod docx;
pub mod pdf;
pub mod xlsx;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::job::record::DocumentType;

pub use csv::CsvExtractor;
pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use xlsx::XlsxExtractor;

/// A table recovered from a structured document (spreadsheet sheet or CSV
/// body).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Structured elements recovered alongside the plain text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StructuredElements {
    pub tables: Vec<Table>,
}

/// Result of extracting a single document.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub text: String,
    pub structured: Option<StructuredElements>,
}

/// Per-document extraction result as recorded on the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentExtraction {
    pub storage_key: String,
    pub declared_type: DocumentType,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredElements>,
}

/// The extraction stage output: one entry per input document, in
/// submission order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutput {
    pub documents: Vec<DocumentExtraction>,
}

impl ExtractionOutput {
    /// Concatenates all document texts, in submission order.
    pub fn merged_text(&self) -> String {
        let mut merged = String::new();
        for doc in &self.documents {
            if !merged.is_empty() {
                merged.push_str("\n\n");
            }
            merged.push_str(&doc.text);
        }
        merged
    }
}

/// Extracts text (and optionally structure) from one document type.
pub trait Extractor: Send + Sync {
    fn supports(&self, declared_type: &DocumentType) -> bool;

    fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractError>;
}

/// Registry of all available extractors.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registry with the standard extractors (PDF, DOCX, XLSX, CSV).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PdfExtractor::new()));
        registry.register(Box::new(DocxExtractor::new()));
        registry.register(Box::new(XlsxExtractor::new()));
        registry.register(Box::new(CsvExtractor::new()));
        registry
    }

    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    /// Finds the extractor for a declared type, if any supports it.
    pub fn find(&self, declared_type: &DocumentType) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.supports(declared_type))
            .map(|e| e.as_ref())
    }

    pub fn supports(&self, declared_type: &DocumentType) -> bool {
        self.find(declared_type).is_some()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_standard_types() {
        let registry = ExtractorRegistry::with_defaults();
        assert!(registry.supports(&DocumentType::Pdf));
        assert!(registry.supports(&DocumentType::Docx));
        assert!(registry.supports(&DocumentType::Xlsx));
        assert!(registry.supports(&DocumentType::Csv));
    }

    #[test]
    fn test_registry_rejects_unsupported_types() {
        let registry = ExtractorRegistry::with_defaults();
        assert!(!registry.supports(&DocumentType::Image));
        assert!(!registry.supports(&DocumentType::Other("exe".to_string())));
        assert!(registry.find(&DocumentType::Image).is_none());
    }

    #[test]
    fn test_merged_text_preserves_submission_order() {
        let output = ExtractionOutput {
            documents: vec![
                DocumentExtraction {
                    storage_key: "a".to_string(),
                    declared_type: DocumentType::Pdf,
                    text: "first".to_string(),
                    structured: None,
                },
                DocumentExtraction {
                    storage_key: "b".to_string(),
                    declared_type: DocumentType::Csv,
                    text: "second".to_string(),
                    structured: None,
                },
            ],
        };
        assert_eq!(output.merged_text(), "first\n\nsecond");
    }

    #[test]
    fn test_extraction_output_serde_shape() {
        let output = ExtractionOutput {
            documents: vec![DocumentExtraction {
                storage_key: "uploads/a.csv".to_string(),
                declared_type: DocumentType::Csv,
                text: "x".to_string(),
                structured: Some(StructuredElements {
                    tables: vec![Table {
                        name: "csv".to_string(),
                        rows: vec![vec!["x".to_string()]],
                    }],
                }),
            }],
        };
        let v = serde_json::to_value(&output).unwrap();
        assert_eq!(v["documents"][0]["storageKey"], "uploads/a.csv");
        assert_eq!(v["documents"][0]["declaredType"], "csv");
        assert_eq!(v["documents"][0]["structured"]["tables"][0]["name"], "csv");
    }
}
