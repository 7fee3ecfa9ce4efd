//! Job record types: the unit of work and everything it accumulates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{ContentAnalysis, DocumentComparison, InsightReport};
use crate::extract::ExtractionOutput;

/// Status of a job. Transitions only move forward through the stage order,
/// or jump to `Failed` from any non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Started,
    Validating,
    Extracting,
    Analyzing,
    Comparing,
    GeneratingInsights,
    Storing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Position in the forward stage order. `Failed` ranks above everything
    /// non-terminal so the forward-only check still admits it.
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Started => 1,
            JobStatus::Validating => 2,
            JobStatus::Extracting => 3,
            JobStatus::Analyzing => 4,
            JobStatus::Comparing => 5,
            JobStatus::GeneratingInsights => 6,
            JobStatus::Storing => 7,
            JobStatus::Completed => 8,
            JobStatus::Failed => 9,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Lowercase identifier used for database rows.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Started => "started",
            JobStatus::Validating => "validating",
            JobStatus::Extracting => "extracting",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Comparing => "comparing",
            JobStatus::GeneratingInsights => "generating_insights",
            JobStatus::Storing => "storing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parses a database status string. Unknown values fall back to `Queued`.
    pub fn parse(s: &str, job_id: &str) -> Self {
        match s {
            "queued" => JobStatus::Queued,
            "started" => JobStatus::Started,
            "validating" => JobStatus::Validating,
            "extracting" => JobStatus::Extracting,
            "analyzing" => JobStatus::Analyzing,
            "comparing" => JobStatus::Comparing,
            "generating_insights" => JobStatus::GeneratingInsights,
            "storing" => JobStatus::Storing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            other => {
                log::warn!(
                    "Unknown job status '{}' for job {}, defaulting to Queued",
                    other,
                    job_id
                );
                JobStatus::Queued
            }
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of an uploaded document. `Other` preserves whatever string
/// the client sent so unsupported types surface verbatim in diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum DocumentType {
    Pdf,
    Docx,
    Xlsx,
    Csv,
    Image,
    Other(String),
}

impl DocumentType {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Docx => "docx",
            DocumentType::Xlsx => "xlsx",
            DocumentType::Csv => "csv",
            DocumentType::Image => "image",
            DocumentType::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for DocumentType {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => DocumentType::Pdf,
            "docx" => DocumentType::Docx,
            "xlsx" => DocumentType::Xlsx,
            "csv" => DocumentType::Csv,
            "image" => DocumentType::Image,
            _ => DocumentType::Other(s),
        }
    }
}

impl From<DocumentType> for String {
    fn from(t: DocumentType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an uploaded document in blob storage. Immutable after
/// submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub storage_key: String,
    pub declared_type: DocumentType,
}

impl DocumentRef {
    pub fn new(storage_key: impl Into<String>, declared_type: DocumentType) -> Self {
        Self {
            storage_key: storage_key.into(),
            declared_type,
        }
    }
}

/// Classification of a stage failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationError,
    UnsupportedFileType,
    ExtractionError,
    AnalysisError,
    ComparisonError,
    InsightError,
    StorageError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::UnsupportedFileType => "UnsupportedFileType",
            ErrorKind::ExtractionError => "ExtractionError",
            ErrorKind::AnalysisError => "AnalysisError",
            ErrorKind::ComparisonError => "ComparisonError",
            ErrorKind::InsightError => "InsightError",
            ErrorKind::StorageError => "StorageError",
        };
        f.write_str(s)
    }
}

/// Diagnostic payload written exactly once when a job fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobFailure {
    pub stage: JobStatus,
    pub kind: ErrorKind,
    pub message: String,
}

/// Per-stage results. Each slot is written at most once (when its stage
/// succeeds) and frozen once the job reaches a terminal status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutputs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ContentAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<DocumentComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<InsightReport>,
}

/// A successful stage result, routed to its `StageOutputs` slot by the
/// notifier.
#[derive(Debug, Clone)]
pub enum StageOutput {
    Extraction(ExtractionOutput),
    Analysis(ContentAnalysis),
    Comparison(DocumentComparison),
    Insights(InsightReport),
}

impl StageOutput {
    pub fn name(&self) -> &'static str {
        match self {
            StageOutput::Extraction(_) => "extraction",
            StageOutput::Analysis(_) => "analysis",
            StageOutput::Comparison(_) => "comparison",
            StageOutput::Insights(_) => "insights",
        }
    }
}

/// One end-to-end document-analysis request and its accumulated state.
///
/// Mutated exclusively by the orchestrator (through the status notifier);
/// read-only snapshots are handed out by the status query interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub input_documents: Vec<DocumentRef>,
    /// Fixed at submission from the document count; decides the Compare
    /// branch without re-deriving it mid-job.
    pub is_multiple_documents: bool,
    #[serde(default)]
    pub stage_outputs: StageOutputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates a queued job for the given documents. The caller guarantees
    /// the list is non-empty (enforced at the submission boundary).
    pub fn new(input_documents: Vec<DocumentRef>) -> Self {
        let now = Utc::now();
        let is_multiple_documents = input_documents.len() > 1;
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            status: JobStatus::Queued,
            progress_percent: 0,
            input_documents,
            is_multiple_documents,
            stage_outputs: StageOutputs::default(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}
