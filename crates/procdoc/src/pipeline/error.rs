//! Pipeline stage errors and their classification.

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::error::{ExtractError, StorageError};
use crate::job::record::ErrorKind;

/// A stage failure. The orchestrator classifies it into an [`ErrorKind`]
/// and records it on the job exactly once.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported document type '{0}'")]
    UnsupportedType(String),

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error("Extraction task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// The error classification recorded on the failed job.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::ValidationError,
            PipelineError::UnsupportedType(_) => ErrorKind::UnsupportedFileType,
            PipelineError::Extraction(ExtractError::UnsupportedType(_)) => {
                ErrorKind::UnsupportedFileType
            }
            PipelineError::Extraction(_) | PipelineError::Task(_) => ErrorKind::ExtractionError,
            PipelineError::Analysis(AnalysisError::EmptyCorpus) => ErrorKind::AnalysisError,
            PipelineError::Analysis(AnalysisError::NotEnoughDocuments(_)) => {
                ErrorKind::ComparisonError
            }
            PipelineError::Storage(_) => ErrorKind::StorageError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            PipelineError::Validation("missing".into()).kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(
            PipelineError::UnsupportedType("exe".into()).kind(),
            ErrorKind::UnsupportedFileType
        );
        assert_eq!(
            PipelineError::Extraction(ExtractError::Pdf("bad xref".into())).kind(),
            ErrorKind::ExtractionError
        );
        assert_eq!(
            PipelineError::Analysis(AnalysisError::EmptyCorpus).kind(),
            ErrorKind::AnalysisError
        );
        assert_eq!(
            PipelineError::Analysis(AnalysisError::NotEnoughDocuments(1)).kind(),
            ErrorKind::ComparisonError
        );
        assert_eq!(
            PipelineError::Storage(StorageError::NotFound("k".into())).kind(),
            ErrorKind::StorageError
        );
    }
}
