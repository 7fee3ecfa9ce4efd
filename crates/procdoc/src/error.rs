use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcdocError {
    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),
}

/// Errors raised at the job submission boundary.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Job submission requires at least one input document")]
    NoDocuments,
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported document type: {0}")]
    UnsupportedType(String),

    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("Failed to read DOCX: {0}")]
    Docx(String),

    #[error("Failed to read XLSX: {0}")]
    Xlsx(String),

    #[error("Failed to parse CSV: {0}")]
    Csv(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Failed to read blob '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write blob '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Failed to encode result payload: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, ProcdocError>;
