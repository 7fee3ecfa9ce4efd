pub mod analysis;
pub mod db;
pub mod error;
pub mod extract;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod service;
pub mod storage;

pub use analysis::{AnalysisReport, ContentAnalysis, DocumentComparison, InsightReport};
pub use error::{ExtractError, ProcdocError, Result, StorageError, SubmitError};
pub use extract::{ExtractionOutput, Extractor, ExtractorRegistry};
pub use job::{
    DocumentRef, DocumentType, ErrorKind, Job, JobFailure, JobStatus, JobStore, StatusBroadcaster,
    StatusEvent, StatusNotifier,
};
pub use pipeline::{Orchestrator, PipelineConfig, PipelineError};
pub use service::AnalysisService;
pub use storage::{BlobStore, FsBlobStore, MemoryBlobStore};
