//! Pipeline: configuration, stage errors and the orchestrator.

pub mod config;
pub mod error;
pub mod orchestrator;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use orchestrator::Orchestrator;
