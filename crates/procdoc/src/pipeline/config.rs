//! Pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Deployment parameters for the pipeline. All fields have defaults so a
/// config file only needs to name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Largest accepted input document, in bytes.
    pub max_document_bytes: u64,
    /// Admission limit for concurrent extraction tasks across all jobs.
    pub max_concurrent_extractions: usize,
    /// Buffer size of the status event channel.
    pub event_capacity: usize,
    /// SQLite file for the durable job record. `None` keeps jobs in memory
    /// only.
    pub database_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: 25 * 1024 * 1024,
            max_concurrent_extractions: 4,
            event_capacity: 100,
            database_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_document_bytes, 25 * 1024 * 1024);
        assert_eq!(config.max_concurrent_extractions, 4);
        assert_eq!(config.event_capacity, 100);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"maxConcurrentExtractions": 2}"#).unwrap();
        assert_eq!(config.max_concurrent_extractions, 2);
        assert_eq!(config.max_document_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn test_database_path_deserializes() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"databasePath": "/var/lib/procdoc/jobs.db"}"#).unwrap();
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/procdoc/jobs.db"))
        );
    }
}
