//! Pipeline orchestrator: drives one job through its stages.
//!
//! Stages run strictly in order; every status write is committed before
//! the next stage starts. A stage failure is recorded exactly once and
//! ends the job; there is no automatic retry.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::info_span;

use crate::analysis::{
    analyze, compare, generate_insights, AnalysisReport, ContentAnalysis, DocumentComparison,
    InsightReport,
};
use crate::error::StorageError;
use crate::extract::{DocumentExtraction, ExtractionOutput, ExtractorRegistry};
use crate::job::record::{Job, JobStatus, StageOutput};
use crate::job::StatusNotifier;
use crate::storage::BlobStore;

use super::config::PipelineConfig;
use super::error::PipelineError;

pub struct Orchestrator {
    config: PipelineConfig,
    notifier: StatusNotifier,
    blobs: Arc<dyn BlobStore>,
    extractors: Arc<ExtractorRegistry>,
    /// Admission limit for extraction tasks across all running jobs.
    extraction_limit: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        notifier: StatusNotifier,
        blobs: Arc<dyn BlobStore>,
        extractors: Arc<ExtractorRegistry>,
    ) -> Self {
        let extraction_limit = Arc::new(Semaphore::new(config.max_concurrent_extractions.max(1)));
        Self {
            config,
            notifier,
            blobs,
            extractors,
            extraction_limit,
        }
    }

    /// Runs the job to a terminal status. Never returns an error: failures
    /// are recorded on the job record instead.
    pub async fn run(&self, job_id: &str) {
        let Some(job) = self.notifier.store().get(job_id) else {
            log::error!("Orchestrator started for unknown job {}", job_id);
            return;
        };

        self.notifier
            .checkpoint(job_id, JobStatus::Started, 0, "job picked up");

        self.notifier.checkpoint(
            job_id,
            JobStatus::Validating,
            5,
            "validating input documents",
        );
        if let Err(e) = self.step_validate(&job) {
            self.notifier
                .fail(job_id, JobStatus::Validating, e.kind(), &e.to_string());
            return;
        }
        self.notifier.checkpoint(
            job_id,
            JobStatus::Validating,
            10,
            "input documents validated",
        );

        self.notifier
            .checkpoint(job_id, JobStatus::Extracting, 15, "extracting text");
        let extraction = match self.step_extract(&job).await {
            Ok(extraction) => extraction,
            Err(e) => {
                self.notifier
                    .fail(job_id, JobStatus::Extracting, e.kind(), &e.to_string());
                return;
            }
        };
        self.notifier
            .record_output(job_id, StageOutput::Extraction(extraction.clone()));
        self.notifier
            .checkpoint(job_id, JobStatus::Extracting, 40, "text extracted");

        self.notifier
            .checkpoint(job_id, JobStatus::Analyzing, 45, "analyzing content");
        let analysis = match self.step_analyze(&extraction) {
            Ok(analysis) => analysis,
            Err(e) => {
                self.notifier
                    .fail(job_id, JobStatus::Analyzing, e.kind(), &e.to_string());
                return;
            }
        };
        self.notifier
            .record_output(job_id, StageOutput::Analysis(analysis.clone()));
        self.notifier
            .checkpoint(job_id, JobStatus::Analyzing, 60, "content analyzed");

        // The branch decision was fixed at submission; a job never
        // re-derives it from the document list mid-flight.
        let comparison = if job.is_multiple_documents {
            self.notifier
                .checkpoint(job_id, JobStatus::Comparing, 65, "comparing documents");
            match self.step_compare(&extraction) {
                Ok(comparison) => {
                    self.notifier
                        .record_output(job_id, StageOutput::Comparison(comparison.clone()));
                    self.notifier.checkpoint(
                        job_id,
                        JobStatus::Comparing,
                        75,
                        "documents compared",
                    );
                    Some(comparison)
                }
                Err(e) => {
                    self.notifier
                        .fail(job_id, JobStatus::Comparing, e.kind(), &e.to_string());
                    return;
                }
            }
        } else {
            None
        };

        self.notifier.checkpoint(
            job_id,
            JobStatus::GeneratingInsights,
            80,
            "generating insights",
        );
        let insights = self.step_insights(&analysis, comparison.as_ref());
        self.notifier
            .record_output(job_id, StageOutput::Insights(insights.clone()));
        self.notifier.checkpoint(
            job_id,
            JobStatus::GeneratingInsights,
            88,
            "insights generated",
        );

        self.notifier
            .checkpoint(job_id, JobStatus::Storing, 92, "storing results");
        match self.step_store(&job, &insights) {
            Ok(key) => {
                log::info!("Job {}: results stored at {}", job_id, key);
            }
            Err(e) => {
                self.notifier
                    .fail(job_id, JobStatus::Storing, e.kind(), &e.to_string());
                return;
            }
        }
        self.notifier
            .checkpoint(job_id, JobStatus::Storing, 97, "results stored");

        self.notifier.complete(job_id);
    }

    /// Every input blob must exist, be non-empty and fit the size limit.
    fn step_validate(&self, job: &Job) -> Result<(), PipelineError> {
        let _span = info_span!("stage.validate", job_id = %job.job_id).entered();

        for doc in &job.input_documents {
            let size = self.blobs.size(&doc.storage_key).map_err(|e| {
                PipelineError::Validation(format!(
                    "Document '{}' could not be checked: {}",
                    doc.storage_key, e
                ))
            })?;
            match size {
                None => {
                    return Err(PipelineError::Validation(format!(
                        "Document '{}' not found",
                        doc.storage_key
                    )));
                }
                Some(0) => {
                    return Err(PipelineError::Validation(format!(
                        "Document '{}' is empty",
                        doc.storage_key
                    )));
                }
                Some(bytes) if bytes > self.config.max_document_bytes => {
                    return Err(PipelineError::Validation(format!(
                        "Document '{}' is {} bytes, above the {} byte limit",
                        doc.storage_key, bytes, self.config.max_document_bytes
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Extracts every document, in parallel, all-or-nothing.
    ///
    /// Registry membership is checked for the whole document list before
    /// any extraction work starts, so an unsupported type never leaves a
    /// partial extraction output behind.
    async fn step_extract(&self, job: &Job) -> Result<ExtractionOutput, PipelineError> {
        for doc in &job.input_documents {
            if !self.extractors.supports(&doc.declared_type) {
                return Err(PipelineError::UnsupportedType(
                    doc.declared_type.to_string(),
                ));
            }
        }

        let mut handles = Vec::with_capacity(job.input_documents.len());
        for doc in job.input_documents.iter().cloned() {
            let permit = self
                .extraction_limit
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| PipelineError::Task("extraction limiter closed".to_string()))?;
            let blobs = Arc::clone(&self.blobs);
            let extractors = Arc::clone(&self.extractors);

            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let _span =
                    info_span!("stage.extract", key = %doc.storage_key, doc_type = %doc.declared_type)
                        .entered();

                let bytes = blobs.get(&doc.storage_key)?;
                let extractor = extractors.find(&doc.declared_type).ok_or_else(|| {
                    PipelineError::UnsupportedType(doc.declared_type.to_string())
                })?;
                let extraction = extractor.extract(&bytes)?;

                Ok::<_, PipelineError>(DocumentExtraction {
                    storage_key: doc.storage_key,
                    declared_type: doc.declared_type,
                    text: extraction.text,
                    structured: extraction.structured,
                })
            }));
        }

        // join_all keeps submission order for the output entries.
        let mut documents = Vec::with_capacity(handles.len());
        for result in futures_util::future::join_all(handles).await {
            let document = result.map_err(|e| PipelineError::Task(e.to_string()))??;
            documents.push(document);
        }

        Ok(ExtractionOutput { documents })
    }

    fn step_analyze(&self, extraction: &ExtractionOutput) -> Result<ContentAnalysis, PipelineError> {
        let _span = info_span!("stage.analyze").entered();
        Ok(analyze(extraction)?)
    }

    fn step_compare(
        &self,
        extraction: &ExtractionOutput,
    ) -> Result<DocumentComparison, PipelineError> {
        let _span = info_span!("stage.compare").entered();
        Ok(compare(extraction)?)
    }

    fn step_insights(
        &self,
        analysis: &ContentAnalysis,
        comparison: Option<&DocumentComparison>,
    ) -> InsightReport {
        let _span = info_span!("stage.insights").entered();
        generate_insights(analysis, comparison)
    }

    /// Serializes the final report into the blob store. Returns the
    /// storage key.
    fn step_store(&self, job: &Job, insights: &InsightReport) -> Result<String, PipelineError> {
        let _span = info_span!("stage.store", job_id = %job.job_id).entered();

        let report = AnalysisReport {
            summary: insights.summary.clone(),
            key_points: insights.key_points.clone(),
            recommendations: insights.recommendations.clone(),
            next_steps: insights.next_steps.join(" "),
            source_documents: job.input_documents.clone(),
        };

        let payload = serde_json::to_vec_pretty(&report)
            .map_err(|e| StorageError::Encode(e.to_string()))?;
        let key = format!("results/{}.json", job.job_id);
        self.blobs.put(&key, &payload)?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::record::{DocumentRef, DocumentType};
    use crate::job::{JobStore, StatusBroadcaster};
    use crate::storage::MemoryBlobStore;

    fn orchestrator_with(blobs: Arc<MemoryBlobStore>) -> (Orchestrator, Arc<JobStore>) {
        let store = Arc::new(JobStore::new());
        let notifier = StatusNotifier::new(Arc::clone(&store), StatusBroadcaster::new(64));
        let orchestrator = Orchestrator::new(
            PipelineConfig::default(),
            notifier,
            blobs,
            Arc::new(ExtractorRegistry::with_defaults()),
        );
        (orchestrator, store)
    }

    fn submit(store: &JobStore, docs: Vec<DocumentRef>) -> String {
        let job = Job::new(docs);
        let id = job.job_id.clone();
        store.insert(job);
        id
    }

    #[tokio::test]
    async fn test_single_csv_job_completes() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs
            .put("uploads/quote.csv", b"vendor,total\nAcme,1500 USD\n")
            .unwrap();
        let (orchestrator, store) = orchestrator_with(Arc::clone(&blobs));

        let id = submit(
            &store,
            vec![DocumentRef::new("uploads/quote.csv", DocumentType::Csv)],
        );
        orchestrator.run(&id).await;

        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percent, 100);
        assert!(job.error.is_none());
        assert!(job.stage_outputs.extraction.is_some());
        assert!(job.stage_outputs.analysis.is_some());
        assert!(job.stage_outputs.comparison.is_none());
        assert!(job.stage_outputs.insights.is_some());

        // The report landed in the blob store with the documented shape:
        // full document refs and a prose nextSteps field.
        let report = blobs.get(&format!("results/{}.json", id)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&report).unwrap();
        assert!(!value["summary"].as_str().unwrap().is_empty());
        assert!(!value["keyPoints"].as_array().unwrap().is_empty());
        assert!(value["nextSteps"].is_string());
        assert!(!value["nextSteps"].as_str().unwrap().is_empty());
        assert_eq!(value["sourceDocuments"][0]["storageKey"], "uploads/quote.csv");
        assert_eq!(value["sourceDocuments"][0]["declaredType"], "csv");
    }

    #[tokio::test]
    async fn test_two_documents_run_comparison() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs
            .put("a.csv", b"vendor,total\nAcme,500 USD\n")
            .unwrap();
        blobs
            .put("b.csv", b"vendor,total\nGlobex,900 USD\n")
            .unwrap();
        let (orchestrator, store) = orchestrator_with(blobs);

        let id = submit(
            &store,
            vec![
                DocumentRef::new("a.csv", DocumentType::Csv),
                DocumentRef::new("b.csv", DocumentType::Csv),
            ],
        );
        orchestrator.run(&id).await;

        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        let comparison = job.stage_outputs.comparison.unwrap();
        assert_eq!(comparison.document_count, 2);
        // Extraction entries keep submission order.
        let extraction = job.stage_outputs.extraction.unwrap();
        assert_eq!(extraction.documents[0].storage_key, "a.csv");
        assert_eq!(extraction.documents[1].storage_key, "b.csv");
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_before_extracting_anything() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs
            .put("good.csv", b"vendor,total\nAcme,500\n")
            .unwrap();
        blobs.put("bad.exe", b"MZ\x90\x00").unwrap();
        let (orchestrator, store) = orchestrator_with(blobs);

        let id = submit(
            &store,
            vec![
                DocumentRef::new("good.csv", DocumentType::Csv),
                DocumentRef::new("bad.exe", DocumentType::Other("exe".to_string())),
            ],
        );
        orchestrator.run(&id).await;

        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        let failure = job.error.unwrap();
        assert_eq!(failure.stage, JobStatus::Extracting);
        assert_eq!(
            failure.kind,
            crate::job::record::ErrorKind::UnsupportedFileType
        );
        assert!(failure.message.contains("exe"));
        // No partial extraction output.
        assert!(job.stage_outputs.extraction.is_none());
        assert!(job.stage_outputs.analysis.is_none());
    }

    #[tokio::test]
    async fn test_missing_blob_fails_validation() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let (orchestrator, store) = orchestrator_with(blobs);

        let id = submit(
            &store,
            vec![DocumentRef::new("nowhere.pdf", DocumentType::Pdf)],
        );
        orchestrator.run(&id).await;

        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        let failure = job.error.unwrap();
        assert_eq!(failure.stage, JobStatus::Validating);
        assert_eq!(failure.kind, crate::job::record::ErrorKind::ValidationError);
        assert!(job.progress_percent < 100);
    }

    #[tokio::test]
    async fn test_oversized_blob_fails_validation() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put("big.csv", &vec![b'a'; 64]).unwrap();
        let store = Arc::new(JobStore::new());
        let notifier = StatusNotifier::new(Arc::clone(&store), StatusBroadcaster::new(16));
        let config = PipelineConfig {
            max_document_bytes: 16,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(
            config,
            notifier,
            blobs,
            Arc::new(ExtractorRegistry::with_defaults()),
        );

        let id = submit(&store, vec![DocumentRef::new("big.csv", DocumentType::Csv)]);
        orchestrator.run(&id).await;

        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().message.contains("byte limit"));
    }

    #[tokio::test]
    async fn test_corrupt_document_fails_extracting() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put("ok.csv", b"a,b\n1,2\n").unwrap();
        blobs.put("broken.docx", b"this is not a zip archive").unwrap();
        let (orchestrator, store) = orchestrator_with(blobs);

        let id = submit(
            &store,
            vec![
                DocumentRef::new("ok.csv", DocumentType::Csv),
                DocumentRef::new("broken.docx", DocumentType::Docx),
            ],
        );
        orchestrator.run(&id).await;

        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        let failure = job.error.unwrap();
        assert_eq!(failure.stage, JobStatus::Extracting);
        assert_eq!(failure.kind, crate::job::record::ErrorKind::ExtractionError);
        // All-or-nothing: the good document's extraction is not recorded.
        assert!(job.stage_outputs.extraction.is_none());
        assert!(job.stage_outputs.analysis.is_none());
        assert!(job.stage_outputs.insights.is_none());
    }
}
