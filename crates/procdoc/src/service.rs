//! Service boundary: job submission and status queries.
//!
//! This is the surface a web layer would wrap: `submit` is the
//! POST-equivalent, `get_status` the GET-equivalent (`None` maps to 404),
//! `subscribe` a streaming feed of status events.

use std::sync::Arc;

use crate::db::Database;
use crate::error::SubmitError;
use crate::extract::ExtractorRegistry;
use crate::job::{DocumentRef, Job, JobStore, StatusBroadcaster, StatusEvent, StatusNotifier};
use crate::pipeline::{Orchestrator, PipelineConfig};
use crate::storage::BlobStore;

pub struct AnalysisService {
    store: Arc<JobStore>,
    events: StatusBroadcaster,
    orchestrator: Arc<Orchestrator>,
}

impl AnalysisService {
    /// Builds the service. When the config names a database path the
    /// durable job record is opened and previous jobs reloaded into the
    /// cache.
    pub fn new(config: PipelineConfig, blobs: Arc<dyn BlobStore>) -> crate::error::Result<Self> {
        let store = Arc::new(JobStore::new());
        if let Some(path) = &config.database_path {
            store.set_database(Database::open(path)?);
            store.load_from_database();
        }

        let events = StatusBroadcaster::new(config.event_capacity);
        let notifier = StatusNotifier::new(Arc::clone(&store), events.clone());
        let orchestrator = Arc::new(Orchestrator::new(
            config,
            notifier,
            blobs,
            Arc::new(ExtractorRegistry::with_defaults()),
        ));

        Ok(Self {
            store,
            events,
            orchestrator,
        })
    }

    /// Submits a new analysis job and returns its id immediately.
    ///
    /// The job is created `QUEUED` at 0% and runs on its own task; poll
    /// [`AnalysisService::get_status`] or subscribe for progress.
    pub fn submit(&self, documents: Vec<DocumentRef>) -> Result<String, SubmitError> {
        if documents.is_empty() {
            return Err(SubmitError::NoDocuments);
        }

        let job = Job::new(documents);
        let job_id = job.job_id.clone();
        log::info!(
            "Job {} submitted with {} document(s)",
            job_id,
            job.input_documents.len()
        );

        self.events.send(StatusEvent::from_job(&job, "job queued"));
        self.store.insert(job);

        let orchestrator = Arc::clone(&self.orchestrator);
        let id = job_id.clone();
        tokio::spawn(async move {
            orchestrator.run(&id).await;
        });

        Ok(job_id)
    }

    /// Snapshot of a job, including whichever stage outputs exist so far.
    /// `None` when the id is unknown.
    pub fn get_status(&self, job_id: &str) -> Option<Job> {
        self.store.get_with_fallback(job_id)
    }

    /// All known jobs, newest first.
    pub fn list_jobs(&self) -> Vec<Job> {
        self.store.get_all()
    }

    /// (active, completed, failed) counts across known jobs.
    pub fn counts(&self) -> (usize, usize, usize) {
        self.store.counts()
    }

    /// Live feed of status events. Events sent before subscribing are not
    /// replayed; poll `get_status` for the current state.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }
}
