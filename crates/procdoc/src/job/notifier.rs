//! Status notifier: the single write path for job state.
//!
//! Every status change goes through here so the transition rules hold in
//! one place: transitions only move forward, terminal jobs freeze, and
//! every accepted write lands in the store, the database and the event
//! stream together.

use std::sync::Arc;

use chrono::Utc;

use super::events::{StatusBroadcaster, StatusEvent};
use super::record::{ErrorKind, JobFailure, JobStatus, StageOutput};
use super::store::JobStore;

/// Coordinates job-state writes across the store and the broadcaster.
#[derive(Clone)]
pub struct StatusNotifier {
    store: Arc<JobStore>,
    events: StatusBroadcaster,
}

impl StatusNotifier {
    pub fn new(store: Arc<JobStore>, events: StatusBroadcaster) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Records a status/progress checkpoint.
    ///
    /// Backward transitions and writes after a terminal status are dropped
    /// with a warning. Progress never decreases and stays below 100 until
    /// the job completes.
    pub fn checkpoint(&self, job_id: &str, status: JobStatus, percent: u8, message: &str) {
        let snapshot = self.store.apply(job_id, |job| {
            if job.is_finished() {
                log::warn!(
                    "Job {}: dropping checkpoint {} after terminal status {}",
                    job_id,
                    status,
                    job.status
                );
                return false;
            }
            if status.rank() < job.status.rank() {
                log::warn!(
                    "Job {}: dropping backward transition {} -> {}",
                    job_id,
                    job.status,
                    status
                );
                return false;
            }

            job.status = status;
            let capped = if status == JobStatus::Completed {
                percent.min(100)
            } else {
                percent.min(99)
            };
            job.progress_percent = job.progress_percent.max(capped);
            job.updated_at = Utc::now();
            true
        });

        if let Some(job) = snapshot {
            log::debug!(
                "Job {}: {} at {}% ({})",
                job_id,
                job.status,
                job.progress_percent,
                message
            );
            self.store.persist(&job);
            self.events.send(StatusEvent::from_job(&job, message));
        }
    }

    /// Attaches a successful stage result to the job record.
    ///
    /// Each output slot is written at most once; repeats and writes after
    /// a terminal status are dropped.
    pub fn record_output(&self, job_id: &str, output: StageOutput) {
        let name = output.name();
        let snapshot = self.store.apply(job_id, |job| {
            if job.is_finished() {
                log::warn!(
                    "Job {}: dropping {} output after terminal status",
                    job_id,
                    name
                );
                return false;
            }

            let outputs = &mut job.stage_outputs;
            let slot_taken = match &output {
                StageOutput::Extraction(_) => outputs.extraction.is_some(),
                StageOutput::Analysis(_) => outputs.analysis.is_some(),
                StageOutput::Comparison(_) => outputs.comparison.is_some(),
                StageOutput::Insights(_) => outputs.insights.is_some(),
            };
            if slot_taken {
                log::warn!("Job {}: dropping repeat {} output", job_id, name);
                return false;
            }

            match output {
                StageOutput::Extraction(v) => outputs.extraction = Some(v),
                StageOutput::Analysis(v) => outputs.analysis = Some(v),
                StageOutput::Comparison(v) => outputs.comparison = Some(v),
                StageOutput::Insights(v) => outputs.insights = Some(v),
            }
            job.updated_at = Utc::now();
            true
        });

        if let Some(job) = snapshot {
            self.store.persist(&job);
        }
    }

    /// Marks the job completed at 100%.
    pub fn complete(&self, job_id: &str) {
        self.checkpoint(job_id, JobStatus::Completed, 100, "analysis complete");
    }

    /// Marks the job failed, recording which stage broke and why.
    ///
    /// The failure payload is written once; a second failure for the same
    /// job is dropped.
    pub fn fail(&self, job_id: &str, stage: JobStatus, kind: ErrorKind, message: &str) {
        let snapshot = self.store.apply(job_id, |job| {
            if job.is_finished() {
                log::warn!(
                    "Job {}: dropping failure ({}) after terminal status {}",
                    job_id,
                    kind,
                    job.status
                );
                return false;
            }

            job.status = JobStatus::Failed;
            job.error = Some(JobFailure {
                stage,
                kind,
                message: message.to_string(),
            });
            job.updated_at = Utc::now();
            true
        });

        if let Some(job) = snapshot {
            log::warn!("Job {}: failed at {} ({}): {}", job_id, stage, kind, message);
            self.store.persist(&job);
            self.events.send(StatusEvent::from_job(&job, message));
        }
    }
}
