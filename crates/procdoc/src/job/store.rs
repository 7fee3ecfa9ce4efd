//! Job record store: in-memory cache with optional persistent database.
//!
//! The orchestrator is the only writer (through the status notifier);
//! everything else reads snapshots.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::db::job_repo::{self, JobRow};
use crate::db::{Database, DatabaseError};

use super::record::{Job, JobStatus};

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn job_to_row(job: &Job) -> Result<JobRow, DatabaseError> {
    let documents =
        serde_json::to_string(&job.input_documents).map_err(|e| DatabaseError::Decode {
            job_id: job.job_id.clone(),
            column: "documents",
            reason: e.to_string(),
        })?;
    let stage_outputs =
        serde_json::to_string(&job.stage_outputs).map_err(|e| DatabaseError::Decode {
            job_id: job.job_id.clone(),
            column: "stage_outputs",
            reason: e.to_string(),
        })?;
    let error = match &job.error {
        Some(failure) => Some(serde_json::to_string(failure).map_err(|e| {
            DatabaseError::Decode {
                job_id: job.job_id.clone(),
                column: "error",
                reason: e.to_string(),
            }
        })?),
        None => None,
    };

    Ok(JobRow {
        id: job.job_id.clone(),
        status: job.status.as_str().to_string(),
        progress_percent: job.progress_percent,
        documents,
        is_multiple: job.is_multiple_documents,
        stage_outputs,
        error,
        created_at: format_timestamp(job.created_at),
        updated_at: format_timestamp(job.updated_at),
    })
}

fn job_from_row(row: &JobRow) -> Job {
    let input_documents = serde_json::from_str(&row.documents).unwrap_or_else(|e| {
        log::warn!("Job {}: undecodable documents column: {}", row.id, e);
        Vec::new()
    });
    let stage_outputs = serde_json::from_str(&row.stage_outputs).unwrap_or_else(|e| {
        log::warn!("Job {}: undecodable stage_outputs column: {}", row.id, e);
        Default::default()
    });
    let error = row.error.as_ref().and_then(|s| {
        serde_json::from_str(s)
            .map_err(|e| log::warn!("Job {}: undecodable error column: {}", row.id, e))
            .ok()
    });

    Job {
        job_id: row.id.clone(),
        status: JobStatus::parse(&row.status, &row.id),
        progress_percent: row.progress_percent.min(100),
        input_documents,
        is_multiple_documents: row.is_multiple,
        stage_outputs,
        error,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}

/// Job store: in-memory cache for live reads, optionally backed by SQLite
/// for durability across restarts.
pub struct JobStore {
    /// Database handle (clone is cheap — inner `Arc`).
    db: RwLock<Option<Database>>,
    /// In-memory cache for real-time reads.
    cache: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            db: RwLock::new(None),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the database connection.
    pub fn set_database(&self, db: Database) {
        let mut guard = match self.db.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store DB lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = Some(db);
    }

    /// Gets a cloned database handle if available.
    pub fn get_database(&self) -> Option<Database> {
        let guard = match self.db.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store DB lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.clone()
    }

    /// Inserts a new job into the cache and persists it.
    pub fn insert(&self, job: Job) {
        let mut cache = match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        cache.insert(job.job_id.clone(), job.clone());
        drop(cache);
        self.persist(&job);
    }

    /// Returns a snapshot of a job from the cache.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        let cache = match self.cache.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        cache.get(job_id).cloned()
    }

    /// Returns a job snapshot, checking cache then database.
    pub fn get_with_fallback(&self, job_id: &str) -> Option<Job> {
        if let Some(job) = self.get(job_id) {
            return Some(job);
        }
        if let Some(db) = self.get_database() {
            if let Ok(Some(row)) = job_repo::find_by_id(&db, job_id) {
                return Some(job_from_row(&row));
            }
        }
        None
    }

    /// Mutates a job in place and returns the updated snapshot. Returns
    /// `None` when the job is unknown or the closure declined the write.
    ///
    /// The closure returns `true` to commit (the snapshot is then
    /// persisted by the caller via [`JobStore::persist`]).
    pub(crate) fn apply<F>(&self, job_id: &str, f: F) -> Option<Job>
    where
        F: FnOnce(&mut Job) -> bool,
    {
        let mut cache = match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let job = cache.get_mut(job_id)?;
        if f(job) {
            Some(job.clone())
        } else {
            None
        }
    }

    /// Persists a job snapshot to the database, when one is attached.
    pub fn persist(&self, job: &Job) {
        let db = match self.get_database() {
            Some(db) => db,
            None => return,
        };
        let result = job_to_row(job).and_then(|row| job_repo::upsert(&db, &row));
        if let Err(e) = result {
            log::error!("Failed to persist job {}: {}", job.job_id, e);
        }
    }

    /// Returns all cached jobs, newest first.
    pub fn get_all(&self) -> Vec<Job> {
        let cache = match self.cache.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let mut result: Vec<Job> = cache.values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result
    }

    /// Returns (active, completed, failed) counts from the cache.
    pub fn counts(&self) -> (usize, usize, usize) {
        let cache = match self.cache.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let mut active = 0;
        let mut completed = 0;
        let mut failed = 0;

        for job in cache.values() {
            match job.status {
                JobStatus::Completed => completed += 1,
                JobStatus::Failed => failed += 1,
                _ => active += 1,
            }
        }

        (active, completed, failed)
    }

    /// Loads recent jobs from the database into the cache on startup.
    pub fn load_from_database(&self) {
        let db = match self.get_database() {
            Some(db) => db,
            None => return,
        };

        let rows = match job_repo::list_recent(&db, 100) {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Failed to load jobs from database: {}", e);
                return;
            }
        };

        let mut cache = match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let mut loaded = 0;
        for row in &rows {
            if !cache.contains_key(&row.id) {
                let job = job_from_row(row);
                cache.insert(job.job_id.clone(), job);
                loaded += 1;
            }
        }
        drop(cache);

        log::info!("Loaded {} jobs from database into cache", loaded);
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::record::{DocumentRef, DocumentType, ErrorKind, JobFailure};

    fn test_job() -> Job {
        Job::new(vec![DocumentRef::new("uploads/a.pdf", DocumentType::Pdf)])
    }

    #[test]
    fn test_insert_and_get() {
        let store = JobStore::new();
        let job = test_job();
        let id = job.job_id.clone();
        store.insert(job);

        let snapshot = store.get(&id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Queued);
        assert_eq!(snapshot.input_documents.len(), 1);
    }

    #[test]
    fn test_get_unknown_returns_none() {
        let store = JobStore::new();
        assert!(store.get("missing").is_none());
        assert!(store.get_with_fallback("missing").is_none());
    }

    #[test]
    fn test_apply_mutates_and_snapshots() {
        let store = JobStore::new();
        let job = test_job();
        let id = job.job_id.clone();
        store.insert(job);

        let snapshot = store
            .apply(&id, |job| {
                job.status = JobStatus::Started;
                job.progress_percent = 5;
                true
            })
            .unwrap();
        assert_eq!(snapshot.status, JobStatus::Started);
        assert_eq!(store.get(&id).unwrap().progress_percent, 5);
    }

    #[test]
    fn test_apply_declined_write_returns_none() {
        let store = JobStore::new();
        let job = test_job();
        let id = job.job_id.clone();
        store.insert(job);

        assert!(store.apply(&id, |_| false).is_none());
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Queued);
    }

    #[test]
    fn test_counts() {
        let store = JobStore::new();
        let running = test_job();
        let mut done = test_job();
        done.status = JobStatus::Completed;
        done.progress_percent = 100;
        let mut broken = test_job();
        broken.status = JobStatus::Failed;

        store.insert(running);
        store.insert(done);
        store.insert(broken);

        assert_eq!(store.counts(), (1, 1, 1));
    }

    #[test]
    fn test_persist_and_fallback() {
        let db = Database::open_in_memory().unwrap();
        let store = JobStore::new();
        store.set_database(db);

        let mut job = test_job();
        job.status = JobStatus::Failed;
        job.error = Some(JobFailure {
            stage: JobStatus::Validating,
            kind: ErrorKind::ValidationError,
            message: "missing blob".to_string(),
        });
        let id = job.job_id.clone();
        store.insert(job);

        // Fresh store over the same database: cache miss, DB hit.
        let store2 = JobStore::new();
        store2.set_database(store.get_database().unwrap());
        let loaded = store2.get_with_fallback(&id).unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        let failure = loaded.error.unwrap();
        assert_eq!(failure.kind, ErrorKind::ValidationError);
        assert_eq!(failure.stage, JobStatus::Validating);
    }

    #[test]
    fn test_load_from_database() {
        let db = Database::open_in_memory().unwrap();
        let store = JobStore::new();
        store.set_database(db.clone());

        let job = test_job();
        let id = job.job_id.clone();
        store.insert(job);

        let store2 = JobStore::new();
        store2.set_database(db);
        store2.load_from_database();

        assert!(store2.get(&id).is_some());
    }

    #[test]
    fn test_insert_survives_poisoned_cache_lock() {
        let store = std::sync::Arc::new(JobStore::new());

        let poisoner = std::sync::Arc::clone(&store);
        let handle = std::thread::spawn(move || {
            let _guard = poisoner.cache.write().unwrap();
            panic!("poison the cache lock");
        });
        assert!(handle.join().is_err());

        let job = test_job();
        let id = job.job_id.clone();
        store.insert(job);

        assert!(store.get(&id).is_some());
    }

    #[test]
    fn test_row_round_trip_preserves_documents() {
        let job = Job::new(vec![
            DocumentRef::new("a.pdf", DocumentType::Pdf),
            DocumentRef::new("b.xlsx", DocumentType::Xlsx),
        ]);
        let row = job_to_row(&job).unwrap();
        let restored = job_from_row(&row);

        assert_eq!(restored.job_id, job.job_id);
        assert_eq!(restored.input_documents, job.input_documents);
        assert!(restored.is_multiple_documents);
        assert_eq!(restored.status, JobStatus::Queued);
    }
}
