//! Job repository — CRUD operations for the `jobs` table.
//!
//! The documents, stage-outputs and error columns hold JSON so the row
//! round-trips the full job record without a wide schema.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub status: String,
    pub progress_percent: u8,
    pub documents: String,
    pub is_multiple: bool,
    pub stage_outputs: String,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let percent: i64 = row.get("progress_percent")?;
        Ok(Self {
            id: row.get("id")?,
            status: row.get("status")?,
            progress_percent: percent.clamp(0, 100) as u8,
            documents: row.get("documents")?,
            is_multiple: row.get("is_multiple")?,
            stage_outputs: row.get("stage_outputs")?,
            error: row.get("error")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, status, progress_percent, documents, is_multiple,
             stage_outputs, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                job.id,
                job.status,
                job.progress_percent as i64,
                job.documents,
                job.is_multiple,
                job.stage_outputs,
                job.error,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Updates an existing job row. All fields except `id`, `documents` and
/// `created_at` are overwritten.
pub fn update(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET status=?2, progress_percent=?3, stage_outputs=?4,
             error=?5, updated_at=?6
             WHERE id=?1",
            params![
                job.id,
                job.status,
                job.progress_percent as i64,
                job.stage_outputs,
                job.error,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Inserts the row, or updates it when the id already exists.
pub fn upsert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    if find_by_id(db, &job.id)?.is_some() {
        update(db, job)
    } else {
        insert(db, job)
    }
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Returns the most recent rows, newest first.
pub fn list_recent(db: &Database, limit: u64) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM jobs ORDER BY created_at DESC LIMIT ?1")?;
        let rows: Vec<JobRow> = stmt
            .query_map(params![limit as i64], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_row(id: &str, status: &str) -> JobRow {
        JobRow {
            id: id.to_string(),
            status: status.to_string(),
            progress_percent: 0,
            documents: r#"[{"storageKey":"k","declaredType":"pdf"}]"#.to_string(),
            is_multiple: false,
            stage_outputs: "{}".to_string(),
            error: None,
            created_at: "2026-01-15T10:30:00+00:00".to_string(),
            updated_at: "2026-01-15T10:30:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, &test_row("j1", "queued")).unwrap();

        let row = find_by_id(&db, "j1").unwrap().unwrap();
        assert_eq!(row.status, "queued");
        assert!(!row.is_multiple);
        assert!(row.documents.contains("storageKey"));
    }

    #[test]
    fn test_find_missing_returns_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(find_by_id(&db, "nope").unwrap().is_none());
    }

    #[test]
    fn test_update_overwrites_mutable_fields() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, &test_row("j1", "queued")).unwrap();

        let mut row = test_row("j1", "completed");
        row.progress_percent = 100;
        row.updated_at = "2026-01-15T10:31:00+00:00".to_string();
        update(&db, &row).unwrap();

        let row = find_by_id(&db, "j1").unwrap().unwrap();
        assert_eq!(row.status, "completed");
        assert_eq!(row.progress_percent, 100);
    }

    #[test]
    fn test_upsert_inserts_then_updates() {
        let db = Database::open_in_memory().unwrap();
        upsert(&db, &test_row("j1", "queued")).unwrap();
        upsert(&db, &test_row("j1", "failed")).unwrap();

        let row = find_by_id(&db, "j1").unwrap().unwrap();
        assert_eq!(row.status, "failed");
    }

    #[test]
    fn test_list_recent_orders_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let mut old = test_row("old", "completed");
        old.created_at = "2026-01-01T00:00:00+00:00".to_string();
        let mut new = test_row("new", "queued");
        new.created_at = "2026-02-01T00:00:00+00:00".to_string();
        insert(&db, &old).unwrap();
        insert(&db, &new).unwrap();

        let rows = list_recent(&db, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "new");
    }
}
