//! redb-backed local mirror
//!
//! Emulates the remote service's CRUD and id assignment so the store can keep
//! working after failover, and doubles as the demo data source.
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `requests` | `id` | `VacationRequest` (JSON) | Every mirrored request, in id order |
//!
//! Key order is the natural order used to break sort ties.

mod demo;

pub use demo::demo_requests;

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use shared::error::ErrorCode;
use shared::models::{VacationDraft, VacationRequest};
use thiserror::Error;

use crate::lifecycle::RequestDelta;

/// Mirrored requests: key = id, value = JSON-serialized VacationRequest
const REQUESTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("requests");

/// Mirror errors
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request not found: {0}")]
    NotFound(u64),
}

impl MirrorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::RequestNotFound,
            Self::Serialization(_) => ErrorCode::StorageCorrupted,
            _ => ErrorCode::StorageError,
        }
    }
}

pub type MirrorResult<T> = Result<T, MirrorError>;

/// Local mirror of the request list
///
/// Operations are async so callers stay mode-agnostic; each one runs in a
/// single redb transaction.
#[derive(Clone)]
pub struct LocalMirrorStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for LocalMirrorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMirrorStore").finish_non_exhaustive()
    }
}

impl LocalMirrorStore {
    /// Open or create the mirror database at the given path
    pub fn open(path: impl AsRef<Path>) -> MirrorResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory mirror (tests, demos)
    pub fn open_in_memory() -> MirrorResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> MirrorResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(REQUESTS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Bulk ==========

    /// Every record, in id order
    pub async fn load_all(&self) -> MirrorResult<Vec<VacationRequest>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REQUESTS_TABLE)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    /// Replace the whole collection
    pub async fn save_all(&self, records: &[VacationRequest]) -> MirrorResult<()> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(REQUESTS_TABLE)?;
        {
            let mut table = write_txn.open_table(REQUESTS_TABLE)?;
            for record in records {
                let bytes = serde_json::to_vec(record)?;
                table.insert(record.id, bytes.as_slice())?;
            }
        }
        write_txn.commit()?;

        tracing::debug!(count = records.len(), "Mirror replaced");
        Ok(())
    }

    pub async fn count(&self) -> MirrorResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REQUESTS_TABLE)?;
        Ok(table.len()?)
    }

    /// Seed records into an empty mirror; returns whether anything was written
    pub async fn seed_if_empty(&self, records: &[VacationRequest]) -> MirrorResult<bool> {
        if self.count().await? > 0 {
            return Ok(false);
        }
        self.save_all(records).await?;
        tracing::info!(count = records.len(), "Mirror seeded");
        Ok(true)
    }

    /// Restore the built-in demo data set
    pub async fn reset_to_default(&self) -> MirrorResult<()> {
        self.save_all(&demo_requests()).await?;
        tracing::info!("Mirror reset to demo data");
        Ok(())
    }

    // ========== Item CRUD ==========

    pub async fn get(&self, id: u64) -> MirrorResult<VacationRequest> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REQUESTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(MirrorError::NotFound(id)),
        }
    }

    /// Append a new Pending record with id `max(existing) + 1` (minimum 1)
    pub async fn create(&self, draft: VacationDraft) -> MirrorResult<VacationRequest> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(REQUESTS_TABLE)?;
            let next_id = match table.last()? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };

            let record = draft.into_request(next_id, Utc::now());
            let bytes = serde_json::to_vec(&record)?;
            table.insert(record.id, bytes.as_slice())?;
            record
        };
        write_txn.commit()?;

        tracing::debug!(id = record.id, "Mirror request created");
        Ok(record)
    }

    /// Merge a transition delta into an existing record
    pub async fn update(&self, id: u64, delta: &RequestDelta) -> MirrorResult<VacationRequest> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(REQUESTS_TABLE)?;
            let bytes = match table.get(id)? {
                Some(value) => value.value().to_vec(),
                None => return Err(MirrorError::NotFound(id)),
            };

            let mut record: VacationRequest = serde_json::from_slice(&bytes)?;
            delta.apply_to(&mut record);
            record.modified_at = Utc::now();

            let bytes = serde_json::to_vec(&record)?;
            table.insert(id, bytes.as_slice())?;
            record
        };
        write_txn.commit()?;

        tracing::debug!(id, state = %record.state, "Mirror request updated");
        Ok(record)
    }

    pub async fn delete(&self, id: u64) -> MirrorResult<()> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(REQUESTS_TABLE)?;
            table.remove(id)?.is_some()
        };

        if !removed {
            write_txn.abort()?;
            return Err(MirrorError::NotFound(id));
        }
        write_txn.commit()?;

        tracing::debug!(id, "Mirror request deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{self, Transition};
    use crate::permissions::Identity;
    use chrono::NaiveDate;
    use shared::models::{Employee, RequestState};
    use tempfile::TempDir;

    fn draft(name: &str) -> VacationDraft {
        VacationDraft::new(
            Employee::new(77, name, "someone@example.com"),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 4).unwrap(),
            4,
        )
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let mirror = LocalMirrorStore::open_in_memory().unwrap();

        let first = mirror.create(draft("A")).await.unwrap();
        let second = mirror.create(draft("B")).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.state, RequestState::Pending);
        assert!(second.decision.is_none());

        mirror.delete(1).await.unwrap();
        let third = mirror.create(draft("C")).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_create_after_seed_continues_from_max() {
        let mirror = LocalMirrorStore::open_in_memory().unwrap();
        assert!(mirror.seed_if_empty(&demo_requests()).await.unwrap());
        assert!(!mirror.seed_if_empty(&demo_requests()).await.unwrap());

        let created = mirror.create(draft("New")).await.unwrap();
        assert_eq!(created.id, 6);
        assert_eq!(mirror.count().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let mirror = LocalMirrorStore::open_in_memory().unwrap();
        assert!(matches!(mirror.get(9).await, Err(MirrorError::NotFound(9))));
        assert!(matches!(mirror.delete(9).await, Err(MirrorError::NotFound(9))));
    }

    #[tokio::test]
    async fn test_update_merges_delta_and_refreshes_modified() {
        let mirror = LocalMirrorStore::open_in_memory().unwrap();
        let created = mirror.create(draft("Joana")).await.unwrap();

        let approver = Identity::new(Employee::new(1, "Ana Admin", "ana@example.com")).site_admin();
        let delta = lifecycle::apply(&created, &Transition::approve(approver, None), Utc::now()).unwrap();
        let updated = mirror.update(created.id, &delta).await.unwrap();

        assert_eq!(updated.state, RequestState::Approved);
        assert_eq!(updated.last_modified_by.title, "Ana Admin");
        assert!(updated.modified_at >= created.modified_at);
        assert_eq!(updated.requested_at, created.requested_at);
        assert_eq!(mirror.get(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_save_all_replaces_everything() {
        let mirror = LocalMirrorStore::open_in_memory().unwrap();
        mirror.reset_to_default().await.unwrap();
        assert_eq!(mirror.count().await.unwrap(), 5);

        let mut records = mirror.load_all().await.unwrap();
        records.truncate(2);
        mirror.save_all(&records).await.unwrap();

        let ids: Vec<u64> = mirror.load_all().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_file_backed_mirror_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("mirror.redb");

        {
            let mirror = LocalMirrorStore::open(&path).unwrap();
            mirror.create(draft("Persisted")).await.unwrap();
        }

        let reopened = LocalMirrorStore::open(&path).unwrap();
        let records = reopened.load_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Vacation request - Persisted");
    }
}
