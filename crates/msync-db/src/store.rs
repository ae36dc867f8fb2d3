use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use msync_schemas::MatchRecord;
use uuid::Uuid;

use crate::StoreError;

/// Persistence port for match records.
///
/// `update` is a monotone merge, never a blind overwrite: state only moves
/// forward, a set remote id or finished stamp is never cleared. Both the
/// ingestion path and the sweep write through it without coordinating.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Insert a new record. `Duplicate` when the match id already exists.
    async fn create(&self, record: &MatchRecord) -> Result<Uuid, StoreError>;

    async fn update(&self, record: &MatchRecord) -> Result<Uuid, StoreError>;

    async fn get_by_match_id(&self, match_id: &str) -> Result<MatchRecord, StoreError>;

    async fn list_all(&self) -> Result<Vec<MatchRecord>, StoreError>;

    /// Record deletion is not part of the lifecycle yet.
    async fn delete(&self, _match_id: &str) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("delete match record"))
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Process-local store with the same semantics as the Postgres one.
#[derive(Debug, Default)]
pub struct MemoryMatchStore {
    rows: DashMap<String, MatchRecord>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn create(&self, record: &MatchRecord) -> Result<Uuid, StoreError> {
        match self.rows.entry(record.match_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(record.match_id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record.id)
            }
        }
    }

    async fn update(&self, record: &MatchRecord) -> Result<Uuid, StoreError> {
        let mut row = self
            .rows
            .get_mut(&record.match_id)
            .ok_or_else(|| StoreError::NotFound(record.match_id.clone()))?;
        row.absorb(record, Utc::now());
        Ok(row.id)
    }

    async fn get_by_match_id(&self, match_id: &str) -> Result<MatchRecord, StoreError> {
        self.rows
            .get(match_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound(match_id.to_string()))
    }

    async fn list_all(&self) -> Result<Vec<MatchRecord>, StoreError> {
        let mut out: Vec<MatchRecord> = self.rows.iter().map(|r| r.value().clone()).collect();
        out.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.match_id.cmp(&b.match_id))
        });
        Ok(out)
    }
}
