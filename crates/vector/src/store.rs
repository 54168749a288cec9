//! Record persistence
//!
//! `RecordStore` is the storage seam the retrieval service consumes;
//! `JsonRecordStore` keeps records in memory and optionally mirrors them
//! to a JSON file after every mutation.

use async_trait::async_trait;
use chrono::Utc;
use consult_common::{ConsultError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::types::Record;

/// Storage for consultation records and their embeddings
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store a new record with a freshly assigned id
    async fn insert(&self, text: String, embedding: Vec<f32>) -> Result<Record>;

    /// Store several records in one write; either all land or none do
    async fn insert_many(&self, entries: Vec<(String, Vec<f32>)>) -> Result<Vec<Record>>;

    async fn get(&self, id: u64) -> Result<Option<Record>>;

    /// Records ordered by creation time, newest first
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<Record>>;

    /// Snapshot of every record
    async fn list_all(&self) -> Result<Vec<Record>>;

    /// Replace text and embedding, bumping `updated_at`
    async fn update(&self, id: u64, text: String, embedding: Vec<f32>) -> Result<Option<Record>>;

    /// Replace only the embedding, and only if the record still matches
    /// `snapshot` (same text and `updated_at`). `None` when it changed or is gone.
    async fn replace_embedding(
        &self,
        snapshot: &Record,
        embedding: Vec<f32>,
    ) -> Result<Option<Record>>;

    /// Remove and return the record
    async fn delete(&self, id: u64) -> Result<Option<Record>>;

    async fn count(&self) -> Result<usize>;
}

/// On-disk document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    /// Next id to hand out; only ever grows
    next_id: u64,
    records: Vec<Record>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

pub struct JsonRecordStore {
    document: RwLock<StoreDocument>,
    file_path: Option<PathBuf>,
}

impl JsonRecordStore {
    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            document: RwLock::new(StoreDocument::default()),
            file_path: None,
        }
    }

    /// Open (or start) a store backed by `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let mut document: StoreDocument = if tokio::fs::try_exists(path).await? {
            let data = tokio::fs::read(path).await?;
            serde_json::from_slice(&data).map_err(|e| {
                ConsultError::storage(format!("Corrupt record store {}: {}", path.display(), e))
            })?
        } else {
            StoreDocument::default()
        };

        // Never hand out an id that is already present
        let max_id = document.records.iter().map(|r| r.id).max().unwrap_or(0);
        document.next_id = document.next_id.max(max_id + 1);

        info!(
            "Record store opened: {} ({} records)",
            path.display(),
            document.records.len()
        );

        Ok(Self {
            document: RwLock::new(document),
            file_path: Some(path.to_path_buf()),
        })
    }

    /// Apply a mutation to a copy, persist it, then publish it.
    ///
    /// A failed save leaves the in-memory state untouched.
    async fn mutate<T>(&self, apply: impl FnOnce(&mut StoreDocument) -> T) -> Result<T> {
        let mut document = self.document.write().await;
        let mut next = document.clone();
        let out = apply(&mut next);
        self.save(&next).await?;
        *document = next;
        Ok(out)
    }

    async fn save(&self, document: &StoreDocument) -> Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };

        let data = serde_json::to_vec(document)?;
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, data).await.map_err(|e| {
            ConsultError::storage(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;
        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            ConsultError::storage(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        debug!("Record store saved: {} records", document.records.len());
        Ok(())
    }
}

impl StoreDocument {
    fn push(&mut self, text: String, embedding: Vec<f32>) -> Record {
        let now = Utc::now();
        let record = Record {
            id: self.next_id,
            text,
            embedding,
            created_at: now,
            updated_at: now,
        };
        self.next_id += 1;
        self.records.push(record.clone());
        record
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn insert(&self, text: String, embedding: Vec<f32>) -> Result<Record> {
        self.mutate(|doc| doc.push(text, embedding)).await
    }

    async fn insert_many(&self, entries: Vec<(String, Vec<f32>)>) -> Result<Vec<Record>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        self.mutate(|doc| {
            entries
                .into_iter()
                .map(|(text, embedding)| doc.push(text, embedding))
                .collect()
        })
        .await
    }

    async fn get(&self, id: u64) -> Result<Option<Record>> {
        let document = self.document.read().await;
        Ok(document.records.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<Record>> {
        let document = self.document.read().await;
        let mut records: Vec<&Record> = document.records.iter().collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<Record>> {
        Ok(self.document.read().await.records.clone())
    }

    async fn update(&self, id: u64, text: String, embedding: Vec<f32>) -> Result<Option<Record>> {
        // Skip the save entirely when there is nothing to change
        if self.get(id).await?.is_none() {
            return Ok(None);
        }

        self.mutate(|doc| {
            let record = doc.records.iter_mut().find(|r| r.id == id)?;
            record.text = text;
            record.embedding = embedding;
            record.updated_at = Utc::now().max(record.created_at);
            Some(record.clone())
        })
        .await
    }

    async fn replace_embedding(
        &self,
        snapshot: &Record,
        embedding: Vec<f32>,
    ) -> Result<Option<Record>> {
        let unchanged = |r: &Record| {
            r.id == snapshot.id && r.text == snapshot.text && r.updated_at == snapshot.updated_at
        };

        if !self.document.read().await.records.iter().any(unchanged) {
            return Ok(None);
        }

        // Checked again under the write lock; an update may have landed in between
        self.mutate(|doc| {
            let record = doc.records.iter_mut().find(|r| unchanged(&**r))?;
            record.embedding = embedding;
            record.updated_at = Utc::now().max(record.created_at);
            Some(record.clone())
        })
        .await
    }

    async fn delete(&self, id: u64) -> Result<Option<Record>> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }

        self.mutate(|doc| {
            let pos = doc.records.iter().position(|r| r.id == id)?;
            Some(doc.records.remove(pos))
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.document.read().await.records.len())
    }
}
