use consult_common::{AppConfig, ConsultError, Result};
use consult_embed::EmbeddingGateway;
use std::sync::Arc;
use tracing::{debug, info};

use crate::ranker::{ExactRanker, SimilarityRanker};
use crate::store::{JsonRecordStore, RecordStore};
use crate::types::{IndexStats, PageInfo, Record, SearchOutcome, SearchParams};

/// Retrieval service: embeds text, stores records and answers searches
pub struct RetrievalService {
    store: Arc<dyn RecordStore>,
    gateway: Arc<EmbeddingGateway>,
    ranker: Arc<dyn SimilarityRanker>,
    batch_size: usize,
    max_search_results: usize,
}

impl RetrievalService {
    /// Create new retrieval service with the exact full-scan ranker
    pub fn new(store: Arc<dyn RecordStore>, gateway: Arc<EmbeddingGateway>) -> Self {
        Self {
            store,
            gateway,
            ranker: Arc::new(ExactRanker),
            batch_size: 32,
            max_search_results: 100,
        }
    }

    /// Create service from configuration: JSON store at `store_path` and a
    /// gateway that loads its model on first use
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store = JsonRecordStore::open(&config.store_path).await?;
        let gateway = EmbeddingGateway::from_config(config)?;

        info!(
            "Retrieval service initialized - model={}, dimension={}",
            gateway.model_name(),
            gateway.dimension()
        );

        Ok(Self::new(Arc::new(store), Arc::new(gateway))
            .with_batch_size(config.embedding_batch_size)
            .with_max_search_results(config.max_search_results))
    }

    /// Swap the ranking strategy
    pub fn with_ranker(mut self, ranker: Arc<dyn SimilarityRanker>) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_search_results(mut self, max_search_results: usize) -> Self {
        self.max_search_results = max_search_results.max(1);
        self
    }

    pub fn gateway(&self) -> &EmbeddingGateway {
        &self.gateway
    }

    /// Embed and store a new record
    pub async fn create(&self, text: &str) -> Result<Record> {
        let text = normalize_text(text)?;

        // Nothing is stored unless the embedding succeeded
        let embedding = self.gateway.embed_one(&text).await?;
        let record = self.store.insert(text, embedding).await?;

        info!("Record created: {}", record.id);
        Ok(record)
    }

    /// Embed and store many records, batching the embedding calls.
    /// The records are written in one store write.
    pub async fn create_many(&self, texts: &[String]) -> Result<Vec<Record>> {
        let texts = texts
            .iter()
            .map(|t| normalize_text(t))
            .collect::<Result<Vec<_>>>()?;

        let embeddings = self.gateway.embed_many(&texts, self.batch_size).await?;
        let records = self
            .store
            .insert_many(texts.into_iter().zip(embeddings).collect())
            .await?;

        info!("Bulk created {} records", records.len());
        Ok(records)
    }

    pub async fn get(&self, id: u64) -> Result<Option<Record>> {
        self.store.get(id).await
    }

    /// Records newest first
    pub async fn list(&self, skip: usize, limit: usize) -> Result<Vec<Record>> {
        self.store.list(skip, limit).await
    }

    /// Replace a record's text and re-embed it; `None` if the id is unknown
    pub async fn update(&self, id: u64, text: &str) -> Result<Option<Record>> {
        let text = normalize_text(text)?;

        if self.store.get(id).await?.is_none() {
            debug!("Update of unknown record {}", id);
            return Ok(None);
        }

        let embedding = self.gateway.embed_one(&text).await?;
        let updated = self.store.update(id, text, embedding).await?;

        if updated.is_some() {
            info!("Record updated: {}", id);
        }
        Ok(updated)
    }

    /// Remove a record; `None` if the id is unknown
    pub async fn delete(&self, id: u64) -> Result<Option<Record>> {
        let deleted = self.store.delete(id).await?;
        if deleted.is_some() {
            info!("Record deleted: {}", id);
        }
        Ok(deleted)
    }

    /// Search records by similarity to `query`
    pub async fn search(&self, query: &str, params: SearchParams) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ConsultError::invalid_input("Query cannot be empty"));
        }
        params.validate()?;

        let mut params = params;
        if params.limit > self.max_search_results {
            debug!(
                "Search limit {} clamped to {}",
                params.limit, self.max_search_results
            );
            params.limit = self.max_search_results;
        }

        debug!(
            "Searching for: {} (threshold={}, skip={}, limit={})",
            query, params.threshold, params.skip, params.limit
        );

        let query_embedding = self.gateway.embed_one(query).await?;

        // One snapshot per search; concurrent writes are either in it or not
        let candidates = self.store.list_all().await?;
        let total_candidates = candidates.len();

        let ranked = self.ranker.rank(&query_embedding, candidates, &params)?;

        info!(
            "Search completed - {} results, {} matches (from {} candidates)",
            ranked.matches.len(),
            ranked.total_count,
            total_candidates
        );

        Ok(SearchOutcome {
            page: PageInfo::new(ranked.total_count, params.skip, params.limit),
            total: ranked.total_count,
            matches: ranked.matches,
        })
    }

    /// Re-embed records whose embedding is missing, zero or has the wrong
    /// dimension. Returns the number of records repaired.
    ///
    /// A record edited while its embedding was being computed is left alone;
    /// the edit already carries a fresh embedding.
    pub async fn reindex_missing(&self) -> Result<usize> {
        if self.gateway.is_offline() {
            info!("Offline embeddings; nothing can be reindexed");
            return Ok(0);
        }

        let dimension = self.gateway.dimension();
        let stale: Vec<Record> = self
            .store
            .list_all()
            .await?
            .into_iter()
            .filter(|r| !r.has_usable_embedding(dimension))
            .collect();

        info!("Found {} records requiring embedding", stale.len());
        if stale.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = stale.iter().map(|r| r.text.clone()).collect();
        let embeddings = self.gateway.embed_many(&texts, self.batch_size).await?;

        let mut repaired = 0;
        for (record, embedding) in stale.iter().zip(embeddings) {
            match self.store.replace_embedding(record, embedding).await? {
                Some(_) => repaired += 1,
                None => debug!("Record {} changed during re-embedding; skipped", record.id),
            }
        }

        info!("Incremental embedding completed: {} records", repaired);
        Ok(repaired)
    }

    /// Get index statistics
    pub async fn stats(&self) -> Result<IndexStats> {
        let dimension = self.gateway.dimension();
        let records = self.store.list_all().await?;
        let missing_embeddings = records
            .iter()
            .filter(|r| !r.has_usable_embedding(dimension))
            .count();

        Ok(IndexStats {
            total_records: records.len(),
            missing_embeddings,
            embedding_model: self.gateway.model_name().to_string(),
            embedding_dimension: dimension,
        })
    }
}

/// Trim and reject empty text
fn normalize_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConsultError::invalid_input("Consultation text cannot be empty"));
    }
    Ok(trimmed.to_string())
}
