//! Embedding gateway
//!
//! Single entry point the rest of the system uses to turn text into
//! vectors. Owns the backend, guards its one-time model load and
//! guarantees every vector it hands out has the configured dimension.

use consult_common::{AppConfig, ConsultError, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::backend::{EmbeddingBackend, OllamaBackend};

/// Model name reported when running without a backend
pub const OFFLINE_MODEL_NAME: &str = "offline";

pub struct EmbeddingGateway {
    /// `None` in offline mode
    backend: Option<Arc<dyn EmbeddingBackend>>,
    dimension: usize,
    loaded: OnceCell<()>,
}

impl EmbeddingGateway {
    /// Gateway over a live backend; the model is loaded on first use
    pub fn new(backend: Arc<dyn EmbeddingBackend>, dimension: usize) -> Self {
        Self {
            backend: Some(backend),
            dimension,
            loaded: OnceCell::new(),
        }
    }

    /// Gateway that answers every text with a zero vector of `dimension`
    pub fn offline(dimension: usize) -> Self {
        Self {
            backend: None,
            dimension,
            loaded: OnceCell::new(),
        }
    }

    /// Create gateway from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        if config.offline_embeddings {
            info!(
                "Embedding gateway running offline (dimension={})",
                config.embedding_dimension
            );
            return Ok(Self::offline(config.embedding_dimension));
        }

        let backend = OllamaBackend::from_config(config)?;
        info!(
            "Embedding gateway using {} (dimension={})",
            config.embedding_model, config.embedding_dimension
        );
        Ok(Self::new(Arc::new(backend), config.embedding_dimension))
    }

    /// Configured embedding dimension (D)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_offline(&self) -> bool {
        self.backend.is_none()
    }

    pub fn model_name(&self) -> &str {
        self.backend
            .as_ref()
            .map(|b| b.model_name())
            .unwrap_or(OFFLINE_MODEL_NAME)
    }

    /// Whether the model load has completed
    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Embed a single text
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        validate_text(text)?;

        let Some(backend) = self.ready_backend().await? else {
            return Ok(vec![0.0; self.dimension]);
        };

        let mut vectors = backend
            .embed(&[text.to_string()])
            .await
            .map_err(into_embedding_failure)?;
        self.check_vectors(&vectors, 1)?;

        vectors
            .pop()
            .ok_or_else(|| ConsultError::embedding_failed("Backend returned no embedding"))
    }

    /// Embed many texts, `batch_size` per backend call, preserving input order
    pub async fn embed_many(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        if batch_size == 0 {
            return Err(ConsultError::invalid_input("Batch size must be positive"));
        }
        for text in texts {
            validate_text(text)?;
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let Some(backend) = self.ready_backend().await? else {
            return Ok(vec![vec![0.0; self.dimension]; texts.len()]);
        };

        let mut vectors = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(batch_size).enumerate() {
            debug!("Embedding batch {} ({} texts)", i + 1, batch.len());
            let embedded = backend.embed(batch).await.map_err(into_embedding_failure)?;
            self.check_vectors(&embedded, batch.len())?;
            vectors.extend(embedded);
        }

        Ok(vectors)
    }

    /// Backend after its one-time load, or `None` when offline.
    ///
    /// Concurrent first callers wait on a single in-flight load. A failed
    /// load leaves the guard empty, so a later call tries again.
    async fn ready_backend(&self) -> Result<Option<&Arc<dyn EmbeddingBackend>>> {
        let Some(backend) = &self.backend else {
            return Ok(None);
        };

        self.loaded
            .get_or_try_init(|| async {
                backend.load().await.map_err(|e| {
                    error!("Embedding model {} failed to load: {}", backend.model_name(), e);
                    match e {
                        ConsultError::ModelUnavailable(_) => e,
                        other => ConsultError::model_unavailable(other.to_string()),
                    }
                })?;
                info!("Embedding model {} loaded", backend.model_name());
                Ok::<(), ConsultError>(())
            })
            .await?;

        Ok(Some(backend))
    }

    fn check_vectors(&self, vectors: &[Vec<f32>], expected_count: usize) -> Result<()> {
        if vectors.len() != expected_count {
            return Err(ConsultError::embedding_failed(format!(
                "Backend returned {} embeddings for {} texts",
                vectors.len(),
                expected_count
            )));
        }

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            error!(
                "Embedding dimension mismatch from {}: expected {}, got {}",
                self.model_name(),
                self.dimension,
                bad.len()
            );
            return Err(ConsultError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        Ok(())
    }
}

fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ConsultError::invalid_input("Text to embed cannot be empty"));
    }
    Ok(())
}

fn into_embedding_failure(e: ConsultError) -> ConsultError {
    match e {
        ConsultError::EmbeddingFailed(_)
        | ConsultError::ModelUnavailable(_)
        | ConsultError::InvalidInput(_) => e,
        other => ConsultError::embedding_failed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Deterministic backend: vector derived from the text bytes
    struct ScriptedBackend {
        dimension: usize,
        loads: AtomicUsize,
        fail_loads: AtomicUsize,
        batches: Mutex<Vec<usize>>,
    }

    impl ScriptedBackend {
        fn new(dimension: usize) -> Self {
            Self {
                dimension,
                loads: AtomicUsize::new(0),
                fail_loads: AtomicUsize::new(0),
                batches: Mutex::new(Vec::new()),
            }
        }

        fn failing_first(dimension: usize, failures: usize) -> Self {
            let backend = Self::new(dimension);
            backend.fail_loads.store(failures, Ordering::SeqCst);
            backend
        }

        fn vector_for(&self, text: &str) -> Vec<f32> {
            let mut v = vec![0.0; self.dimension];
            for (i, b) in text.bytes().enumerate() {
                v[i % self.dimension] += b as f32;
            }
            v
        }
    }

    #[async_trait]
    impl EmbeddingBackend for ScriptedBackend {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn load(&self) -> Result<()> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let remaining = self.fail_loads.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_loads.store(remaining - 1, Ordering::SeqCst);
                return Err(ConsultError::network("connection refused"));
            }
            Ok(())
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batches.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|t| self.vector_for(t)).collect())
        }
    }

    /// Backend that answers with the wrong dimension
    struct ShortBackend;

    #[async_trait]
    impl EmbeddingBackend for ShortBackend {
        fn model_name(&self) -> &str {
            "short"
        }

        async fn load(&self) -> Result<()> {
            Ok(())
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 2.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_offline_returns_zero_vectors() {
        let gateway = EmbeddingGateway::offline(1024);
        let v = gateway.embed_one("학부모 상담").await.unwrap();
        assert_eq!(v.len(), 1024);
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(gateway.model_name(), OFFLINE_MODEL_NAME);

        let many = gateway
            .embed_many(&["a".to_string(), "b".to_string()], 1)
            .await
            .unwrap();
        assert_eq!(many.len(), 2);
        assert!(many.iter().all(|v| v.len() == 1024));
    }

    #[tokio::test]
    async fn test_empty_text_is_invalid_input() {
        let backend = Arc::new(ScriptedBackend::new(4));
        let gateway = EmbeddingGateway::new(backend.clone(), 4);

        let err = gateway.embed_one("   ").await.unwrap_err();
        assert!(matches!(err, ConsultError::InvalidInput(_)));

        let err = gateway
            .embed_many(&["ok".to_string(), "".to_string()], 8)
            .await
            .unwrap_err();
        assert!(matches!(err, ConsultError::InvalidInput(_)));

        // rejected before the model is touched
        assert_eq!(backend.loads.load(Ordering::SeqCst), 0);
        assert!(backend.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_loads_once_under_concurrency() {
        let backend = Arc::new(ScriptedBackend::new(4));
        let gateway = Arc::new(EmbeddingGateway::new(backend.clone(), 4));

        let mut handles = Vec::new();
        for i in 0..8 {
            let gateway = gateway.clone();
            handles.push(tokio::spawn(async move {
                gateway.embed_one(&format!("text {}", i)).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().len(), 4);
        }

        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
        assert!(gateway.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_is_model_unavailable_and_retried() {
        let backend = Arc::new(ScriptedBackend::failing_first(4, 1));
        let gateway = EmbeddingGateway::new(backend.clone(), 4);

        let err = gateway.embed_one("first").await.unwrap_err();
        assert!(matches!(err, ConsultError::ModelUnavailable(_)));
        assert!(!gateway.is_loaded());

        assert!(gateway.embed_one("second").await.is_ok());
        assert_eq!(backend.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batching_matches_single_calls() {
        let backend = Arc::new(ScriptedBackend::new(3));
        let gateway = EmbeddingGateway::new(backend.clone(), 3);
        let texts: Vec<String> = ["alpha", "beta", "gamma", "delta", "epsilon"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let batched = gateway.embed_many(&texts, 2).await.unwrap();
        assert_eq!(*backend.batches.lock().unwrap(), vec![2, 2, 1]);

        for (text, vector) in texts.iter().zip(&batched) {
            assert_eq!(&gateway.embed_one(text).await.unwrap(), vector);
        }
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let gateway = EmbeddingGateway::offline(3);
        let err = gateway.embed_many(&["a".to_string()], 0).await.unwrap_err();
        assert!(matches!(err, ConsultError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_reported() {
        let gateway = EmbeddingGateway::new(Arc::new(ShortBackend), 1024);
        let err = gateway.embed_one("hello").await.unwrap_err();
        assert!(matches!(
            err,
            ConsultError::DimensionMismatch { expected: 1024, actual: 2 }
        ));
    }

    #[test]
    fn test_from_config_offline() {
        let config = AppConfig {
            offline_embeddings: true,
            embedding_dimension: 8,
            ..AppConfig::default()
        };
        let gateway = EmbeddingGateway::from_config(&config).unwrap();
        assert!(gateway.is_offline());
        assert_eq!(gateway.dimension(), 8);
    }
}
