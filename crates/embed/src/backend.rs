use async_trait::async_trait;
use consult_common::{AppConfig, Result};
use tracing::info;

use crate::client::OllamaClient;
use crate::model::ModelManager;

/// Common trait for embedding backends
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Name of the model this backend embeds with
    fn model_name(&self) -> &str;

    /// Prepare the model for use. Expensive; the gateway calls it at most
    /// once successfully.
    async fn load(&self) -> Result<()>;

    /// Embed texts, one vector per input in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embedding backend served by a local Ollama instance
pub struct OllamaBackend {
    client: OllamaClient,
    models: ModelManager,
    model: String,
}

impl OllamaBackend {
    /// Create new Ollama backend
    pub fn new(base_url: &str, model: impl Into<String>, auto_pull: bool) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(base_url)?,
            models: ModelManager::new(base_url, auto_pull)?,
            model: model.into(),
        })
    }

    /// Create backend from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.ollama_base_url,
            config.embedding_model.clone(),
            config.auto_pull_model,
        )
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn load(&self) -> Result<()> {
        info!("Loading embedding model {} from {}", self.model, self.client.base_url());
        self.models.ensure_model(&self.model).await
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed(&self.model, texts).await
    }
}
