//! Embedding model availability
//!
//! Makes sure the configured model is installed in the local Ollama
//! instance, pulling it on demand with a terminal progress bar.

use consult_common::{ConsultError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info};

use crate::client::OllamaClient;
use crate::types::model_matches;

/// Pulls can take a long time for large models
const PULL_TIMEOUT: Duration = Duration::from_secs(3600);

/// Model Manager
pub struct ModelManager {
    client: OllamaClient,
    auto_pull: bool,
}

impl ModelManager {
    /// Create new model manager
    pub fn new(base_url: &str, auto_pull: bool) -> Result<Self> {
        let client = OllamaClient::with_timeout(base_url, PULL_TIMEOUT)?;
        Ok(Self { client, auto_pull })
    }

    /// Whether the model is installed locally
    pub async fn is_installed(&self, model: &str) -> Result<bool> {
        let installed = self.client.list_models().await?;
        debug!("Installed Ollama models: {:?}", installed);
        Ok(installed.iter().any(|name| model_matches(model, name)))
    }

    /// Ensure the embedding model exists, pull it if missing
    pub async fn ensure_model(&self, model: &str) -> Result<()> {
        let installed = self.is_installed(model).await.map_err(|e| {
            ConsultError::model_unavailable(format!("Cannot reach Ollama: {}", e))
        })?;

        if installed {
            info!("Embedding model available: {}", model);
            return Ok(());
        }

        if !self.auto_pull {
            return Err(ConsultError::model_unavailable(format!(
                "Model {} is not installed and auto pull is disabled",
                model
            )));
        }

        info!("Model not found, pulling: {}", model);
        self.pull_with_progress(model).await?;
        info!("Pull successful: {}", model);

        Ok(())
    }

    /// Pull model with a progress bar
    async fn pull_with_progress(&self, model: &str) -> Result<()> {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .map_err(|e| ConsultError::internal(format!("Invalid progress template: {}", e)))?
            .progress_chars("#>-");
        pb.set_style(style);

        let result = self
            .client
            .pull_model(model, |progress| {
                if let Some(total) = progress.total {
                    pb.set_length(total);
                }
                if let Some(completed) = progress.completed {
                    pb.set_position(completed);
                }
                pb.set_message(progress.status.clone());
            })
            .await;

        match &result {
            Ok(()) => pb.finish_with_message("Pull complete"),
            Err(_) => pb.abandon_with_message("Pull failed"),
        }

        result
    }
}
