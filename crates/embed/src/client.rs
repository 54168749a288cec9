use consult_common::{ConsultError, Result};
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::types::{EmbedRequest, EmbedResponse, PullProgress, PullRequest, TagsResponse};

/// Default request timeout for embedding calls
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: Client,
    max_retries: u32,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create new Ollama client with a custom request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("Ollama client initialized: {}", base_url);
        Ok(Self {
            base_url,
            client,
            max_retries: 3,
        })
    }

    /// Override how many attempts each embedding request gets
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate embeddings for a batch of texts (with retry logic)
    ///
    /// The returned vectors are in input order.
    pub async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);

        debug!("Generating embeddings - Model: {}, Texts: {}", model, texts.len());

        let request = EmbedRequest {
            model: model.to_string(),
            input: texts.to_vec(),
            truncate: Some(true),
        };

        let mut attempt = 1;
        loop {
            match self.try_embed(&url, &request).await {
                Ok(embeddings) => {
                    debug!(
                        "Received embeddings - Count: {}, Dimension: {}",
                        embeddings.len(),
                        embeddings.first().map(|e| e.len()).unwrap_or(0)
                    );
                    return Ok(embeddings);
                }
                Err(e) if attempt < self.max_retries => {
                    let delay = Duration::from_secs(2u64.pow(attempt - 1));
                    warn!(
                        "Embedding request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt,
                        self.max_retries,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Single attempt to generate embeddings
    async fn try_embed(&self, url: &str, request: &EmbedRequest) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ConsultError::network(format!("Failed to send embedding request: {}", e)))?
            .error_for_status()
            .map_err(|e| ConsultError::embedding_failed(format!("Ollama embedding API error: {}", e)))?;

        let result: EmbedResponse = response.json().await
            .map_err(|e| ConsultError::embedding_failed(format!("Failed to parse embedding response: {}", e)))?;

        if result.embeddings.len() != request.input.len() {
            return Err(ConsultError::embedding_failed(format!(
                "Ollama returned {} embeddings for {} inputs",
                result.embeddings.len(),
                request.input.len()
            )));
        }

        if result.embeddings.iter().any(|e| e.is_empty()) {
            return Err(ConsultError::embedding_failed("Empty embedding from Ollama"));
        }

        Ok(result.embeddings)
    }

    /// List models installed in the local Ollama instance
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ConsultError::network(format!("Failed to connect to Ollama: {}", e)))?
            .error_for_status()
            .map_err(|e| ConsultError::network(format!("Ollama tags API error: {}", e)))?;

        let tags: TagsResponse = response.json().await
            .map_err(|e| ConsultError::network(format!("Failed to parse model list: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Pull a model, reporting each progress line as it streams in
    pub async fn pull_model<F>(&self, model: &str, mut on_progress: F) -> Result<()>
    where
        F: FnMut(&PullProgress),
    {
        let url = format!("{}/api/pull", self.base_url);
        let request = PullRequest {
            model: model.to_string(),
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ConsultError::network(format!("Failed to send pull request: {}", e)))?
            .error_for_status()
            .map_err(|e| ConsultError::model_unavailable(format!("Ollama pull API error: {}", e)))?;

        // NDJSON lines may be split across chunks
        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| ConsultError::network(format!("Pull stream error: {}", e)))?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                finished |= handle_pull_line(&line, &mut on_progress)?;
            }
        }
        finished |= handle_pull_line(&buffer, &mut on_progress)?;

        if !finished {
            return Err(ConsultError::model_unavailable(format!(
                "Pull of {} ended without success",
                model
            )));
        }

        Ok(())
    }
}

/// Returns true when the line reports a completed pull
fn handle_pull_line<F>(line: &[u8], on_progress: &mut F) -> Result<bool>
where
    F: FnMut(&PullProgress),
{
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(false);
    }

    let progress: PullProgress = match serde_json::from_str(text) {
        Ok(progress) => progress,
        Err(e) => {
            debug!("Skipping unparseable pull line: {}", e);
            return Ok(false);
        }
    };

    if let Some(error) = &progress.error {
        return Err(ConsultError::model_unavailable(format!("Pull failed: {}", error)));
    }

    on_progress(&progress);
    Ok(progress.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embed_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(json!({ "model": "bge-m3", "input": ["a", "b"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "bge-m3",
                "embeddings": [[1.0, 0.0], [0.0, 1.0]]
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri()).unwrap();
        let vectors = client
            .embed("bge-m3", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_embed_count_mismatch_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[1.0, 0.0]]
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri()).unwrap().with_max_retries(1);
        let err = client
            .embed("bge-m3", &["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ConsultError::EmbeddingFailed(_)));
    }

    #[tokio::test]
    async fn test_embed_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri()).unwrap().with_max_retries(1);
        let err = client.embed("bge-m3", &["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, ConsultError::EmbeddingFailed(_)));
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "bge-m3:latest", "size": 1200, "digest": "abc" }]
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri()).unwrap();
        assert_eq!(client.list_models().await.unwrap(), vec!["bge-m3:latest"]);
    }

    #[tokio::test]
    async fn test_pull_model_streams_progress() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"status\":\"pulling manifest\"}\n",
            "{\"status\":\"pulling abc\",\"digest\":\"abc\",\"total\":10,\"completed\":5}\n",
            "{\"status\":\"success\"}\n"
        );
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri()).unwrap();
        let mut statuses = Vec::new();
        client
            .pull_model("bge-m3", |p| statuses.push(p.status.clone()))
            .await
            .unwrap();
        assert_eq!(statuses, vec!["pulling manifest", "pulling abc", "success"]);
    }

    #[tokio::test]
    async fn test_pull_model_error_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"error\":\"pull model manifest: file does not exist\"}\n"),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri()).unwrap();
        let err = client.pull_model("nope", |_| {}).await.unwrap_err();
        assert!(matches!(err, ConsultError::ModelUnavailable(_)));
    }
}
