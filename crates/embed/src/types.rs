use serde::{Deserialize, Serialize};

/// Ollama embed request (`POST /api/embed`)
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest {
    /// Model name (e.g., "bge-m3")
    pub model: String,

    /// Texts to embed, answered in the same order
    pub input: Vec<String>,

    /// Truncate inputs that exceed the model context instead of failing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncate: Option<bool>,
}

/// Ollama embed response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    /// Model name
    #[serde(default)]
    pub model: String,

    /// One vector per input text
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

/// Ollama local model listing (`GET /api/tags`)
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

/// One locally available model
#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    /// Model name including tag (e.g., "bge-m3:latest")
    pub name: String,

    /// Size on disk in bytes
    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub digest: String,
}

/// Ollama pull request (`POST /api/pull`)
#[derive(Debug, Clone, Serialize)]
pub struct PullRequest {
    pub model: String,
    pub stream: bool,
}

/// One NDJSON line of pull progress
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullProgress {
    /// Human readable status ("pulling manifest", "success", ...)
    #[serde(default)]
    pub status: String,

    /// Layer digest being downloaded
    #[serde(default)]
    pub digest: Option<String>,

    /// Total bytes of the current layer
    #[serde(default)]
    pub total: Option<u64>,

    /// Bytes downloaded so far for the current layer
    #[serde(default)]
    pub completed: Option<u64>,

    /// Error reported mid-stream
    #[serde(default)]
    pub error: Option<String>,
}

impl PullProgress {
    /// Whether this line marks a finished pull
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Whether a locally installed model name satisfies a requested one.
///
/// Ollama reports names with an explicit tag, so an untagged request
/// matches the `:latest` tag.
pub fn model_matches(requested: &str, installed: &str) -> bool {
    if requested == installed {
        return true;
    }
    !requested.contains(':') && installed == format!("{}:latest", requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_matches() {
        assert!(model_matches("bge-m3", "bge-m3:latest"));
        assert!(model_matches("bge-m3:567m", "bge-m3:567m"));
        assert!(!model_matches("bge-m3:567m", "bge-m3:latest"));
        assert!(!model_matches("bge", "bge-m3:latest"));
    }

    #[test]
    fn test_pull_progress_parse() {
        let line = r#"{"status":"pulling abc","digest":"sha256:abc","total":100,"completed":40}"#;
        let progress: PullProgress = serde_json::from_str(line).unwrap();
        assert_eq!(progress.total, Some(100));
        assert_eq!(progress.completed, Some(40));
        assert!(!progress.is_success());

        let done: PullProgress = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert!(done.is_success());
    }
}
