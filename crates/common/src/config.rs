use crate::error::ConsultError;
use crate::logger;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Consultation search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database base path
    pub db_base_path: PathBuf,

    /// Record store file path
    pub store_path: PathBuf,

    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Embedding vector dimension (D)
    pub embedding_dimension: usize,

    /// Texts per embedding request in bulk operations
    pub embedding_batch_size: usize,

    /// Return zero vectors instead of calling the model
    pub offline_embeddings: bool,

    /// Pull the embedding model when it is missing from Ollama
    pub auto_pull_model: bool,

    /// Upper bound on `limit` for a single search
    pub max_search_results: usize,

    /// Server bind address
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// Allowed CORS origins
    pub cors_origins: Vec<String>,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

fn default_cors_origins() -> Vec<String> {
    [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://localhost:5174",
        "http://localhost:13000",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_base_path: PathBuf::from("./db"),
            store_path: PathBuf::from("./db/consultations.json"),
            ollama_base_url: "http://localhost:11434".to_string(),
            embedding_model: "bge-m3".to_string(),
            embedding_dimension: 1024,
            embedding_batch_size: 32,
            offline_embeddings: false,
            auto_pull_model: true,
            max_search_results: 100,
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            cors_origins: default_cors_origins(),
            log_dir: PathBuf::from("./db/log"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file.
    ///
    /// Touches no directories; call `ensure_directories` once overrides are applied.
    pub fn from_env() -> Self {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let path = |key: &str| lookup(key).map(PathBuf::from);
        let flag = |key: &str| lookup(key).map(|v| parse_bool(&v));
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<usize>().ok());

        Self {
            db_base_path: path("DB_BASE_PATH").unwrap_or(defaults.db_base_path),
            store_path: path("STORE_PATH").unwrap_or(defaults.store_path),
            ollama_base_url: lookup("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            embedding_model: lookup("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimension: number("EMBEDDING_DIMENSION")
                .unwrap_or(defaults.embedding_dimension),
            embedding_batch_size: number("EMBEDDING_BATCH_SIZE")
                .unwrap_or(defaults.embedding_batch_size),
            offline_embeddings: flag("OFFLINE_EMBEDDINGS")
                .or_else(|| flag("TESTING"))
                .unwrap_or(defaults.offline_embeddings),
            auto_pull_model: flag("AUTO_PULL_MODEL").unwrap_or(defaults.auto_pull_model),
            max_search_results: number("MAX_SEARCH_RESULTS")
                .unwrap_or(defaults.max_search_results),
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: lookup("SERVER_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.server_port),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            log_dir: path("LOG_DIR").unwrap_or(defaults.log_dir),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Ensure required directories exist, create if not
    pub fn ensure_directories(&self) -> Result<(), ConsultError> {
        let mut dirs = vec![self.db_base_path.as_path(), self.log_dir.as_path()];
        if let Some(parent) = self.store_path.parent() {
            if !parent.as_os_str().is_empty() {
                dirs.push(parent);
            }
        }

        for dir in dirs {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    ConsultError::config(format!(
                        "Failed to create directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Get server bind address (host:port)
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConsultError> {
        if self.embedding_model.trim().is_empty() {
            return Err(ConsultError::config("Embedding model name cannot be empty"));
        }

        if !self.ollama_base_url.starts_with("http://")
            && !self.ollama_base_url.starts_with("https://") {
            return Err(ConsultError::config(
                "Ollama base URL must start with http:// or https://"
            ));
        }

        if self.embedding_dimension == 0 {
            return Err(ConsultError::config("Embedding dimension must be positive"));
        }

        if self.embedding_batch_size == 0 {
            return Err(ConsultError::config("Embedding batch size must be positive"));
        }

        if self.max_search_results == 0 {
            return Err(ConsultError::config("Max search results must be positive"));
        }

        if self.server_port == 0 {
            return Err(ConsultError::config("Server port cannot be 0"));
        }

        if logger::parse_log_level(&self.log_level).is_none() {
            return Err(ConsultError::config(format!(
                "Unknown log level: {}",
                self.log_level
            )));
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.embedding_dimension, 1024);
        assert_eq!(config.embedding_batch_size, 32);
        assert!(!config.offline_embeddings);
    }

    #[test]
    fn test_server_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.server_bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = AppConfig::default();
        invalid_config.embedding_model = String::new();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.embedding_dimension = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.ollama_base_url = "localhost:11434".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.log_level = "loud".to_string();
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_directories_created_only_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let root_str = root.to_string_lossy().to_string();
        let store = root.join("store").join("consultations.json");
        let store_str = store.to_string_lossy().to_string();
        let log_str = root.join("log").to_string_lossy().to_string();

        let config = AppConfig::from_lookup(lookup_from(&[
            ("DB_BASE_PATH", root_str.as_str()),
            ("STORE_PATH", store_str.as_str()),
            ("LOG_DIR", log_str.as_str()),
        ]));
        assert!(!root.exists());

        config.ensure_directories().unwrap();
        assert!(root.join("log").is_dir());
        assert!(root.join("store").is_dir());
        assert!(!store.exists());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("EMBEDDING_DIMENSION", "768"),
            ("TESTING", "true"),
            ("SERVER_PORT", "9000"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
        ]));
        assert_eq!(config.embedding_dimension, 768);
        assert!(config.offline_embeddings);
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.embedding_model, "bge-m3");
    }

    #[test]
    fn test_from_lookup_ignores_garbage_numbers() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("EMBEDDING_BATCH_SIZE", "lots"),
            ("OFFLINE_EMBEDDINGS", "no"),
            ("TESTING", "true"),
        ]));
        assert_eq!(config.embedding_batch_size, 32);
        // explicit flag wins over the legacy TESTING switch
        assert!(!config.offline_embeddings);
    }
}
