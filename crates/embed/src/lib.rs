//! Consultation search embedding layer
//!
//! Ollama API client, embedding backends and the gateway that owns them

mod backend;
mod client;
mod gateway;
mod model;
mod types;

pub use backend::{EmbeddingBackend, OllamaBackend};
pub use client::OllamaClient;
pub use gateway::{EmbeddingGateway, OFFLINE_MODEL_NAME};
pub use model::ModelManager;
pub use types::{model_matches, EmbedRequest, EmbedResponse, ModelTag, PullProgress, TagsResponse};
