/// Consultation search error types
#[derive(Debug, thiserror::Error)]
pub enum ConsultError {
    /// Empty or malformed text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Out-of-range search parameters (threshold, skip, limit)
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Embedding model could not be loaded or reached
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Embedding call failed after the model was available
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// Two vectors that must agree on length do not
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector with zero norm (no direction)
    #[error("Degenerate vector: zero norm")]
    DegenerateVector,

    /// Record store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConsultError {
    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create invalid parameters error
    pub fn invalid_parameters<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameters(msg.into())
    }

    /// Create not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create model unavailable error
    pub fn model_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create embedding failure error
    pub fn embedding_failed<S: Into<String>>(msg: S) -> Self {
        Self::EmbeddingFailed(msg.into())
    }

    /// Create storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller sent something wrong (as opposed to a server-side failure)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

// HTTP response conversion
impl ConsultError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::InvalidParameters(_) => 400,
            Self::NotFound(_) => 404,
            Self::ModelUnavailable(_) => 503,
            Self::EmbeddingFailed(_) => 500,
            Self::DimensionMismatch { .. } => 500,
            Self::DegenerateVector => 500,
            Self::Storage(_) => 500,
            Self::Config(_) => 500,
            Self::Network(_) => 503,
            Self::Internal(_) => 500,
            Self::Io(_) => 500,
            Self::Json(_) => 400,
            Self::Other(_) => 500,
        }
    }
}
