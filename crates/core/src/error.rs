//! Error types for Ripple.

use thiserror::Error;

/// Result type alias using Ripple's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Ripple.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Client Errors (surface as 4xx)
    // =========================================================================
    #[error("Missing precondition: {0}")]
    MissingPrecondition(String),

    #[error("Bad input encoding: {0}")]
    BadEncoding(String),

    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // Collaborator Errors (recovered at stage boundaries)
    // =========================================================================
    #[error("Model provider error: {0}")]
    ModelProvider(String),

    #[error("Search provider error: {0}")]
    Search(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Response decode error: {0}")]
    Decode(String),

    // =========================================================================
    // Server Errors
    // =========================================================================
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a missing precondition error.
    pub fn missing_precondition(msg: impl Into<String>) -> Self {
        Self::MissingPrecondition(msg.into())
    }

    /// Create a bad input encoding error.
    pub fn bad_encoding(msg: impl Into<String>) -> Self {
        Self::BadEncoding(msg.into())
    }

    /// Create an unknown action error.
    pub fn unknown_action(kind: impl Into<String>) -> Self {
        Self::UnknownAction(kind.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a model provider error.
    pub fn model_provider(msg: impl Into<String>) -> Self {
        Self::ModelProvider(msg.into())
    }

    /// Create a search provider error.
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    /// Create an image error.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }

    /// Create a response decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingPrecondition(_)
                | Self::BadEncoding(_)
                | Self::UnknownAction(_)
                | Self::InvalidRequest(_)
        )
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPrecondition(_) => "MISSING_PRECONDITION",
            Self::BadEncoding(_) => "BAD_INPUT_ENCODING",
            Self::UnknownAction(_) => "UNKNOWN_ACTION_TYPE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ModelProvider(_) => "MODEL_PROVIDER_ERROR",
            Self::Search(_) => "SEARCH_ERROR",
            Self::Image(_) => "IMAGE_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}
