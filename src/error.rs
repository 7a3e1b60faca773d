use thiserror::Error;

/// Failure kinds surfaced by the generation and read paths.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request to the generation webhook timed out")]
    ExternalTimeout,

    #[error("Failed to connect to the generation webhook: {0}")]
    ExternalUnreachable(String),

    #[error("Generation webhook error: {status} - {body}")]
    ExternalStatus { status: u16, body: String },

    #[error("Invalid response format from the generation webhook: {0}")]
    ExternalInvalidShape(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GenerationError {
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::ExternalInvalidShape(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
