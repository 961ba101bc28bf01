//! Error types for the conversation engine.

use phantom_core::error::PhantomError;

use crate::generator::GenerationError;

/// Errors from the conversation engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("submission has neither text nor attachment")]
    EmptySubmission,
    #[error("a request is already being processed")]
    Busy,
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("could not attach image: {0}")]
    Attachment(#[from] PhantomError),
}

impl From<GenerationError> for ChatError {
    fn from(err: GenerationError) -> Self {
        ChatError::Generation(err.to_string())
    }
}
