use thiserror::Error;

/// Top-level error type for the Phantom system.
///
/// Subsystem crates define their own error types and implement
/// `From<PhantomError>` so that the `?` operator works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PhantomError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Attachment error: {0}")]
    Attachment(String),

    #[error("Voice error: {0}")]
    Voice(String),
}

impl From<toml::de::Error> for PhantomError {
    fn from(err: toml::de::Error) -> Self {
        PhantomError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PhantomError {
    fn from(err: toml::ser::Error) -> Self {
        PhantomError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PhantomError {
    fn from(err: serde_json::Error) -> Self {
        PhantomError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Phantom operations.
pub type Result<T> = std::result::Result<T, PhantomError>;
