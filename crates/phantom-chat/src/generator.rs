//! Response generator contract.
//!
//! The provider transport is opaque: implementations turn a
//! [`GenerationRequest`] into plain text or a [`GenerationError`].

use async_trait::async_trait;
use serde::Serialize;

use phantom_core::config::GeneratorConfig;
use phantom_core::types::Attachment;

/// Errors raised by a response generator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("provider error: {0}")]
    Failed(String),
    #[error("timed out after {0}s")]
    Timeout(u64),
    #[error("provider returned an empty response")]
    EmptyResponse,
}

/// Fixed generation parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSettings {
    pub model: String,
    pub system_instruction: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationSettings {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_instruction: config.system_instruction.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

/// One call to the generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    pub settings: GenerationSettings,
}

impl GenerationRequest {
    /// Build a request. An image sent without text gets the configured
    /// image-analysis prompt.
    pub fn new(text: &str, attachment: Option<Attachment>, config: &GeneratorConfig) -> Self {
        let prompt = if text.trim().is_empty() && attachment.is_some() {
            config.image_prompt.clone()
        } else {
            text.to_string()
        };
        Self {
            prompt,
            attachment,
            settings: GenerationSettings::from_config(config),
        }
    }
}

/// Text/image-to-text generation capability.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Produce a reply for the request. A single attempt; no retries.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Offline generator that reflects the prompt back.
///
/// Used when no provider command is configured.
#[derive(Debug, Default, Clone)]
pub struct EchoGenerator;

#[async_trait]
impl ResponseGenerator for EchoGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let mut reply = format!("[offline] {}", request.prompt);
        if let Some(att) = &request.attachment {
            reply.push_str(&format!(
                " ({} attachment, {} bytes encoded)",
                att.mime_type,
                att.payload().len()
            ));
        }
        Ok(reply)
    }
}
