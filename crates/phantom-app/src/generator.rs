//! Generator backed by an external provider command.
//!
//! The request is written to the command's stdin as JSON; whatever it prints
//! to stdout is the reply.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use phantom_chat::{EchoGenerator, GenerationError, GenerationRequest, ResponseGenerator};
use phantom_core::config::GeneratorConfig;

pub struct ProcessGenerator {
    program: String,
    args: Vec<String>,
}

impl ProcessGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl ResponseGenerator for ProcessGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| GenerationError::Failed(format!("failed to encode request: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerationError::Failed(format!("failed to spawn {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| GenerationError::Failed(format!("failed to write request: {e}")))?;
            // Dropping stdin signals end of input.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GenerationError::Failed(format!("failed to read reply: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                program = %self.program,
                code = ?output.status.code(),
                stderr = %stderr.trim(),
                "Provider command failed"
            );
            return Err(GenerationError::Failed(format!(
                "{} exited with code {:?}",
                self.program,
                output.status.code()
            )));
        }

        let reply = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if reply.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(reply)
    }
}

/// Pick the generator for this run: the configured provider command, or the
/// offline echo generator when none is set.
pub fn build_generator(config: &GeneratorConfig) -> Arc<dyn ResponseGenerator> {
    if config.command.trim().is_empty() {
        tracing::info!("No provider command configured, replies are offline echoes");
        Arc::new(EchoGenerator)
    } else {
        tracing::info!(command = %config.command, model = %config.model, "Using provider command");
        Arc::new(ProcessGenerator::new(config.command.clone(), config.args.clone()))
    }
}
