use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the Phantom client.
///
/// Loaded from `~/.phantom/config.toml` by default. Every section falls back
/// to its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhantomConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
}

impl PhantomConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PhantomConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Session and orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Content of the model message seeded into every new session.
    pub welcome_message: String,
    /// Title of the session seeded at startup.
    pub default_title: String,
    /// Prefix for titles of sessions created later ("Analysis #2", ...).
    pub session_title_prefix: String,
    /// Number of characters of the first user message used as the title.
    pub title_max_chars: usize,
    /// Title used when the first user message carries only an attachment.
    pub attachment_title: String,
    /// Replies strictly shorter than this many characters are spoken aloud.
    pub speak_threshold_chars: usize,
    /// Upper bound on a single generation call, in seconds.
    pub generation_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            welcome_message: "Phantom medical intelligence online. Describe your symptoms, \
                ask about a medication, or attach a prescription image for analysis."
                .to_string(),
            default_title: "New Analysis".to_string(),
            session_title_prefix: "Analysis".to_string(),
            title_max_chars: 30,
            attachment_title: "Image Analysis".to_string(),
            speak_threshold_chars: 300,
            generation_timeout_secs: 60,
        }
    }
}

/// Response generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Provider model identifier.
    pub model: String,
    /// Persona and behavior prompt sent with every request.
    pub system_instruction: String,
    /// Prompt used when the user sends an image without text.
    pub image_prompt: String,
    /// Sampling temperature. Low values favor literal output.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
    /// External command that performs the provider call. Empty runs offline.
    pub command: String,
    /// Arguments passed to `command`.
    pub args: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            system_instruction: "You are Phantom, a precise medical information assistant. \
                Answer clearly and concisely, explain medications, dosages and warnings when \
                relevant, and always remind the user that you do not replace a professional \
                medical consultation."
                .to_string(),
            image_prompt: "Analyze this medical image/prescription. Extract the text and \
                explain the purpose, dosage, and any warnings."
                .to_string(),
            temperature: 0.4,
            max_output_tokens: 1024,
            command: String::new(),
            args: Vec::new(),
        }
    }
}

/// Speech recognition and synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// BCP 47 language tag for recognition.
    pub language: String,
    /// Substring of the preferred synthesis voice name.
    pub preferred_voice: String,
    /// Speech rate multiplier.
    pub rate: f32,
    /// Pitch multiplier.
    pub pitch: f32,
    /// Allow speech-to-text input.
    pub recognition_enabled: bool,
    /// Allow text-to-speech output.
    pub synthesis_enabled: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            preferred_voice: "Google US English".to_string(),
            rate: 1.1,
            pitch: 0.9,
            recognition_enabled: true,
            synthesis_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhantomError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = PhantomConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.chat.title_max_chars, 30);
        assert_eq!(config.chat.speak_threshold_chars, 300);
        assert_eq!(config.chat.attachment_title, "Image Analysis");
        assert_eq!(config.generator.max_output_tokens, 1024);
        assert!((config.generator.temperature - 0.4).abs() < f32::EPSILON);
        assert!(config.generator.command.is_empty());
        assert_eq!(config.voice.language, "en-US");
        assert_eq!(config.voice.preferred_voice, "Google US English");
    }

    #[test]
    fn test_load_partial_config() {
        let content = r#"
[general]
log_level = "debug"

[chat]
speak_threshold_chars = 120

[generator]
command = "phantom-gemini"
args = ["--stream", "false"]

[voice]
synthesis_enabled = false
"#;
        let file = create_temp_config(content);
        let config = PhantomConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.chat.speak_threshold_chars, 120);
        // Unset fields in a present section keep their defaults.
        assert_eq!(config.chat.title_max_chars, 30);
        assert_eq!(config.generator.command, "phantom-gemini");
        assert_eq!(config.generator.args, vec!["--stream", "false"]);
        assert_eq!(config.generator.model, "gemini-2.5-flash");
        assert!(!config.voice.synthesis_enabled);
        assert!(config.voice.recognition_enabled);
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = PhantomConfig::load(file.path()).unwrap();
        assert_eq!(config.chat.default_title, "New Analysis");
        assert_eq!(config.chat.generation_timeout_secs, 60);
        assert!((config.voice.rate - 1.1).abs() < f32::EPSILON);
        assert!((config.voice.pitch - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = PhantomConfig::load(file.path());
        assert!(matches!(result, Err(PhantomError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = PhantomConfig::load_or_default(Path::new("/nonexistent/phantom.toml"));
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_config_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("dir").join("config.toml");

        let mut config = PhantomConfig::default();
        config.chat.session_title_prefix = "Consult".to_string();
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = PhantomConfig::load(&path).unwrap();
        assert_eq!(reloaded.chat.session_title_prefix, "Consult");
        assert_eq!(reloaded.voice.preferred_voice, "Google US English");
    }
}
