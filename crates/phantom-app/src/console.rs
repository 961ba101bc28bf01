//! Terminal stand-ins for platform speech capabilities.
//!
//! The recognizer has no microphone: while listening, the next `/heard` line
//! typed at the prompt is delivered as the final transcript. The synthesizer
//! prints what it would say.

use phantom_core::error::PhantomError;
use phantom_voice::{RecognitionSettings, SpeechRecognizer, SpeechSynthesizer, Utterance, VoiceInfo};

#[derive(Debug, Default)]
pub struct ConsoleRecognizer;

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&self, settings: &RecognitionSettings) -> Result<(), PhantomError> {
        tracing::debug!(language = %settings.language, "Console recognizer started");
        println!("(listening... type `/heard <words>` to speak)");
        Ok(())
    }

    fn stop(&self) {
        tracing::debug!("Console recognizer stopped");
    }
}

#[derive(Debug)]
pub struct ConsoleSynthesizer {
    voice: VoiceInfo,
}

impl ConsoleSynthesizer {
    pub fn new(language: &str) -> Self {
        Self {
            voice: VoiceInfo::new("Console", language),
        }
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn voices(&self) -> Vec<VoiceInfo> {
        vec![self.voice.clone()]
    }

    fn speak(&self, utterance: Utterance) {
        println!("[spoken] {}", utterance.text);
    }

    fn cancel(&self) {}
}
