//! Platform speech capabilities and the provider that records their presence.

use std::sync::Arc;

use phantom_core::config::VoiceConfig;
use phantom_core::error::PhantomError;

// =============================================================================
// Value types
// =============================================================================

/// Settings handed to the recognizer when a session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionSettings {
    /// BCP 47 language tag.
    pub language: String,
    /// Keep listening after the first utterance. Always `false` here.
    pub continuous: bool,
    /// Deliver partial transcripts. Always `false` here.
    pub interim_results: bool,
}

impl RecognitionSettings {
    /// Single-utterance, final-results-only settings for the given language.
    pub fn single_utterance(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            continuous: false,
            interim_results: false,
        }
    }
}

/// One entry of the platform's synthesis voice catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    pub language: String,
}

impl VoiceInfo {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
        }
    }
}

/// A synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` lets the platform pick its default voice.
    pub voice: Option<VoiceInfo>,
    pub rate: f32,
    pub pitch: f32,
}

// =============================================================================
// Traits
// =============================================================================

/// Platform speech-to-text session.
///
/// The platform delivers results asynchronously by calling
/// [`crate::VoiceAdapter::handle_recognition`].
pub trait SpeechRecognizer: Send + Sync {
    /// Begin capturing one utterance.
    fn start(&self, settings: &RecognitionSettings) -> Result<(), PhantomError>;

    /// Stop capturing. The platform may still deliver an end event.
    fn stop(&self);
}

/// Platform text-to-speech queue.
pub trait SpeechSynthesizer: Send + Sync {
    /// The voices the platform currently offers.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Queue an utterance for playback.
    fn speak(&self, utterance: Utterance);

    /// Stop the current utterance and drop anything queued.
    fn cancel(&self);
}

// =============================================================================
// Capability provider
// =============================================================================

/// Presence of a platform capability, decided once at startup.
pub enum Capability<T: ?Sized> {
    Available(Arc<T>),
    Unavailable,
}

impl<T: ?Sized> Clone for Capability<T> {
    fn clone(&self) -> Self {
        match self {
            Capability::Available(inner) => Capability::Available(Arc::clone(inner)),
            Capability::Unavailable => Capability::Unavailable,
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Available(_) => write!(f, "Available"),
            Capability::Unavailable => write!(f, "Unavailable"),
        }
    }
}

impl<T: ?Sized> Capability<T> {
    pub fn from_option(inner: Option<Arc<T>>) -> Self {
        match inner {
            Some(inner) => Capability::Available(inner),
            None => Capability::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        match self {
            Capability::Available(inner) => Some(inner),
            Capability::Unavailable => None,
        }
    }
}

/// The speech capabilities detected on this platform.
#[derive(Debug, Clone)]
pub struct SpeechCapability {
    pub recognition: Capability<dyn SpeechRecognizer>,
    pub synthesis: Capability<dyn SpeechSynthesizer>,
}

impl SpeechCapability {
    pub fn new(
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> Self {
        Self {
            recognition: Capability::from_option(recognizer),
            synthesis: Capability::from_option(synthesizer),
        }
    }

    /// No speech support at all.
    pub fn unavailable() -> Self {
        Self {
            recognition: Capability::Unavailable,
            synthesis: Capability::Unavailable,
        }
    }

    /// Drop the capabilities that the configuration disables.
    pub fn restricted_by(self, config: &VoiceConfig) -> Self {
        Self {
            recognition: if config.recognition_enabled {
                self.recognition
            } else {
                Capability::Unavailable
            },
            synthesis: if config.synthesis_enabled {
                self.synthesis
            } else {
                Capability::Unavailable
            },
        }
    }
}
