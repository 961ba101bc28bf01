//! Phantom Voice crate - speech-to-text input and text-to-speech output.
//!
//! Wraps platform speech capabilities behind the [`VoiceAdapter`], which runs a
//! single-utterance recognition state machine (Idle -> Listening -> Idle) and a
//! last-request-wins synthesis channel. Missing capabilities degrade every
//! operation to a no-op.

pub mod adapter;
pub mod capability;
pub mod mock;

pub use adapter::{select_voice, RecognitionEvent, VoiceAdapter, VoiceEvent, VoiceState};
pub use capability::{
    Capability, RecognitionSettings, SpeechCapability, SpeechRecognizer, SpeechSynthesizer,
    Utterance, VoiceInfo,
};
