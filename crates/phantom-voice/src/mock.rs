//! In-memory speech capabilities for tests and headless runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use phantom_core::error::PhantomError;

use crate::capability::{
    RecognitionSettings, SpeechRecognizer, SpeechSynthesizer, Utterance, VoiceInfo,
};

/// Recognizer that records calls. Results are injected through the adapter.
#[derive(Debug, Default)]
pub struct MockRecognizer {
    starts: AtomicUsize,
    stops: AtomicUsize,
    fail_start: AtomicBool,
    last_settings: Mutex<Option<RecognitionSettings>>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `start` fail, as a platform refusing the microphone would.
    pub fn fail_on_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn last_settings(&self) -> Option<RecognitionSettings> {
        self.last_settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn start(&self, settings: &RecognitionSettings) -> Result<(), PhantomError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(PhantomError::Voice("microphone unavailable".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self
            .last_settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(settings.clone());
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Synthesizer that tracks what would currently be audible.
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    catalog: Vec<VoiceInfo>,
    spoken: Mutex<Vec<Utterance>>,
    audible: Mutex<Option<Utterance>>,
    cancels: AtomicUsize,
}

impl MockSynthesizer {
    pub fn new(catalog: Vec<VoiceInfo>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Every utterance ever queued, in order.
    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The utterance that is playing now, if any.
    pub fn audible(&self) -> Option<Utterance> {
        self.audible
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn voices(&self) -> Vec<VoiceInfo> {
        self.catalog.clone()
    }

    fn speak(&self, utterance: Utterance) {
        let mut audible = self.audible.lock().unwrap_or_else(PoisonError::into_inner);
        // A platform queue would play this after the current one; only record
        // it as audible when nothing else is.
        if audible.is_none() {
            *audible = Some(utterance.clone());
        }
        self.spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(utterance);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        *self.audible.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(text: &str) -> Utterance {
        Utterance {
            text: text.to_string(),
            voice: None,
            rate: 1.0,
            pitch: 1.0,
        }
    }

    #[test]
    fn test_mock_recognizer_counts_calls() {
        let rec = MockRecognizer::new();
        rec.start(&RecognitionSettings::single_utterance("en-US"))
            .unwrap();
        rec.stop();
        assert_eq!(rec.start_count(), 1);
        assert_eq!(rec.stop_count(), 1);
        assert_eq!(rec.last_settings().unwrap().language, "en-US");
    }

    #[test]
    fn test_mock_recognizer_failure() {
        let rec = MockRecognizer::new();
        rec.fail_on_start(true);
        let result = rec.start(&RecognitionSettings::single_utterance("en-US"));
        assert!(matches!(result, Err(PhantomError::Voice(_))));
        assert_eq!(rec.start_count(), 0);
    }

    #[test]
    fn test_mock_synthesizer_queues_behind_current() {
        let synth = MockSynthesizer::new(vec![]);
        synth.speak(utterance("first"));
        synth.speak(utterance("second"));
        assert_eq!(synth.audible().unwrap().text, "first");
        assert_eq!(synth.spoken().len(), 2);
    }

    #[test]
    fn test_mock_synthesizer_cancel_silences() {
        let synth = MockSynthesizer::new(vec![]);
        synth.speak(utterance("first"));
        synth.cancel();
        assert!(synth.audible().is_none());
        assert_eq!(synth.cancel_count(), 1);
    }
}
