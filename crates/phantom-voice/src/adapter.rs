//! Voice I/O adapter.
//!
//! Owns the single recognition session and the synthesis channel. Platform
//! recognition callbacks are pushed in through [`VoiceAdapter::handle_recognition`];
//! the adapter reports each cycle to its subscriber as [`VoiceEvent`]s:
//! `Started`, at most one `Transcript`, then exactly one `Ended`.
//!
//! The platform is expected to send one `End` for every session it started.
//! Sessions the adapter closed early (stop, error, restart) are remembered
//! until that `End` arrives, so their late callbacks never touch a newer cycle.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use phantom_core::config::VoiceConfig;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::capability::{
    Capability, RecognitionSettings, SpeechCapability, SpeechRecognizer, SpeechSynthesizer,
    Utterance, VoiceInfo,
};

/// Operational state of speech recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceState {
    /// No utterance is being captured.
    Idle,
    /// Capturing one utterance.
    Listening,
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceState::Idle => write!(f, "Idle"),
            VoiceState::Listening => write!(f, "Listening"),
        }
    }
}

/// Raw callbacks from the platform recognizer.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// A transcription result. Non-final results are ignored.
    Result { transcript: String, is_final: bool },
    /// The platform reported an error. Treated as end of utterance.
    Error(String),
    /// The platform ended the session.
    End,
}

/// What the adapter reports upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Started,
    Transcript(String),
    Ended,
}

/// One `start()` worth of recognition bookkeeping.
#[derive(Debug)]
struct RecognitionCycle {
    id: u64,
    transcript_delivered: bool,
}

#[derive(Debug, Default)]
struct Recognition {
    /// Open until its `Ended` has been emitted.
    current: Option<RecognitionCycle>,
    /// Platform sessions closed here whose `End` has not arrived yet.
    pending_ends: u32,
    next_id: u64,
}

impl Recognition {
    /// Listening while the open cycle still waits for its transcript.
    fn state(&self) -> VoiceState {
        match &self.current {
            Some(cycle) if !cycle.transcript_delivered => VoiceState::Listening,
            _ => VoiceState::Idle,
        }
    }
}

/// Unifies speech-to-text input and text-to-speech output.
pub struct VoiceAdapter {
    recognition: Capability<dyn SpeechRecognizer>,
    synthesis: Capability<dyn SpeechSynthesizer>,
    settings: RecognitionSettings,
    preferred_voice: String,
    rate: f32,
    pitch: f32,
    session: Mutex<Recognition>,
    events: mpsc::UnboundedSender<VoiceEvent>,
}

impl fmt::Debug for VoiceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceAdapter")
            .field("recognition", &self.recognition)
            .field("synthesis", &self.synthesis)
            .field("state", &self.state())
            .finish()
    }
}

impl VoiceAdapter {
    /// Build the adapter and the receiving end of its event channel.
    ///
    /// Capability presence is recorded here, once.
    pub fn new(
        capability: SpeechCapability,
        config: &VoiceConfig,
    ) -> (Self, mpsc::UnboundedReceiver<VoiceEvent>) {
        let capability = capability.restricted_by(config);
        if !capability.recognition.is_available() {
            info!("Speech recognition unavailable; voice input disabled");
        }
        if !capability.synthesis.is_available() {
            info!("Speech synthesis unavailable; replies will not be spoken");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let adapter = Self {
            recognition: capability.recognition,
            synthesis: capability.synthesis,
            settings: RecognitionSettings::single_utterance(config.language.clone()),
            preferred_voice: config.preferred_voice.clone(),
            rate: config.rate,
            pitch: config.pitch,
            session: Mutex::new(Recognition::default()),
            events: tx,
        };
        (adapter, rx)
    }

    /// Current recognition state.
    pub fn state(&self) -> VoiceState {
        self.lock_session().state()
    }

    pub fn is_listening(&self) -> bool {
        self.state() == VoiceState::Listening
    }

    pub fn recognition_available(&self) -> bool {
        self.recognition.is_available()
    }

    pub fn synthesis_available(&self) -> bool {
        self.synthesis.is_available()
    }

    /// Begin a single-utterance recognition session.
    ///
    /// No-op when already listening or when recognition is unavailable.
    pub fn start(&self) {
        let Some(recognizer) = self.recognition.get() else {
            debug!("start() ignored: recognition unavailable");
            return;
        };

        let cycle_id = {
            let mut session = self.lock_session();
            if session.state() == VoiceState::Listening {
                debug!("start() ignored: already listening");
                return;
            }
            // The previous cycle delivered its transcript but the platform
            // has not sent its end event yet.
            if let Some(stale) = session.current.take() {
                debug!(cycle = stale.id, "Closing stale recognition cycle");
                session.pending_ends += 1;
                self.emit(VoiceEvent::Ended);
            }
            session.next_id += 1;
            let id = session.next_id;
            session.current = Some(RecognitionCycle {
                id,
                transcript_delivered: false,
            });
            debug!(cycle = id, "Voice state: Idle -> Listening");
            self.emit(VoiceEvent::Started);
            id
        };

        // Called outside the lock: a platform may deliver events synchronously.
        if let Err(e) = recognizer.start(&self.settings) {
            warn!(error = %e, "Failed to start speech recognition");
            // A session that never started owes no end event.
            let mut session = self.lock_session();
            if session.current.as_ref().is_some_and(|c| c.id == cycle_id) {
                self.close_cycle(&mut session);
            }
        }
    }

    /// Stop listening. Idempotent: no-op when idle.
    pub fn stop(&self) {
        let Some(recognizer) = self.recognition.get() else {
            return;
        };
        {
            let mut session = self.lock_session();
            if session.state() != VoiceState::Listening {
                return;
            }
            self.close_cycle(&mut session);
            session.pending_ends += 1;
        }
        recognizer.stop();
    }

    /// Feed a platform recognition callback into the state machine.
    pub fn handle_recognition(&self, event: RecognitionEvent) {
        let mut session = self.lock_session();
        match event {
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => {
                if !is_final {
                    return;
                }
                if session.pending_ends > 0 {
                    debug!("Ignoring transcript from a closed recognition session");
                    return;
                }
                let transcript = transcript.trim();
                if transcript.is_empty() {
                    debug!("Ignoring empty transcript");
                    return;
                }
                match session.current.as_mut() {
                    Some(cycle) if !cycle.transcript_delivered => {
                        cycle.transcript_delivered = true;
                        debug!(cycle = cycle.id, len = transcript.len(), "Final transcript");
                        self.emit(VoiceEvent::Transcript(transcript.to_string()));
                    }
                    _ => debug!("Ignoring transcript outside an open recognition cycle"),
                }
            }
            RecognitionEvent::Error(reason) => {
                if session.pending_ends > 0 {
                    debug!(reason = %reason, "Ignoring error from a closed recognition session");
                    return;
                }
                warn!(reason = %reason, "Speech recognition error");
                if session.current.is_some() {
                    self.close_cycle(&mut session);
                    // The platform still follows up with its end event.
                    session.pending_ends += 1;
                }
            }
            RecognitionEvent::End => {
                if session.pending_ends > 0 {
                    session.pending_ends -= 1;
                    debug!("Late end event for a closed recognition session");
                    return;
                }
                if session.current.is_some() {
                    self.close_cycle(&mut session);
                } else {
                    debug!("No open recognition cycle to end");
                }
            }
        }
    }

    /// Speak `text`, cancelling whatever is playing. Last request wins.
    ///
    /// No-op when synthesis is unavailable or the text is blank.
    pub fn speak(&self, text: &str) {
        let Some(synthesizer) = self.synthesis.get() else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        synthesizer.cancel();
        let voices = synthesizer.voices();
        let voice = select_voice(&voices, &self.preferred_voice);
        debug!(
            voice = voice.as_ref().map(|v| v.name.as_str()).unwrap_or("<default>"),
            len = text.len(),
            "Speaking"
        );
        synthesizer.speak(Utterance {
            text: text.to_string(),
            voice,
            rate: self.rate,
            pitch: self.pitch,
        });
    }

    /// Silence any playing synthesis.
    pub fn cancel_speech(&self) {
        if let Some(synthesizer) = self.synthesis.get() {
            synthesizer.cancel();
        }
    }

    // -- Private helpers --

    /// Close the open cycle and emit its `Ended`.
    fn close_cycle(&self, session: &mut Recognition) {
        if let Some(cycle) = session.current.take() {
            debug!(cycle = cycle.id, "Voice state: -> Idle");
            self.emit(VoiceEvent::Ended);
        }
    }

    fn emit(&self, event: VoiceEvent) {
        if self.events.send(event).is_err() {
            debug!("Voice event dropped: no subscriber");
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Recognition> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pick the synthesis voice: the first whose name contains `preferred`, else
/// the first in the catalog, else `None` for the platform default.
pub fn select_voice(voices: &[VoiceInfo], preferred: &str) -> Option<VoiceInfo> {
    voices
        .iter()
        .find(|v| !preferred.is_empty() && v.name.contains(preferred))
        .or_else(|| voices.first())
        .cloned()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::mock::{MockRecognizer, MockSynthesizer};

    struct Harness {
        adapter: VoiceAdapter,
        events: mpsc::UnboundedReceiver<VoiceEvent>,
        recognizer: Arc<MockRecognizer>,
        synthesizer: Arc<MockSynthesizer>,
    }

    fn catalog() -> Vec<VoiceInfo> {
        vec![
            VoiceInfo::new("Samantha", "en-US"),
            VoiceInfo::new("Google US English", "en-US"),
            VoiceInfo::new("Google Deutsch", "de-DE"),
        ]
    }

    fn harness() -> Harness {
        let recognizer = Arc::new(MockRecognizer::new());
        let synthesizer = Arc::new(MockSynthesizer::new(catalog()));
        let capability = SpeechCapability::new(
            Some(recognizer.clone() as Arc<dyn SpeechRecognizer>),
            Some(synthesizer.clone() as Arc<dyn SpeechSynthesizer>),
        );
        let (adapter, events) = VoiceAdapter::new(capability, &VoiceConfig::default());
        Harness {
            adapter,
            events,
            recognizer,
            synthesizer,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<VoiceEvent>) -> Vec<VoiceEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn final_result(text: &str) -> RecognitionEvent {
        RecognitionEvent::Result {
            transcript: text.to_string(),
            is_final: true,
        }
    }

    // ---- Recognition ----

    #[test]
    fn test_start_enters_listening() {
        let mut h = harness();
        h.adapter.start();
        assert!(h.adapter.is_listening());
        assert_eq!(h.recognizer.start_count(), 1);
        assert_eq!(drain(&mut h.events), vec![VoiceEvent::Started]);

        let settings = h.recognizer.last_settings().unwrap();
        assert_eq!(settings.language, "en-US");
        assert!(!settings.interim_results);
    }

    #[test]
    fn test_start_while_listening_is_noop() {
        let mut h = harness();
        h.adapter.start();
        h.adapter.start();
        assert_eq!(h.recognizer.start_count(), 1);
        assert_eq!(drain(&mut h.events), vec![VoiceEvent::Started]);
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let mut h = harness();
        h.adapter.stop();
        assert_eq!(h.recognizer.stop_count(), 0);
        assert!(drain(&mut h.events).is_empty());
        assert_eq!(h.adapter.state(), VoiceState::Idle);
    }

    #[test]
    fn test_transcript_then_end_fires_each_once() {
        let mut h = harness();
        h.adapter.start();
        h.adapter.handle_recognition(final_result("  headache since monday "));
        assert_eq!(h.adapter.state(), VoiceState::Idle);
        h.adapter.handle_recognition(RecognitionEvent::End);

        assert_eq!(
            drain(&mut h.events),
            vec![
                VoiceEvent::Started,
                VoiceEvent::Transcript("headache since monday".to_string()),
                VoiceEvent::Ended,
            ]
        );
    }

    #[test]
    fn test_second_transcript_in_cycle_is_ignored() {
        let mut h = harness();
        h.adapter.start();
        h.adapter.handle_recognition(final_result("one"));
        h.adapter.handle_recognition(final_result("two"));
        h.adapter.handle_recognition(RecognitionEvent::End);

        let events = drain(&mut h.events);
        let transcripts = events
            .iter()
            .filter(|e| matches!(e, VoiceEvent::Transcript(_)))
            .count();
        assert_eq!(transcripts, 1);
    }

    #[test]
    fn test_interim_results_are_not_surfaced() {
        let mut h = harness();
        h.adapter.start();
        h.adapter.handle_recognition(RecognitionEvent::Result {
            transcript: "head".to_string(),
            is_final: false,
        });
        assert!(h.adapter.is_listening());
        assert_eq!(drain(&mut h.events), vec![VoiceEvent::Started]);
    }

    #[test]
    fn test_error_then_end_fires_ended_once() {
        let mut h = harness();
        h.adapter.start();
        h.adapter
            .handle_recognition(RecognitionEvent::Error("no-speech".to_string()));
        assert_eq!(h.adapter.state(), VoiceState::Idle);
        h.adapter.handle_recognition(RecognitionEvent::End);

        assert_eq!(
            drain(&mut h.events),
            vec![VoiceEvent::Started, VoiceEvent::Ended]
        );
    }

    #[test]
    fn test_stop_ends_cycle_and_late_end_is_ignored() {
        let mut h = harness();
        h.adapter.start();
        h.adapter.stop();
        assert_eq!(h.recognizer.stop_count(), 1);
        assert_eq!(h.adapter.state(), VoiceState::Idle);

        h.adapter.handle_recognition(RecognitionEvent::End);
        h.adapter.stop();
        assert_eq!(h.recognizer.stop_count(), 1);

        assert_eq!(
            drain(&mut h.events),
            vec![VoiceEvent::Started, VoiceEvent::Ended]
        );
    }

    #[test]
    fn test_late_end_after_stop_does_not_close_next_cycle() {
        let mut h = harness();
        h.adapter.start();
        h.adapter.stop();
        h.adapter.start();

        // The stopped session's end arrives after the restart.
        h.adapter.handle_recognition(RecognitionEvent::End);
        assert!(h.adapter.is_listening());

        h.adapter.handle_recognition(final_result("cycle two words"));
        h.adapter.handle_recognition(RecognitionEvent::End);

        assert_eq!(
            drain(&mut h.events),
            vec![
                VoiceEvent::Started,
                VoiceEvent::Ended,
                VoiceEvent::Started,
                VoiceEvent::Transcript("cycle two words".to_string()),
                VoiceEvent::Ended,
            ]
        );
        assert_eq!(h.adapter.state(), VoiceState::Idle);
    }

    #[test]
    fn test_stopped_session_results_are_dropped() {
        let mut h = harness();
        h.adapter.start();
        h.adapter.stop();
        h.adapter.start();

        h.adapter.handle_recognition(final_result("said before stop"));
        h.adapter
            .handle_recognition(RecognitionEvent::Error("aborted".to_string()));
        h.adapter.handle_recognition(RecognitionEvent::End);
        assert!(h.adapter.is_listening());

        let events = drain(&mut h.events);
        assert!(!events.iter().any(|e| matches!(e, VoiceEvent::Transcript(_))));
        assert_eq!(events.last(), Some(&VoiceEvent::Started));
    }

    #[test]
    fn test_late_end_after_error_does_not_close_next_cycle() {
        let mut h = harness();
        h.adapter.start();
        h.adapter
            .handle_recognition(RecognitionEvent::Error("network".to_string()));
        h.adapter.start();
        h.adapter.handle_recognition(RecognitionEvent::End);
        assert!(h.adapter.is_listening());
    }

    #[test]
    fn test_late_end_after_stale_restart_is_absorbed() {
        let mut h = harness();
        h.adapter.start();
        h.adapter.handle_recognition(final_result("first"));
        h.adapter.start();
        h.adapter.handle_recognition(RecognitionEvent::End);
        assert!(h.adapter.is_listening());

        h.adapter.handle_recognition(final_result("second"));
        assert_eq!(
            drain(&mut h.events).last(),
            Some(&VoiceEvent::Transcript("second".to_string()))
        );
    }

    #[test]
    fn test_state_follows_cycle() {
        let h = harness();
        assert_eq!(h.adapter.state(), VoiceState::Idle);
        h.adapter.start();
        assert_eq!(h.adapter.state(), VoiceState::Listening);
        h.adapter.handle_recognition(final_result("done"));
        assert_eq!(h.adapter.state(), VoiceState::Idle);
        assert_eq!(VoiceState::Listening.to_string(), "Listening");
    }

    #[test]
    fn test_restart_closes_stale_cycle_first() {
        let mut h = harness();
        h.adapter.start();
        h.adapter.handle_recognition(final_result("first"));
        // No end event from the platform before the next start.
        h.adapter.start();
        assert!(h.adapter.is_listening());

        assert_eq!(
            drain(&mut h.events),
            vec![
                VoiceEvent::Started,
                VoiceEvent::Transcript("first".to_string()),
                VoiceEvent::Ended,
                VoiceEvent::Started,
            ]
        );
    }

    #[test]
    fn test_platform_start_failure_returns_to_idle() {
        let mut h = harness();
        h.recognizer.fail_on_start(true);
        h.adapter.start();
        assert_eq!(h.adapter.state(), VoiceState::Idle);
        assert_eq!(
            drain(&mut h.events),
            vec![VoiceEvent::Started, VoiceEvent::Ended]
        );

        // Recovers once the platform cooperates.
        h.recognizer.fail_on_start(false);
        h.adapter.start();
        assert!(h.adapter.is_listening());
    }

    #[test]
    fn test_events_without_cycle_are_ignored() {
        let mut h = harness();
        h.adapter.handle_recognition(final_result("stray"));
        h.adapter.handle_recognition(RecognitionEvent::End);
        assert!(drain(&mut h.events).is_empty());
    }

    // ---- Synthesis ----

    #[test]
    fn test_speak_uses_preferred_voice_and_tuning() {
        let h = harness();
        h.adapter.speak("Take with food.");

        let audible = h.synthesizer.audible().unwrap();
        assert_eq!(audible.text, "Take with food.");
        assert_eq!(audible.voice.unwrap().name, "Google US English");
        assert!((audible.rate - 1.1).abs() < f32::EPSILON);
        assert!((audible.pitch - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_speak_twice_only_second_audible() {
        let h = harness();
        h.adapter.speak("first reply");
        h.adapter.speak("second reply");

        assert_eq!(h.synthesizer.audible().unwrap().text, "second reply");
        assert_eq!(h.synthesizer.cancel_count(), 2);
    }

    #[test]
    fn test_speak_blank_is_noop() {
        let h = harness();
        h.adapter.speak("   ");
        assert!(h.synthesizer.spoken().is_empty());
        assert_eq!(h.synthesizer.cancel_count(), 0);
    }

    #[test]
    fn test_cancel_speech() {
        let h = harness();
        h.adapter.speak("reply");
        h.adapter.cancel_speech();
        assert!(h.synthesizer.audible().is_none());
    }

    #[test]
    fn test_select_voice_fallbacks() {
        let voices = catalog();
        assert_eq!(
            select_voice(&voices, "Google US").unwrap().name,
            "Google US English"
        );
        assert_eq!(select_voice(&voices, "Missing").unwrap().name, "Samantha");
        assert_eq!(select_voice(&voices, "").unwrap().name, "Samantha");
        assert!(select_voice(&[], "Google US English").is_none());
    }

    // ---- Capability absence ----

    #[test]
    fn test_unavailable_capability_degrades_to_noops() {
        let (adapter, mut events) =
            VoiceAdapter::new(SpeechCapability::unavailable(), &VoiceConfig::default());
        assert!(!adapter.recognition_available());
        assert!(!adapter.synthesis_available());

        adapter.start();
        assert_eq!(adapter.state(), VoiceState::Idle);
        adapter.stop();
        adapter.speak("hello");
        adapter.cancel_speech();
        adapter.handle_recognition(RecognitionEvent::End);
        assert!(drain(&mut events).is_empty());
    }

    #[test]
    fn test_config_can_disable_synthesis() {
        let synthesizer = Arc::new(MockSynthesizer::new(catalog()));
        let capability = SpeechCapability::new(
            None,
            Some(synthesizer.clone() as Arc<dyn SpeechSynthesizer>),
        );
        let config = VoiceConfig {
            synthesis_enabled: false,
            ..VoiceConfig::default()
        };
        let (adapter, _events) = VoiceAdapter::new(capability, &config);
        adapter.speak("hello");
        assert!(synthesizer.spoken().is_empty());
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let h = harness();
        drop(h.events);
        h.adapter.start();
        h.adapter.stop();
        assert_eq!(h.adapter.state(), VoiceState::Idle);
    }
}
