use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Message;

/// Domain events published by the orchestrator.
///
/// Consumed by the front end (rendering, status indicator) and by the event
/// log. Delivery is best-effort over a broadcast channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    // =========================================================================
    // Session Events
    // =========================================================================
    /// A new session was created and became active.
    SessionCreated {
        session_id: Uuid,
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// The active session changed.
    SessionSelected {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A session was removed from the store.
    SessionDeleted {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A message was appended to a session.
    MessageAppended {
        session_id: Uuid,
        message: Message,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Generation Events
    // =========================================================================
    /// A generation request was sent; the processing flag is set.
    GenerationStarted {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A reply was appended. `spoken` tells whether it was sent to synthesis.
    GenerationCompleted {
        session_id: Uuid,
        message_id: Uuid,
        spoken: bool,
        timestamp: DateTime<Utc>,
    },

    /// The generator failed; nothing was appended.
    GenerationFailed {
        session_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A reply arrived for a session that no longer exists.
    ResponseDiscarded {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Voice Events
    // =========================================================================
    /// Speech recognition started listening.
    ListeningStarted { timestamp: DateTime<Utc> },

    /// A recognition cycle ended (transcript, error, or stop).
    ListeningEnded { timestamp: DateTime<Utc> },

    /// A final transcript was received from recognition.
    TranscriptReceived {
        text: String,
        timestamp: DateTime<Utc>,
    },

    /// A transcript could not be submitted, e.g. a request was in flight.
    VoiceInputDropped {
        text: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Text was handed to speech synthesis.
    SpeechRequested {
        text_length: usize,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::SessionCreated { timestamp, .. }
            | DomainEvent::SessionSelected { timestamp, .. }
            | DomainEvent::SessionDeleted { timestamp, .. }
            | DomainEvent::MessageAppended { timestamp, .. }
            | DomainEvent::GenerationStarted { timestamp, .. }
            | DomainEvent::GenerationCompleted { timestamp, .. }
            | DomainEvent::GenerationFailed { timestamp, .. }
            | DomainEvent::ResponseDiscarded { timestamp, .. }
            | DomainEvent::ListeningStarted { timestamp }
            | DomainEvent::ListeningEnded { timestamp }
            | DomainEvent::TranscriptReceived { timestamp, .. }
            | DomainEvent::VoiceInputDropped { timestamp, .. }
            | DomainEvent::SpeechRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a short event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            DomainEvent::SessionCreated { .. } => "session_created",
            DomainEvent::SessionSelected { .. } => "session_selected",
            DomainEvent::SessionDeleted { .. } => "session_deleted",
            DomainEvent::MessageAppended { .. } => "message_appended",
            DomainEvent::GenerationStarted { .. } => "generation_started",
            DomainEvent::GenerationCompleted { .. } => "generation_completed",
            DomainEvent::GenerationFailed { .. } => "generation_failed",
            DomainEvent::ResponseDiscarded { .. } => "response_discarded",
            DomainEvent::ListeningStarted { .. } => "listening_started",
            DomainEvent::ListeningEnded { .. } => "listening_ended",
            DomainEvent::TranscriptReceived { .. } => "transcript_received",
            DomainEvent::VoiceInputDropped { .. } => "voice_input_dropped",
            DomainEvent::SpeechRequested { .. } => "speech_requested",
        }
    }

    /// The session this event concerns, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            DomainEvent::SessionCreated { session_id, .. }
            | DomainEvent::SessionSelected { session_id, .. }
            | DomainEvent::SessionDeleted { session_id, .. }
            | DomainEvent::MessageAppended { session_id, .. }
            | DomainEvent::GenerationStarted { session_id, .. }
            | DomainEvent::GenerationCompleted { session_id, .. }
            | DomainEvent::GenerationFailed { session_id, .. }
            | DomainEvent::ResponseDiscarded { session_id, .. } => Some(*session_id),
            _ => None,
        }
    }
}
