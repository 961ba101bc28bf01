//! Chat orchestrator: central coordinator wiring the session store, the
//! response generator, and the voice adapter.
//!
//! Runs at most one generation request process-wide. Replies land in the
//! session captured when the request was submitted, whatever session is
//! active by the time they arrive.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use phantom_core::config::{ChatConfig, GeneratorConfig, PhantomConfig};
use phantom_core::events::DomainEvent;
use phantom_core::types::{Attachment, Message, Session, SessionSummary};
use phantom_voice::{VoiceAdapter, VoiceEvent};

use crate::error::ChatError;
use crate::generator::{GenerationError, GenerationRequest, ResponseGenerator};
use crate::store::SessionStore;

/// Capacity of the domain event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Holds the processing flag for the lifetime of one request.
///
/// Dropping the guard clears the flag, including when the submitting future is
/// cancelled mid-flight.
struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Coordinates user input, voice, generation and the session store.
pub struct Orchestrator {
    store: Mutex<SessionStore>,
    processing: AtomicBool,
    generator: Arc<dyn ResponseGenerator>,
    voice: Arc<VoiceAdapter>,
    events: broadcast::Sender<DomainEvent>,
    chat: ChatConfig,
    generator_config: GeneratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator with a freshly seeded session store.
    pub fn new(
        config: &PhantomConfig,
        generator: Arc<dyn ResponseGenerator>,
        voice: Arc<VoiceAdapter>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: Mutex::new(SessionStore::new(config.chat.clone())),
            processing: AtomicBool::new(false),
            generator,
            voice,
            events,
            chat: config.chat.clone(),
            generator_config: config.generator.clone(),
        }
    }

    /// Subscribe to domain events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Whether a generation request is outstanding.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub fn voice(&self) -> &VoiceAdapter {
        &self.voice
    }

    // -- Sessions --

    /// Start a new conversation; it becomes active.
    pub fn create_session(&self) -> Session {
        let session = self.with_store(|store| store.create_session());
        info!(session_id = %session.id, title = %session.title, "New session");
        self.publish(DomainEvent::SessionCreated {
            session_id: session.id,
            title: session.title.clone(),
            timestamp: Utc::now(),
        });
        session
    }

    pub fn select_session(&self, id: Uuid) -> Result<(), ChatError> {
        self.with_store(|store| store.select_session(id))?;
        self.publish(DomainEvent::SessionSelected {
            session_id: id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub fn delete_session(&self, id: Uuid) -> Result<(), ChatError> {
        let (seeded, active) = self.with_store(|store| {
            store
                .delete_session(id)
                .map(|seeded| (seeded, store.active_session_id()))
        })?;
        info!(session_id = %id, "Session deleted");
        self.publish(DomainEvent::SessionDeleted {
            session_id: id,
            timestamp: Utc::now(),
        });
        if let Some(seed) = seeded {
            self.publish(DomainEvent::SessionCreated {
                session_id: seed.id,
                title: seed.title,
                timestamp: Utc::now(),
            });
        }
        self.publish(DomainEvent::SessionSelected {
            session_id: active,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.with_store(|store| store.list_sessions())
    }

    pub fn session(&self, id: Uuid) -> Option<Session> {
        self.with_store(|store| store.session(id).cloned())
    }

    pub fn active_session_id(&self) -> Uuid {
        self.with_store(|store| store.active_session_id())
    }

    /// Snapshot of the active session.
    pub fn active_session(&self) -> Option<Session> {
        self.with_store(|store| store.active_session().cloned())
    }

    // -- Submission --

    /// Submit to whichever session is active right now.
    pub async fn submit_to_active(
        &self,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<Message, ChatError> {
        let session_id = self.active_session_id();
        self.submit(session_id, text, attachment).await
    }

    /// Attach an image and submit it to the active session.
    ///
    /// `source` is either a `data:` URL or a file path. An image that cannot
    /// be loaded is rejected before anything is appended.
    pub async fn submit_image(&self, source: &str, text: &str) -> Result<Message, ChatError> {
        let attachment = if source.starts_with("data:") {
            Attachment::from_data_url(source)?
        } else {
            Attachment::from_path(Path::new(source))?
        };
        debug!(mime_type = %attachment.mime_type, "Image attached");
        self.submit_to_active(text, Some(attachment)).await
    }

    /// Run one request/response cycle against `session_id`.
    ///
    /// Returns the appended model message. On generator failure nothing is
    /// appended after the user message and `ChatError::Generation` is
    /// returned. The processing flag is always cleared on return.
    pub async fn submit(
        &self,
        session_id: Uuid,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<Message, ChatError> {
        if text.trim().is_empty() && attachment.is_none() {
            debug!(session_id = %session_id, "Ignoring empty submission");
            return Err(ChatError::EmptySubmission);
        }

        let _guard = ProcessingGuard::acquire(&self.processing).ok_or_else(|| {
            debug!(session_id = %session_id, "Submission rejected: request in flight");
            ChatError::Busy
        })?;

        let user_message = Message::user(text, attachment.clone());
        self.with_store(|store| store.append_message(session_id, user_message.clone()))?;
        self.publish(DomainEvent::MessageAppended {
            session_id,
            message: user_message,
            timestamp: Utc::now(),
        });
        self.publish(DomainEvent::GenerationStarted {
            session_id,
            timestamp: Utc::now(),
        });

        let request = GenerationRequest::new(text, attachment, &self.generator_config);
        info!(
            session_id = %session_id,
            prompt_len = request.prompt.len(),
            has_attachment = request.attachment.is_some(),
            "Requesting response"
        );

        let reply = match self.generate(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Response generation failed");
                self.publish(DomainEvent::GenerationFailed {
                    session_id,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e.into());
            }
        };

        let model_message = Message::model(reply);
        let appended =
            self.with_store(|store| store.append_message(session_id, model_message.clone()));
        if let Err(e) = appended {
            warn!(session_id = %session_id, "Session removed before its response arrived; discarding");
            self.publish(DomainEvent::ResponseDiscarded {
                session_id,
                timestamp: Utc::now(),
            });
            return Err(e);
        }
        self.publish(DomainEvent::MessageAppended {
            session_id,
            message: model_message.clone(),
            timestamp: Utc::now(),
        });

        let spoken = model_message.content.chars().count() < self.chat.speak_threshold_chars;
        if spoken {
            self.speak(&model_message.content);
        }
        self.publish(DomainEvent::GenerationCompleted {
            session_id,
            message_id: model_message.id,
            spoken,
            timestamp: Utc::now(),
        });

        Ok(model_message)
    }

    // -- Voice --

    /// Start listening, or stop if already listening.
    pub fn toggle_voice(&self) {
        if self.voice.is_listening() {
            self.voice.stop();
        } else {
            self.voice.start();
        }
    }

    /// Speak arbitrary text through the voice adapter.
    pub fn speak(&self, text: &str) {
        self.voice.speak(text);
        self.publish(DomainEvent::SpeechRequested {
            text_length: text.chars().count(),
            timestamp: Utc::now(),
        });
    }

    /// Route one voice event into the pipeline.
    ///
    /// A transcript is submitted to the session active when it arrives, on
    /// its own task; the handle is returned so callers may await it.
    pub fn handle_voice_event(
        self: &Arc<Self>,
        event: VoiceEvent,
    ) -> Option<JoinHandle<Result<Message, ChatError>>> {
        match event {
            VoiceEvent::Started => {
                self.publish(DomainEvent::ListeningStarted {
                    timestamp: Utc::now(),
                });
                None
            }
            VoiceEvent::Ended => {
                self.publish(DomainEvent::ListeningEnded {
                    timestamp: Utc::now(),
                });
                None
            }
            VoiceEvent::Transcript(text) => {
                self.publish(DomainEvent::TranscriptReceived {
                    text: text.clone(),
                    timestamp: Utc::now(),
                });
                let this = Arc::clone(self);
                Some(tokio::spawn(async move {
                    let result = this.submit_to_active(&text, None).await;
                    match result {
                        // Generation failures already publish GenerationFailed.
                        Err(ChatError::Generation(_)) | Ok(_) => {}
                        Err(ref e) => {
                            warn!(error = %e, "Voice input dropped");
                            this.publish(DomainEvent::VoiceInputDropped {
                                text,
                                reason: e.to_string(),
                                timestamp: Utc::now(),
                            });
                        }
                    }
                    result
                }))
            }
        }
    }

    /// Drain the voice adapter's event channel until it closes.
    pub async fn run_voice_events(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<VoiceEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_voice_event(event);
        }
        debug!("Voice event channel closed");
    }

    // -- Private helpers --

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let secs = self.chat.generation_timeout_secs;
        let reply = tokio::time::timeout(Duration::from_secs(secs), self.generator.generate(request))
            .await
            .map_err(|_| GenerationError::Timeout(secs))??;
        if reply.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(reply)
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut SessionStore) -> T) -> T {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut store)
    }

    fn publish(&self, event: DomainEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

// =============================================================================
// Tests
// =============================================================================
