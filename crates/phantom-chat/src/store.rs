//! In-memory session store.
//!
//! Pure data plus mutation rules; no I/O. Exactly one session is active at any
//! time and the active id always references a stored session.

use uuid::Uuid;

use phantom_core::config::ChatConfig;
use phantom_core::types::{Message, MessageRole, Session, SessionSummary};

use crate::error::ChatError;

/// Collection of conversation threads, most recently created first.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Vec<Session>,
    active: Uuid,
    config: ChatConfig,
}

impl SessionStore {
    /// Create a store seeded with one default session, which is active.
    pub fn new(config: ChatConfig) -> Self {
        let seed = Session::new(config.default_title.clone(), config.welcome_message.clone());
        Self {
            active: seed.id,
            sessions: vec![seed],
            config,
        }
    }

    /// Allocate a new session and make it active. The previous session is kept.
    pub fn create_session(&mut self) -> Session {
        let title = format!(
            "{} #{}",
            self.config.session_title_prefix,
            self.sessions.len() + 1
        );
        let session = Session::new(title, self.config.welcome_message.clone());
        self.active = session.id;
        self.sessions.insert(0, session.clone());
        tracing::debug!(session_id = %session.id, "Session created");
        session
    }

    /// Make `id` the active session. Unknown ids leave the store unchanged.
    pub fn select_session(&mut self, id: Uuid) -> Result<(), ChatError> {
        if !self.contains(id) {
            return Err(ChatError::SessionNotFound(id));
        }
        self.active = id;
        Ok(())
    }

    /// Append a message to a session.
    ///
    /// The first user message of a session sets its title, once.
    pub fn append_message(&mut self, session_id: Uuid, message: Message) -> Result<(), ChatError> {
        let title_max_chars = self.config.title_max_chars;
        let attachment_title = &self.config.attachment_title;
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or(ChatError::SessionNotFound(session_id))?;

        if message.role == MessageRole::User && !session.has_user_message() {
            session.title = derive_title(&message.content, title_max_chars, attachment_title);
        }
        session.messages.push(message);
        Ok(())
    }

    /// Summaries of every session, most recently created first.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.sessions
            .iter()
            .map(|s| SessionSummary::from_session(s, s.id == self.active))
            .collect()
    }

    /// Remove a session.
    ///
    /// Deleting the active session activates the most recently created one
    /// left. Deleting the last session seeds a fresh default session, which is
    /// returned.
    pub fn delete_session(&mut self, id: Uuid) -> Result<Option<Session>, ChatError> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or(ChatError::SessionNotFound(id))?;
        self.sessions.remove(index);

        let seeded = if self.is_empty() {
            let seed = Session::new(
                self.config.default_title.clone(),
                self.config.welcome_message.clone(),
            );
            self.sessions.push(seed.clone());
            Some(seed)
        } else {
            None
        };

        if self.active == id {
            // Non-empty at this point.
            if let Some(first) = self.sessions.first() {
                self.active = first.id;
            }
        }
        Ok(seeded)
    }

    pub fn session(&self, id: Uuid) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_session_id(&self) -> Uuid {
        self.active
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.session(self.active)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.sessions.iter().any(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Leading `max_chars` characters of the content, or the fallback label when
/// the message carries only an attachment.
fn derive_title(content: &str, max_chars: usize, fallback: &str) -> String {
    if content.trim().is_empty() {
        return fallback.to_string();
    }
    content.chars().take(max_chars).collect()
}

// =============================================================================
// Tests
// =============================================================================
