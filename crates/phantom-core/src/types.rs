use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Author of a message within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Typed or dictated input from the user.
    User,
    /// Text returned by the response generator, including the welcome message.
    Model,
    /// Operator notices injected by the client itself.
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Model => write!(f, "model"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Kind of binary payload carried by an attachment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    #[default]
    Image,
}

// =============================================================================
// Value objects
// =============================================================================

/// An image payload bound to a single message.
///
/// `encoded_data` is standard base64, optionally wrapped in a
/// `data:<mime>;base64,` prefix. See [`Attachment::payload`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub encoded_data: String,
    pub mime_type: String,
}

/// One turn in a session. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Message {
    /// Create a message with a fresh id and the current timestamp.
    pub fn new(role: MessageRole, content: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            attachment,
        }
    }

    pub fn user(content: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self::new(MessageRole::User, content, attachment)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Model, content, None)
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// One independent, ordered conversation thread.
///
/// Only `title` (derived once from the first user message) and `messages`
/// (append-only) change after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session seeded with a single welcome message from the model.
    pub fn new(title: impl Into<String>, welcome: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            messages: vec![Message::model(welcome)],
            created_at: Utc::now(),
        }
    }

    /// Whether the session already holds at least one user message.
    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == MessageRole::User)
    }

    /// The most recent message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Lightweight view of a session for listings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl SessionSummary {
    pub fn from_session(session: &Session, is_active: bool) -> Self {
        Self {
            id: session.id,
            title: session.title.clone(),
            message_count: session.messages.len(),
            created_at: session.created_at,
            is_active,
        }
    }
}
