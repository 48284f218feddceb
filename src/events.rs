use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Bot,
}

/// A single message in the conversation.
///
/// `id` is stable for the lifetime of the message; `text` is only rewritten
/// for the bot placeholder while its stream is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub author: Author,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text.into(), Author::User)
    }

    /// Empty bot message that a streaming reply will be written into.
    pub fn bot_placeholder() -> Self {
        Self::new(String::new(), Author::Bot)
    }

    fn new(text: String, author: Author) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            author,
            timestamp: Utc::now(),
        }
    }
}
