use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::message::{Message, MessageId};

/// Identifier of a conversation. Derived from the creation time in
/// milliseconds; the store bumps it when two are created in the same tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A titled, ordered sequence of messages.
///
/// Messages are reference-counted so that updating one message leaves every
/// other message pointer-identical between snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub messages: Vec<Rc<Message>>,
}

impl Conversation {
    pub fn new(id: ConversationId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
        }
    }

    pub fn message(&self, id: &MessageId) -> Option<&Rc<Message>> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// The placeholder currently receiving deltas, if any
    pub fn streaming_message(&self) -> Option<&Rc<Message>> {
        self.messages.iter().find(|m| m.is_open())
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming_message().is_some()
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            message_count: self.messages.len(),
            is_streaming: self.is_streaming(),
        }
    }
}

/// Summary of a conversation for the sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub message_count: usize,
    pub is_streaming: bool,
}

/// Title given to the n-th conversation (1-based)
pub fn default_title(n: usize) -> String {
    format!("对话 {}", n)
}
