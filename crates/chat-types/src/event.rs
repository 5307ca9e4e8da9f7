use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::message::MessageId;

/// How a streamed exchange ended for its placeholder message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamOutcome {
    /// Terminal success (or end of stream); content is now immutable
    Finalized,
    /// Transport or service failure; content replaced by the error text
    Failed { reason: String },
    /// The target disappeared mid-stream; remaining fragments were dropped
    Abandoned,
}

/// Events emitted by the chat core.
/// The UI drains these every frame and refreshes its projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatEvent {
    ConversationCreated { conversation_id: ConversationId },

    ConversationSelected { conversation_id: Option<ConversationId> },

    ConversationDeleted { conversation_id: ConversationId },

    /// User message and placeholder were appended
    MessagesAppended { conversation_id: ConversationId, count: usize },

    /// A delta was merged into a placeholder
    MessageUpdated { conversation_id: ConversationId, message_id: MessageId },

    StreamFinished {
        conversation_id: ConversationId,
        message_id: MessageId,
        outcome: StreamOutcome,
    },

    UploadStarted { file_count: usize },

    UploadFinished {
        urls: Vec<String>,
        /// (file name, cause) for every file that did not upload
        failures: Vec<(String, String)>,
    },

    /// Something the user should be told about
    Error { message: String },
}

impl ChatEvent {
    /// True when the event changed conversation state
    pub fn touches_store(&self) -> bool {
        !matches!(
            self,
            ChatEvent::UploadStarted { .. } | ChatEvent::UploadFinished { .. } | ChatEvent::Error { .. }
        )
    }
}
