//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `chat-core` (pure Rust).
//! Implementations live in `chat-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::pin::Pin;
use async_trait::async_trait;
use futures::Stream;
use chat_types::{
    Result,
    conversation::ConversationId,
    message::Attachment,
};

// ─── Chat Port ───────────────────────────────────────────────

/// One event of a streamed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamEvent {
    /// An incremental text fragment
    Delta(String),
    /// Terminal success
    Completed,
    /// Terminal failure, with a human-readable cause
    Failed(String),
}

/// What gets sent when the user submits a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub conversation_id: ConversationId,
    pub text: String,
    pub image_urls: Vec<String>,
}

pub type ChatStream = Pin<Box<dyn Stream<Item = ChatStreamEvent>>>;

pub trait ChatPort {
    /// Open a streaming exchange. Transport errors arrive as a
    /// `ChatStreamEvent::Failed` item rather than an `Err`.
    fn stream_chat(&self, req: ChatRequest) -> ChatStream;
}

// ─── Content Store Port ──────────────────────────────────────

/// Revision id of a stored object (the blob `sha` on GitHub)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(pub String);

/// Create-or-update request for one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    pub path: String,
    pub message: String,
    pub content_base64: String,
    /// Required when the object already exists
    pub version: Option<VersionToken>,
}

#[async_trait(?Send)]
pub trait ContentStorePort {
    /// Current version of the object at `path`, or `None` if there is none
    async fn fetch_version(&self, path: &str) -> Result<Option<VersionToken>>;

    /// Create or update; returns the version of the written object.
    /// Must fail with `ChatError::VersionConflict` rather than overwrite.
    async fn put_object(&self, req: PutObject) -> Result<VersionToken>;
}

// ─── Local File Port ─────────────────────────────────────────

/// A file picked by the user whose payload can be read asynchronously
#[async_trait(?Send)]
pub trait LocalFile {
    fn attachment(&self) -> &Attachment;

    /// Fails with `ChatError::ReadFailed`
    async fn read_bytes(&self) -> Result<Vec<u8>>;

    fn name(&self) -> &str {
        &self.attachment().name
    }
}
