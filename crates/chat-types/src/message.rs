use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a message, unique within its conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single message in a conversation.
///
/// User messages are fixed at creation. AI messages start as an empty
/// streaming placeholder and only grow until `is_streaming` turns false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub is_user: bool,
    /// Local files attached by the user (metadata only)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub files: Vec<Attachment>,
    /// Public URLs of images uploaded before this message was sent
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub is_streaming: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            content: text.into(),
            is_user: true,
            files: Vec::new(),
            image_urls: Vec::new(),
            is_streaming: false,
        }
    }

    /// Empty AI message that deltas are merged into
    pub fn placeholder() -> Self {
        Self {
            id: MessageId::new(),
            content: String::new(),
            is_user: false,
            files: Vec::new(),
            image_urls: Vec::new(),
            is_streaming: true,
        }
    }

    pub fn with_files(mut self, files: Vec<Attachment>) -> Self {
        self.files = files;
        self
    }

    pub fn with_image_urls(mut self, urls: Vec<String>) -> Self {
        self.image_urls = urls;
        self
    }

    /// True while the content may still change
    pub fn is_open(&self) -> bool {
        !self.is_user && self.is_streaming
    }
}

/// Coarse file classification, only used to pick a preview style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Other,
}

impl AttachmentKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.trim().to_ascii_lowercase().starts_with("image/") {
            AttachmentKind::Image
        } else {
            AttachmentKind::Other
        }
    }
}

/// Metadata of a locally selected file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    pub mime: String,
    pub kind: AttachmentKind,
}

impl Attachment {
    pub fn new(name: impl Into<String>, size: u64, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        Self {
            name: name.into(),
            size,
            kind: AttachmentKind::from_mime(&mime),
            mime,
        }
    }

    /// Size rounded to whole kilobytes, as shown in file chips
    pub fn size_kb(&self) -> u64 {
        (self.size + 512) / 1024
    }
}
