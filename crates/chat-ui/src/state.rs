//! UI-level state that drives rendering.
//! This is a read-only projection of the conversation store plus the
//! composer (input text, staged files), refreshed each frame by draining
//! the EventBus.

use chat_core::store::StoreSnapshot;
use chat_types::{
    conversation::ConversationSummary,
    event::{ChatEvent, StreamOutcome},
    message::{Attachment, Message},
};
use std::rc::Rc;

/// State visible to UI panels
pub struct UiState {
    /// Last store snapshot seen by the UI
    pub snapshot: StoreSnapshot,
    /// Uploaded image URLs that ride along with the next message
    pub pending_images: Vec<String>,
    /// Input field content
    pub input_text: String,
    /// Local files attached to the next message
    pub staged_files: Vec<Attachment>,
    /// Image batches started and not yet finished
    pub uploads_in_flight: usize,
    /// Status line text
    pub status_text: String,
    /// Modal message, dismissed by the user
    pub alert: Option<String>,
    /// Whether the conversation sidebar is shown
    pub show_sidebar: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            snapshot: StoreSnapshot::default(),
            pending_images: Vec::new(),
            input_text: String::new(),
            staged_files: Vec::new(),
            uploads_in_flight: 0,
            status_text: "Ready".to_string(),
            alert: None,
            show_sidebar: true,
        }
    }

    /// Process events from the EventBus.
    /// Returns true when the store changed and the snapshot must be refreshed.
    pub fn process_events(&mut self, events: Vec<ChatEvent>) -> bool {
        let mut store_changed = false;
        for event in events {
            store_changed |= event.touches_store();
            match event {
                ChatEvent::ConversationCreated { .. } => {
                    self.status_text = "New conversation".to_string();
                }
                ChatEvent::MessagesAppended { .. } => {
                    self.status_text = "Waiting for response...".to_string();
                }
                ChatEvent::MessageUpdated { .. } => {
                    self.status_text = "Receiving...".to_string();
                }
                ChatEvent::StreamFinished { outcome, .. } => {
                    self.status_text = match outcome {
                        StreamOutcome::Failed { reason } => format!("Error: {}", reason),
                        StreamOutcome::Finalized | StreamOutcome::Abandoned => "Ready".to_string(),
                    };
                }
                ChatEvent::UploadStarted { file_count } => {
                    self.uploads_in_flight += 1;
                    self.status_text = format!("Uploading {} image(s)...", file_count);
                }
                ChatEvent::UploadFinished { urls, failures } => {
                    self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
                    self.status_text = if self.uploading() {
                        format!(
                            "Uploaded {} image(s), {} batch(es) still uploading...",
                            urls.len(),
                            self.uploads_in_flight
                        )
                    } else {
                        format!("Uploaded {} image(s)", urls.len())
                    };
                    if !failures.is_empty() {
                        let lines: Vec<String> = failures
                            .iter()
                            .map(|(name, cause)| format!("{}: {}", name, cause))
                            .collect();
                        self.alert = Some(format!("Upload failed\n{}", lines.join("\n")));
                    }
                }
                ChatEvent::Error { message } => {
                    log::warn!("UI error: {}", message);
                    self.status_text = format!("Error: {}", message);
                }
                ChatEvent::ConversationSelected { .. } | ChatEvent::ConversationDeleted { .. } => {}
            }
        }
        store_changed
    }

    /// Replace the projection with fresh core state
    pub fn refresh(&mut self, snapshot: StoreSnapshot, pending_images: Vec<String>) {
        self.snapshot = snapshot;
        self.pending_images = pending_images;
    }

    pub fn conversations(&self) -> Vec<ConversationSummary> {
        self.snapshot
            .conversations()
            .iter()
            .map(|c| c.summary())
            .collect()
    }

    pub fn active_messages(&self) -> &[Rc<Message>] {
        self.snapshot.active_messages()
    }

    /// The active conversation is still receiving a response
    pub fn is_busy(&self) -> bool {
        self.snapshot
            .active_conversation()
            .map(|c| c.is_streaming())
            .unwrap_or(false)
    }

    /// Some image batch is still uploading; its URLs belong to the next message
    pub fn uploading(&self) -> bool {
        self.uploads_in_flight > 0
    }

    pub fn can_send(&self) -> bool {
        let has_content = !self.input_text.trim().is_empty() || !self.staged_files.is_empty();
        has_content && !self.is_busy() && !self.uploading()
    }

    /// Take the composer content for sending, clearing it.
    /// The text is sent as typed; whitespace only matters for the empty check.
    pub fn take_submission(&mut self) -> Option<(String, Vec<Attachment>)> {
        if !self.can_send() {
            return None;
        }
        let text = std::mem::take(&mut self.input_text);
        Some((text, std::mem::take(&mut self.staged_files)))
    }

    pub fn stage_files(&mut self, files: impl IntoIterator<Item = Attachment>) {
        self.staged_files.extend(files);
    }

    pub fn remove_staged_file(&mut self, index: usize) -> Option<Attachment> {
        (index < self.staged_files.len()).then(|| self.staged_files.remove(index))
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
