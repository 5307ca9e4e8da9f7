//! Chat session: wires the store, the merger and the uploader together.
//!
//! One submit runs the whole exchange:
//! 1. append the user message and an empty streaming placeholder
//! 2. open the remote stream
//! 3. merge deltas into the placeholder until the stream ends
//!
//! All methods take `&self` so a session can be shared through `Rc` with
//! futures spawned via `wasm_bindgen_futures::spawn_local`.

use std::cell::RefCell;
use std::rc::Rc;

use chat_types::{
    Result,
    config::ChatConfig,
    conversation::ConversationId,
    event::{ChatEvent, StreamOutcome},
    message::{Attachment, Message, MessageId},
};
use crate::event_bus::EventBus;
use crate::merger::{MessageTarget, StreamMerger};
use crate::ports::{ChatPort, ChatRequest, ContentStorePort, LocalFile};
use crate::store::{SharedStore, StoreSnapshot};
use crate::uploader::{AttachmentUploader, BatchReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing to send; no call was made
    Ignored,
    Completed {
        conversation_id: ConversationId,
        message_id: MessageId,
        outcome: StreamOutcome,
    },
}

pub struct ChatSession {
    store: SharedStore,
    event_bus: EventBus,
    chat: Rc<dyn ChatPort>,
    merger: StreamMerger,
    uploader: AttachmentUploader,
    /// Uploaded image URLs waiting for the next outgoing message
    pending_images: RefCell<Vec<String>>,
}

impl ChatSession {
    pub fn new(
        config: &ChatConfig,
        store: SharedStore,
        event_bus: EventBus,
        chat: Rc<dyn ChatPort>,
        content_store: Rc<dyn ContentStorePort>,
    ) -> Self {
        Self {
            merger: StreamMerger::new(store.clone(), event_bus.clone()),
            uploader: AttachmentUploader::new(content_store, config.content_store.clone()),
            store,
            event_bus,
            chat,
            pending_images: RefCell::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    // ─── Conversations ───────────────────────────────────────

    pub fn create_conversation(&self, title: Option<String>) -> ConversationId {
        let id = self.store.create_conversation(title);
        self.event_bus.emit(ChatEvent::ConversationCreated {
            conversation_id: id.clone(),
        });
        self.event_bus.emit(ChatEvent::ConversationSelected {
            conversation_id: Some(id.clone()),
        });
        id
    }

    pub fn select_conversation(&self, id: &ConversationId) -> bool {
        let selected = self.store.select_conversation(id);
        if selected {
            self.event_bus.emit(ChatEvent::ConversationSelected {
                conversation_id: Some(id.clone()),
            });
        }
        selected
    }

    pub fn delete_conversation(&self, id: &ConversationId) -> bool {
        let before = self.store.snapshot().active_id().cloned();
        if !self.store.delete_conversation(id) {
            return false;
        }
        self.event_bus.emit(ChatEvent::ConversationDeleted {
            conversation_id: id.clone(),
        });

        let after = self.store.snapshot().active_id().cloned();
        if after != before {
            self.event_bus.emit(ChatEvent::ConversationSelected {
                conversation_id: after,
            });
        }
        true
    }

    // ─── Images ──────────────────────────────────────────────

    pub fn pending_image_urls(&self) -> Vec<String> {
        self.pending_images.borrow().clone()
    }

    pub fn remove_pending_image(&self, index: usize) -> Option<String> {
        let mut pending = self.pending_images.borrow_mut();
        (index < pending.len()).then(|| pending.remove(index))
    }

    /// Upload a batch of images. Successes are appended to the pending
    /// URLs even when other files in the batch fail.
    pub async fn upload_images(&self, files: &[Rc<dyn LocalFile>]) -> BatchReport {
        if files.is_empty() {
            return BatchReport::default();
        }
        self.event_bus.emit(ChatEvent::UploadStarted {
            file_count: files.len(),
        });

        let report = self.uploader.upload_batch(files).await;
        let urls = report.urls();
        self.pending_images.borrow_mut().extend(urls.iter().cloned());

        self.event_bus.emit(ChatEvent::UploadFinished {
            urls,
            failures: report
                .failures
                .iter()
                .map(|f| (f.file_name.clone(), f.error.to_string()))
                .collect(),
        });
        report
    }

    // ─── Messages ────────────────────────────────────────────

    /// Send to the active conversation, creating one if there is none
    pub async fn submit(&self, text: &str, files: Vec<Attachment>) -> Result<SubmitOutcome> {
        if is_blank(text, &files) {
            return Ok(SubmitOutcome::Ignored);
        }
        let active = self.store.snapshot().active_id().cloned();
        let conversation_id = match active {
            Some(id) => id,
            None => self.create_conversation(None),
        };
        self.submit_to(&conversation_id, text, files).await
    }

    /// Send to a specific conversation, whatever is selected meanwhile
    pub async fn submit_to(
        &self,
        conversation_id: &ConversationId,
        text: &str,
        files: Vec<Attachment>,
    ) -> Result<SubmitOutcome> {
        if is_blank(text, &files) {
            return Ok(SubmitOutcome::Ignored);
        }

        let image_urls = self.pending_image_urls();
        let user = Message::user(text)
            .with_files(files)
            .with_image_urls(image_urls.clone());
        let placeholder = Message::placeholder().with_image_urls(image_urls.clone());
        let target = MessageTarget {
            conversation_id: conversation_id.clone(),
            message_id: placeholder.id.clone(),
        };

        self.store
            .append_messages(conversation_id, vec![user, placeholder])?;
        self.pending_images.borrow_mut().clear();
        self.event_bus.emit(ChatEvent::MessagesAppended {
            conversation_id: conversation_id.clone(),
            count: 2,
        });

        log::info!("Opening chat stream for conversation {}", conversation_id);
        let stream = self.chat.stream_chat(ChatRequest {
            conversation_id: conversation_id.clone(),
            text: text.to_string(),
            image_urls,
        });
        let outcome = self.merger.merge(&target, stream).await;

        if let StreamOutcome::Failed { reason } = &outcome {
            self.event_bus.emit(ChatEvent::Error {
                message: reason.clone(),
            });
        }

        Ok(SubmitOutcome::Completed {
            conversation_id: target.conversation_id,
            message_id: target.message_id,
            outcome,
        })
    }
}

fn is_blank(text: &str, files: &[Attachment]) -> bool {
    text.trim().is_empty() && files.is_empty()
}
