//! Message stream merger.
//!
//! Folds the deltas of one streamed exchange into its placeholder message:
//!
//! ```text
//! STREAMING --Delta--> STREAMING --Completed / end of stream--> FINALIZED
//!                                \--Failed-------------------> FAILED
//! ```
//!
//! Each fragment is written to the store (and announced on the bus) before
//! the next one is pulled, so the store is re-read on every step and a
//! conversation deleted mid-stream is noticed on the next fragment.

use futures::{Stream, StreamExt};

use chat_types::{
    config::STREAM_ERROR_TEXT,
    conversation::ConversationId,
    event::{ChatEvent, StreamOutcome},
    message::MessageId,
};
use crate::event_bus::EventBus;
use crate::ports::ChatStreamEvent;
use crate::store::{MessagePatch, SharedStore, UpdateOutcome};

/// The placeholder a stream is merged into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTarget {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
}

pub struct StreamMerger {
    store: SharedStore,
    event_bus: EventBus,
    error_text: String,
}

impl StreamMerger {
    pub fn new(store: SharedStore, event_bus: EventBus) -> Self {
        Self {
            store,
            event_bus,
            error_text: STREAM_ERROR_TEXT.to_string(),
        }
    }

    pub fn with_error_text(mut self, text: impl Into<String>) -> Self {
        self.error_text = text.into();
        self
    }

    /// Drive `stream` to its end (or until the target goes away).
    /// Never fails: every problem ends up in the returned outcome.
    pub async fn merge<S>(&self, target: &MessageTarget, mut stream: S) -> StreamOutcome
    where
        S: Stream<Item = ChatStreamEvent> + Unpin,
    {
        while let Some(event) = stream.next().await {
            match event {
                ChatStreamEvent::Delta(fragment) => {
                    match self.patch(target, MessagePatch::AppendDelta(fragment)) {
                        UpdateOutcome::Applied => {
                            self.event_bus.emit(ChatEvent::MessageUpdated {
                                conversation_id: target.conversation_id.clone(),
                                message_id: target.message_id.clone(),
                            });
                        }
                        UpdateOutcome::StaleTarget | UpdateOutcome::Immutable => {
                            log::warn!(
                                "Dropping stream for {}/{}: target no longer open",
                                target.conversation_id,
                                target.message_id
                            );
                            return self.finish(target, StreamOutcome::Abandoned);
                        }
                    }
                }
                ChatStreamEvent::Completed => {
                    return self.settle(target, MessagePatch::Finalize, StreamOutcome::Finalized);
                }
                ChatStreamEvent::Failed(reason) => {
                    log::error!("Chat stream failed: {}", reason);
                    return self.settle(
                        target,
                        MessagePatch::Fail(self.error_text.clone()),
                        StreamOutcome::Failed { reason },
                    );
                }
            }
        }

        // The transport closed without a terminal event
        self.settle(target, MessagePatch::Finalize, StreamOutcome::Finalized)
    }

    fn patch(&self, target: &MessageTarget, patch: MessagePatch) -> UpdateOutcome {
        self.store
            .update_message(&target.conversation_id, &target.message_id, patch)
    }

    /// Apply the terminal patch; a vanished target turns into `Abandoned`
    fn settle(
        &self,
        target: &MessageTarget,
        patch: MessagePatch,
        outcome: StreamOutcome,
    ) -> StreamOutcome {
        let outcome = match self.patch(target, patch) {
            UpdateOutcome::Applied => outcome,
            UpdateOutcome::StaleTarget | UpdateOutcome::Immutable => StreamOutcome::Abandoned,
        };
        self.finish(target, outcome)
    }

    fn finish(&self, target: &MessageTarget, outcome: StreamOutcome) -> StreamOutcome {
        log::info!(
            "Stream for {}/{} finished: {:?}",
            target.conversation_id,
            target.message_id,
            outcome
        );
        self.event_bus.emit(ChatEvent::StreamFinished {
            conversation_id: target.conversation_id.clone(),
            message_id: target.message_id.clone(),
            outcome: outcome.clone(),
        });
        outcome
    }
}
