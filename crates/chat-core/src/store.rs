//! Conversation store: the single owner of conversation state.
//!
//! Every change goes through [`ConversationStore::apply`] (or the direct
//! methods it dispatches to) and can be observed as an immutable
//! [`StoreSnapshot`]. Conversations and messages are `Rc`-shared with the
//! snapshots and copied on write, so an update touches exactly one message
//! and leaves every other pointer untouched.

use std::cell::RefCell;
use std::rc::Rc;

use chat_types::{
    ChatError, Result,
    conversation::{default_title, Conversation, ConversationId},
    message::{Message, MessageId},
};

/// A change to the store
#[derive(Debug, Clone)]
pub enum StoreCommand {
    /// `None` picks the default "对话 N" title
    CreateConversation { title: Option<String> },
    DeleteConversation { conversation_id: ConversationId },
    SelectConversation { conversation_id: ConversationId },
    AppendMessages { conversation_id: ConversationId, messages: Vec<Message> },
    UpdateMessage {
        conversation_id: ConversationId,
        message_id: MessageId,
        patch: MessagePatch,
    },
}

/// Allowed mutations of an open (streaming) AI message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePatch {
    /// `content += fragment`
    AppendDelta(String),
    /// Close the message; content becomes immutable
    Finalize,
    /// Replace content with an error text and close the message
    Fail(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The conversation or the message no longer exists
    StaleTarget,
    /// User message, or an AI message that was already closed
    Immutable,
}

/// Immutable view of the store at one point in time
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    conversations: Vec<Rc<Conversation>>,
    active: Option<ConversationId>,
}

impl StoreSnapshot {
    pub fn conversations(&self) -> &[Rc<Conversation>] {
        &self.conversations
    }

    pub fn conversation(&self, id: &ConversationId) -> Option<&Rc<Conversation>> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    pub fn active_conversation(&self) -> Option<&Rc<Conversation>> {
        self.active.as_ref().and_then(|id| self.conversation(id))
    }

    pub fn active_index(&self) -> Option<usize> {
        let id = self.active.as_ref()?;
        self.conversations.iter().position(|c| &c.id == id)
    }

    /// Messages of the active conversation, empty when nothing is selected
    pub fn active_messages(&self) -> &[Rc<Message>] {
        self.active_conversation()
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct ConversationStore {
    conversations: Vec<Rc<Conversation>>,
    active: Option<ConversationId>,
    last_issued: i64,
    clock: fn() -> i64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_clock(now_millis)
    }

    /// Store whose ids are derived from `clock` (milliseconds)
    pub fn with_clock(clock: fn() -> i64) -> Self {
        Self {
            conversations: Vec::new(),
            active: None,
            last_issued: i64::MIN,
            clock,
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            conversations: self.conversations.clone(),
            active: self.active.clone(),
        }
    }

    /// Apply one command and return the resulting snapshot
    pub fn apply(&mut self, command: StoreCommand) -> Result<StoreSnapshot> {
        match command {
            StoreCommand::CreateConversation { title } => {
                self.create_conversation(title);
            }
            StoreCommand::DeleteConversation { conversation_id } => {
                self.delete_conversation(&conversation_id);
            }
            StoreCommand::SelectConversation { conversation_id } => {
                if !self.select_conversation(&conversation_id) {
                    return Err(ChatError::Store(format!(
                        "no conversation {}",
                        conversation_id
                    )));
                }
            }
            StoreCommand::AppendMessages { conversation_id, messages } => {
                self.append_messages(&conversation_id, messages)?;
            }
            StoreCommand::UpdateMessage { conversation_id, message_id, patch } => {
                self.update_message(&conversation_id, &message_id, patch);
            }
        }
        Ok(self.snapshot())
    }

    /// Create a conversation at the end of the list and select it
    pub fn create_conversation(&mut self, title: Option<String>) -> ConversationId {
        let id = self.next_id();
        let title = title.unwrap_or_else(|| default_title(self.conversations.len() + 1));
        self.conversations
            .push(Rc::new(Conversation::new(id.clone(), title)));
        self.active = Some(id.clone());
        log::debug!("Created conversation {}", id);
        id
    }

    /// Remove a conversation. When it was the active one, the first
    /// remaining conversation (or none) becomes active.
    pub fn delete_conversation(&mut self, id: &ConversationId) -> bool {
        let Some(pos) = self.conversations.iter().position(|c| &c.id == id) else {
            return false;
        };
        self.conversations.remove(pos);

        if self.active.as_ref() == Some(id) {
            self.active = self.conversations.first().map(|c| c.id.clone());
        }
        log::debug!("Deleted conversation {}", id);
        true
    }

    pub fn select_conversation(&mut self, id: &ConversationId) -> bool {
        if self.conversations.iter().any(|c| &c.id == id) {
            self.active = Some(id.clone());
            true
        } else {
            false
        }
    }

    /// Append messages in order. Refuses a second open placeholder in the
    /// same conversation.
    pub fn append_messages(
        &mut self,
        id: &ConversationId,
        messages: Vec<Message>,
    ) -> Result<()> {
        let conv = self
            .conversations
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| ChatError::Store(format!("no conversation {}", id)))?;

        let opening = messages.iter().filter(|m| m.is_open()).count();
        if opening > 1 || (opening == 1 && conv.is_streaming()) {
            return Err(ChatError::Busy);
        }

        Rc::make_mut(conv)
            .messages
            .extend(messages.into_iter().map(Rc::new));
        Ok(())
    }

    /// Patch exactly one message; everything else keeps its identity
    pub fn update_message(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        patch: MessagePatch,
    ) -> UpdateOutcome {
        let Some(conv) = self
            .conversations
            .iter_mut()
            .find(|c| &c.id == conversation_id)
        else {
            return UpdateOutcome::StaleTarget;
        };
        let Some(idx) = conv.messages.iter().position(|m| &m.id == message_id) else {
            return UpdateOutcome::StaleTarget;
        };
        if !conv.messages[idx].is_open() {
            return UpdateOutcome::Immutable;
        }

        let conv = Rc::make_mut(conv);
        let msg = Rc::make_mut(&mut conv.messages[idx]);
        match patch {
            MessagePatch::AppendDelta(fragment) => msg.content.push_str(&fragment),
            MessagePatch::Finalize => msg.is_streaming = false,
            MessagePatch::Fail(text) => {
                msg.content = text;
                msg.is_streaming = false;
            }
        }
        UpdateOutcome::Applied
    }

    fn next_id(&mut self) -> ConversationId {
        let now = (self.clock)();
        let millis = if now > self.last_issued {
            now
        } else {
            self.last_issued + 1
        };
        self.last_issued = millis;
        ConversationId::from_millis(millis)
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Store shared between the UI and in-flight async work: clone-cheap.
///
/// Borrows never outlive a method call, so an await point can never
/// observe a half-applied update.
#[derive(Clone, Default)]
pub struct SharedStore {
    inner: Rc<RefCell<ConversationStore>>,
}

impl SharedStore {
    pub fn new(store: ConversationStore) -> Self {
        Self {
            inner: Rc::new(RefCell::new(store)),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.borrow().snapshot()
    }

    pub fn apply(&self, command: StoreCommand) -> Result<StoreSnapshot> {
        self.inner.borrow_mut().apply(command)
    }

    pub fn create_conversation(&self, title: Option<String>) -> ConversationId {
        self.inner.borrow_mut().create_conversation(title)
    }

    pub fn delete_conversation(&self, id: &ConversationId) -> bool {
        self.inner.borrow_mut().delete_conversation(id)
    }

    pub fn select_conversation(&self, id: &ConversationId) -> bool {
        self.inner.borrow_mut().select_conversation(id)
    }

    pub fn append_messages(&self, id: &ConversationId, messages: Vec<Message>) -> Result<()> {
        self.inner.borrow_mut().append_messages(id, messages)
    }

    pub fn update_message(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        patch: MessagePatch,
    ) -> UpdateOutcome {
        self.inner
            .borrow_mut()
            .update_message(conversation_id, message_id, patch)
    }
}
