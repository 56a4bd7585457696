//! Conversation types and state management
//!
//! A [`Conversation`] is the in-memory transcript of one session. It is
//! append-only: the only mutation allowed after a message is pushed is growing
//! the text of the single pending assistant reply and finalizing it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifier of a message, unique and increasing within one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    speaker: Speaker,
    text: String,
    created_at: DateTime<Utc>,
    pending: bool,
}

impl Message {
    fn new(id: MessageId, speaker: Speaker, text: String, pending: bool) -> Self {
        Self {
            id,
            speaker,
            text,
            created_at: Utc::now(),
            pending,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether this assistant reply is still receiving fragments
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// A finalized turn as handed to the model backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// How a pending reply is closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finish {
    /// Keep the accumulated text
    Complete,
    /// Replace the accumulated text with a fallback
    Fallback(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Message is empty")]
    EmptyInput,

    #[error("A reply is already in progress")]
    ReplyPending,

    #[error("Unknown message: {0}")]
    UnknownMessage(MessageId),

    #[error("Message already finalized: {0}")]
    AlreadyFinalized(MessageId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: Uuid,
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            next_id: 0,
        }
    }

    /// Seed the conversation with a finalized assistant greeting
    pub fn with_welcome(mut self, text: &str) -> Self {
        let id = self.allocate_id();
        self.messages
            .push(Message::new(id, Speaker::Assistant, text.to_string(), false));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.position(id).map(|idx| &self.messages[idx])
    }

    /// The assistant reply currently receiving fragments, if any
    pub fn pending(&self) -> Option<&Message> {
        // Only the newest message can be pending.
        self.messages.last().filter(|m| m.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// Every finalized turn, in display order
    pub fn history(&self) -> Vec<Turn> {
        self.messages
            .iter()
            .filter(|m| !m.pending)
            .map(|m| Turn {
                speaker: m.speaker,
                text: m.text.clone(),
            })
            .collect()
    }

    pub fn append_user_message(&mut self, text: &str) -> Result<MessageId, StoreError> {
        if text.trim().is_empty() {
            return Err(StoreError::EmptyInput);
        }
        if self.is_pending() {
            return Err(StoreError::ReplyPending);
        }

        let id = self.allocate_id();
        self.messages
            .push(Message::new(id, Speaker::User, text.to_string(), false));
        Ok(id)
    }

    /// Push an empty, pending assistant message and return its id
    pub fn begin_assistant_reply(&mut self) -> Result<MessageId, StoreError> {
        if self.is_pending() {
            return Err(StoreError::ReplyPending);
        }

        let id = self.allocate_id();
        self.messages
            .push(Message::new(id, Speaker::Assistant, String::new(), true));
        Ok(id)
    }

    pub fn append_fragment(&mut self, id: MessageId, fragment: &str) -> Result<(), StoreError> {
        let message = self.message_mut(id)?;
        if !message.pending {
            return Err(StoreError::AlreadyFinalized(id));
        }
        message.text.push_str(fragment);
        Ok(())
    }

    /// Close a pending reply.
    ///
    /// Returns `Ok(false)` without touching anything if the message was
    /// already finalized.
    pub fn finalize(&mut self, id: MessageId, finish: Finish) -> Result<bool, StoreError> {
        let message = self.message_mut(id)?;
        if !message.pending {
            return Ok(false);
        }

        if let Finish::Fallback(text) = finish {
            message.text = text;
        }
        message.pending = false;
        Ok(true)
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        // Ids are allocated in push order, so the vector is sorted by id.
        self.messages.binary_search_by_key(&id, |m| m.id).ok()
    }

    fn message_mut(&mut self, id: MessageId) -> Result<&mut Message, StoreError> {
        let idx = self.position(id).ok_or(StoreError::UnknownMessage(id))?;
        Ok(&mut self.messages[idx])
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
