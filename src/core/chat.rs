//! Chat engine
//!
//! The ChatEngine owns the conversation and drives one send at a time:
//! 1. Validates and records the user's message
//! 2. Opens a pending assistant reply
//! 3. Streams the reply from the backend, appending each fragment
//! 4. Finalizes the reply, or replaces it with an apology on failure

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::Instrument;

use crate::config::prompts;
use crate::conversation::{Conversation, Finish, Message, MessageId, StoreError};
use crate::providers::{ReplyBackend, ReplyRequest};

use super::reply;

/// Where the current (or last) send is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    /// Submitted, waiting for the first fragment
    Sending,
    Streaming,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Failed,
}

impl From<SendOutcome> for SendState {
    fn from(outcome: SendOutcome) -> Self {
        match outcome {
            SendOutcome::Completed => SendState::Completed,
            SendOutcome::Failed => SendState::Failed,
        }
    }
}

/// Progress notifications for whoever renders the transcript
#[derive(Debug)]
pub enum ReplyEvent<'a> {
    State(SendState),
    Fragment(&'a str),
    Finalized(&'a Message),
}

pub trait ReplyObserver {
    fn on_event(&mut self, event: ReplyEvent<'_>);
}

impl ReplyObserver for () {
    fn on_event(&mut self, _event: ReplyEvent<'_>) {}
}

/// Errors from the chat engine
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message rejected: {0}")]
    Rejected(#[from] StoreError),
}

/// An accepted submission whose reply has not been streamed yet
#[must_use = "the reply stays pending until the ticket is streamed"]
#[derive(Debug)]
pub struct ReplyTicket {
    reply_id: MessageId,
    request: ReplyRequest,
}

impl ReplyTicket {
    pub fn reply_id(&self) -> MessageId {
        self.reply_id
    }

    pub fn request(&self) -> &ReplyRequest {
        &self.request
    }
}

pub struct ChatEngine {
    conversation: Conversation,
    backend: Arc<dyn ReplyBackend>,
    reply_timeout: Option<Duration>,
    state: SendState,
}

impl ChatEngine {
    /// Create an engine with a fresh conversation seeded with the welcome message
    pub fn new(backend: Arc<dyn ReplyBackend>, reply_timeout: Option<Duration>) -> Self {
        Self::with_conversation(
            Conversation::new().with_welcome(prompts::WELCOME),
            backend,
            reply_timeout,
        )
    }

    pub fn with_conversation(
        conversation: Conversation,
        backend: Arc<dyn ReplyBackend>,
        reply_timeout: Option<Duration>,
    ) -> Self {
        Self {
            conversation,
            backend,
            reply_timeout,
            state: SendState::Idle,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> SendState {
        self.state
    }

    /// True between a submission and its terminal state
    pub fn is_busy(&self) -> bool {
        matches!(self.state, SendState::Sending | SendState::Streaming)
    }

    /// Record the user's message and open a pending reply for it.
    ///
    /// The returned ticket carries the history as it was before this
    /// message; the message itself travels separately.
    pub fn submit(&mut self, text: &str) -> Result<ReplyTicket, ChatError> {
        let history = self.conversation.history();
        self.conversation.append_user_message(text)?;
        let reply_id = self.conversation.begin_assistant_reply()?;
        self.state = SendState::Sending;

        tracing::debug!(
            conversation = %self.conversation.id(),
            reply = %reply_id,
            turns = history.len(),
            "Message accepted"
        );

        Ok(ReplyTicket {
            reply_id,
            request: ReplyRequest {
                history,
                new_message: text.to_string(),
            },
        })
    }

    /// Stream the reply for `ticket` to completion or failure
    pub async fn stream(
        &mut self,
        ticket: ReplyTicket,
        observer: &mut dyn ReplyObserver,
    ) -> SendOutcome {
        let span = tracing::info_span!(
            "reply",
            conversation = %self.conversation.id(),
            reply = %ticket.reply_id
        );
        self.drive(ticket, observer).instrument(span).await
    }

    /// Submit `text` and stream its reply
    pub async fn send(
        &mut self,
        text: &str,
        observer: &mut dyn ReplyObserver,
    ) -> Result<SendOutcome, ChatError> {
        let ticket = self.submit(text)?;
        Ok(self.stream(ticket, observer).await)
    }

    async fn drive(&mut self, ticket: ReplyTicket, observer: &mut dyn ReplyObserver) -> SendOutcome {
        let ReplyTicket { reply_id, request } = ticket;
        observer.on_event(ReplyEvent::State(self.state));

        let backend = Arc::clone(&self.backend);
        let mut fragments = reply::stream_reply(backend.as_ref(), request, self.reply_timeout);
        let mut received = 0usize;

        let failure = loop {
            match fragments.next().await {
                Some(Ok(fragment)) => {
                    if received == 0 {
                        self.set_state(SendState::Streaming, observer);
                    }
                    received += 1;

                    match self.conversation.append_fragment(reply_id, &fragment) {
                        Ok(()) => observer.on_event(ReplyEvent::Fragment(&fragment)),
                        Err(e) => tracing::debug!("Discarding stale fragment: {}", e),
                    }
                }
                Some(Err(e)) => break Some(e),
                None => break None,
            }
        };

        let (finish, outcome) = match failure {
            None => {
                tracing::info!(fragments = received, "Reply completed");
                (Finish::Complete, SendOutcome::Completed)
            }
            Some(e) => {
                tracing::warn!(fragments = received, error = %e, "Reply failed");
                (Finish::Fallback(prompts::APOLOGY.to_string()), SendOutcome::Failed)
            }
        };

        match self.conversation.finalize(reply_id, finish) {
            Ok(true) => {}
            Ok(false) => tracing::debug!("Reply was already finalized"),
            Err(e) => tracing::debug!("Cannot finalize reply: {}", e),
        }

        self.set_state(outcome.into(), observer);
        if let Some(message) = self.conversation.get(reply_id) {
            observer.on_event(ReplyEvent::Finalized(message));
        }
        outcome
    }

    fn set_state(&mut self, state: SendState, observer: &mut dyn ReplyObserver) {
        self.state = state;
        observer.on_event(ReplyEvent::State(state));
    }
}
