//! Core chat components
//!
//! This module contains the reply pipeline: the streaming adapter and the
//! engine that applies its fragments to the conversation.

mod chat;
mod reply;

pub use chat::{ChatEngine, ChatError, ReplyEvent, ReplyObserver, SendState};
