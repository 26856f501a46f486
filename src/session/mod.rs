//! Chat session and transcript management.
//!
//! One [`ChatSession`] per browsing session: it owns the rolling transcript,
//! renders into a [`crate::render::RenderSurface`], persists through
//! session-scoped storage, and coordinates the round trip with the advisor
//! backend.
//!
//! # Architecture
//!
//! - [`Exchange`] / [`Transcript`]: the conversation data, oldest first
//! - [`SessionStorage`] / [`TranscriptStore`]: session-scoped persistence
//! - [`ChatSession`]: restore / send / clear lifecycle
//! - [`ChatSessionStore`]: thread-safe lookup of sessions by id

mod chat;
mod transcript;

pub use chat::{
    CHAT_FAILURE_MESSAGE, ChatHandle, ChatSession, ChatSessionStore, DEFAULT_SESSION_TIMEOUT,
    SendOutcome,
};
pub use transcript::{Exchange, HISTORY_WINDOW, SessionStorage, Transcript, TranscriptStore};
