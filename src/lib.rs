//! ChengeAI Advisor Chat
//!
//! Server-rendered front end for the ChengeAI personal-finance application's
//! AI chat advisor. Renders the conversation as HTMX fragments, keeps one
//! transcript per browsing session, and mediates the round trip to the
//! finance backend's advisor endpoint.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server returning HTML fragments
//! - **Session**: per-browsing-session transcript with rolling context window
//! - **Backend client**: `reqwest` JSON client behind a trait seam
//! - **Rendering**: surface abstraction over the message list
//!
//! # Modules
//!
//! - [`backend`]: finance backend client
//! - [`config`]: layered configuration
//! - [`markup`]: markdown-lite message formatting
//! - [`render`]: display messages and rendering surfaces
//! - [`server`]: router and fragment handlers
//! - [`session`]: transcript, persistence, and session lifecycle

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod backend;
pub mod config;
pub mod markup;
pub mod render;
pub mod server;
pub mod session;

use session::ChatSessionStore;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session store for conversation management.
    pub sessions: ChatSessionStore,
}
