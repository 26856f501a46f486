//! HTTP surface for the advisor chat.
//!
//! Server-rendered shell plus HTMX fragment endpoints. Every chat route
//! resolves a [`crate::session::ChatSession`] by the client-held session id
//! and answers with the refreshed message-list fragment; the session id
//! itself travels back in an out-of-band hidden input.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::session::ChatHandle;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/chat", post(api_chat))
        .route("/api/chat/clear", post(api_chat_clear))
        .route("/api/chat/messages", get(api_chat_messages))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page
// ─────────────────────────────────────────────────────────────────────────────

/// Generate the HTML shell for the application.
fn html_shell(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="ChengeAI Financial Advisor">
    <title>{title} - ChengeAI</title>

    <script src="https://unpkg.com/htmx.org@2.0.8"></script>
    <script src="https://unpkg.com/htmx-ext-json-enc@2.0.2"></script>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/water.css@2/out/water.css">
</head>
<body>
    <header>
        <nav>
            <a href="/"><strong>ChengeAI</strong></a>
        </nav>
    </header>
    <main id="app">
        {content}
    </main>
</body>
</html>"#
    )
}

/// Advisor chat page content.
fn chat_content() -> &'static str {
    r##"
    <div class="chat-shell">
        <header class="chat-header">
            <h2>AI Financial Advisor</h2>
            <button type="button" class="clear-chat"
                hx-post="/api/chat/clear" hx-ext="json-enc"
                hx-include="#session-id" hx-target="#messages-area"
                hx-confirm="Clear chat history?">
                Clear chat
            </button>
        </header>

        <div id="messages-area" aria-live="polite" aria-label="Chat messages"
            hx-get="/api/chat/messages" hx-trigger="load"
            hx-include="#session-id">
        </div>

        <form id="chat-form"
            hx-post="/api/chat" hx-ext="json-enc"
            hx-include="#session-id" hx-target="#messages-area"
            hx-disabled-elt="find button[type='submit']"
            hx-on--after-request="this.reset(); document.getElementById('messages-area').scrollTop = 1e9;">
            <input type="hidden" id="session-id" name="session_id" value="">
            <input id="chat-input" name="message" autocomplete="off"
                placeholder="Ask about your budget, spending, savings..." required>
            <button type="submit">Send</button>
        </form>
    </div>
    "##
}

/// Index page handler.
async fn index_handler() -> impl IntoResponse {
    Html(html_shell("Advisor", chat_content()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Fragment Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for the chat endpoint.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    /// User message content.
    message: String,
    /// Session id; a new session is minted when absent or not a UUID.
    #[serde(default)]
    session_id: Option<String>,
}

/// Request body for clear and the messages query.
#[derive(Debug, Deserialize)]
struct SessionRef {
    #[serde(default)]
    session_id: Option<String>,
}

/// POST /api/chat - run one send and return the refreshed fragment.
async fn api_chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Html<String> {
    let handle = resolve(&state, req.session_id.as_deref()).await;
    handle.session.ensure_user_initial().await;

    let outcome = handle.session.send(&req.message).await;
    info!(
        session_id = %handle.session.id(),
        outcome = ?outcome,
        "Chat request processed"
    );
    fragment_response(&handle)
}

/// POST /api/chat/clear - confirmed wipe of transcript and storage.
///
/// The confirmation prompt lives client-side (`hx-confirm`); reaching this
/// endpoint is the confirmation.
async fn api_chat_clear(
    State(state): State<AppState>,
    Json(req): Json<SessionRef>,
) -> Html<String> {
    let handle = resolve(&state, req.session_id.as_deref()).await;
    handle.session.clear(true);
    fragment_response(&handle)
}

/// GET /api/chat/messages - current fragment, replaying any restored history.
async fn api_chat_messages(
    State(state): State<AppState>,
    Query(req): Query<SessionRef>,
) -> Html<String> {
    let handle = resolve(&state, req.session_id.as_deref()).await;
    handle.session.ensure_user_initial().await;
    fragment_response(&handle)
}

/// Look up the session named by the client, minting one when the id is
/// absent or not a UUID.
///
/// Only parsed ids reach the session map (and, through the out-of-band
/// input, the response markup), so a hostile `session_id` is never
/// reflected.
async fn resolve(state: &AppState, session_id: Option<&str>) -> ChatHandle {
    if let Some(id) = session_id.and_then(|id| uuid::Uuid::parse_str(id.trim()).ok()) {
        return state.sessions.get_or_create(&id.to_string()).await;
    }
    let handle = state.sessions.create().await;
    info!(session_id = %handle.session.id(), "Created new chat session");
    handle
}

/// Message-list fragment plus the out-of-band session id input.
fn fragment_response(handle: &ChatHandle) -> Html<String> {
    let oob = format!(
        r#"<input type="hidden" id="session-id" name="session_id" value="{}" hx-swap-oob="true">"#,
        handle.session.id()
    );
    Html(format!("{}{oob}", handle.surface.fragment()))
}
