//! Message rendering surface.
//!
//! The chat session never touches HTML buffers directly; it drives a
//! [`RenderSurface`] with append/remove/clear calls. [`HtmlSurface`] is the
//! production implementation backing the HTMX fragments served by
//! [`crate::server`]; tests substitute a recording double to observe call
//! order without any markup involved.

use std::fmt::Write as _;
use std::sync::Mutex;

use crate::markup;

/// Element id of the transient typing indicator. At most one exists at a time.
pub const TYPING_INDICATOR_ID: &str = "typing-indicator";

/// Avatar glyph shown next to advisor messages.
const AI_AVATAR: char = '\u{1F916}';

/// Which half of an exchange a rendered message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    /// Typed by the user.
    User,
    /// Produced by the advisor (or a local stand-in, e.g. the failure notice).
    Ai,
}

impl Sender {
    /// CSS modifier class for the message row.
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Self::User => "message-user",
            Self::Ai => "message-ai",
        }
    }
}

/// One rendered chat bubble.
///
/// Transient: regenerated from the transcript on restore, never persisted.
/// The body is already HTML-safe when the message is constructed.
#[derive(Debug, Clone)]
pub struct DisplayMessage {
    /// Stable element id, used for targeted removal.
    pub id: String,
    /// Sender half.
    pub sender: Sender,
    /// HTML-safe body fragment.
    pub body_html: String,
    /// Formatted wall-clock time; empty for the typing indicator.
    pub timestamp: String,
    /// Avatar glyph rendered beside the bubble.
    pub avatar: String,
}

impl DisplayMessage {
    /// A user message. The text is escaped verbatim, no markdown applies.
    #[must_use]
    pub fn user(text: &str, initial: char) -> Self {
        Self {
            id: fresh_id(),
            sender: Sender::User,
            body_html: markup::escape_html(text),
            timestamp: now_label(),
            avatar: initial.to_string(),
        }
    }

    /// An advisor message, run through the markdown-lite formatter.
    #[must_use]
    pub fn ai(text: &str) -> Self {
        Self {
            id: fresh_id(),
            sender: Sender::Ai,
            body_html: markup::format_for_display(text),
            timestamp: now_label(),
            avatar: AI_AVATAR.to_string(),
        }
    }

    /// The transient typing indicator.
    #[must_use]
    pub fn typing() -> Self {
        Self {
            id: TYPING_INDICATOR_ID.to_string(),
            sender: Sender::Ai,
            body_html: r#"<div class="typing-dots"><span></span><span></span><span></span></div>"#
                .to_string(),
            timestamp: String::new(),
            avatar: AI_AVATAR.to_string(),
        }
    }
}

fn fresh_id() -> String {
    format!("msg-{}", uuid::Uuid::new_v4())
}

fn now_label() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

/// Output sink for the chat session.
///
/// Mirrors the operations the session performs against the page: append a
/// bubble, remove one by id, wipe the list, toggle the empty-state
/// placeholder and the submit control, clear the input, scroll to the newest
/// entry. Interior mutability so surfaces can be shared behind `Arc`.
pub trait RenderSurface: Send + Sync {
    /// Append a message to the end of the list.
    fn append(&self, message: DisplayMessage);
    /// Remove the message with the given element id, if present.
    fn remove(&self, id: &str);
    /// Remove every message.
    fn clear(&self);
    /// Show or hide the empty-state placeholder.
    fn set_placeholder_visible(&self, visible: bool);
    /// Enable or disable the submit control.
    fn set_input_enabled(&self, enabled: bool);
    /// Empty the input field.
    fn clear_input(&self);
    /// Scroll the list so the newest entry is visible.
    fn scroll_to_latest(&self);
}

#[derive(Debug)]
struct SurfaceState {
    messages: Vec<DisplayMessage>,
    placeholder_visible: bool,
    input_enabled: bool,
}

/// Server-side rendering surface.
///
/// Accumulates the message list in memory and serializes it to the HTMX
/// fragment swapped into the page. Input clearing and scrolling are client
/// effects of the swap itself, so those calls only need to be accepted here.
#[derive(Debug)]
pub struct HtmlSurface {
    state: Mutex<SurfaceState>,
}

impl Default for HtmlSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSurface {
    /// Create an empty surface with the placeholder showing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                messages: Vec::new(),
                placeholder_visible: true,
                input_enabled: true,
            }),
        }
    }

    /// Number of rendered messages (the typing indicator included while shown).
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    /// Whether the empty-state placeholder is showing.
    #[must_use]
    pub fn placeholder_visible(&self) -> bool {
        self.state.lock().unwrap().placeholder_visible
    }

    /// Render the message area as an HTML fragment.
    #[must_use]
    pub fn fragment(&self) -> String {
        let state = self.state.lock().unwrap();
        let mut out = String::new();
        if state.placeholder_visible {
            out.push_str(WELCOME_HTML);
        }
        for message in &state.messages {
            render_message(&mut out, message);
        }
        out
    }
}

impl RenderSurface for HtmlSurface {
    fn append(&self, message: DisplayMessage) {
        self.state.lock().unwrap().messages.push(message);
    }

    fn remove(&self, id: &str) {
        self.state.lock().unwrap().messages.retain(|m| m.id != id);
    }

    fn clear(&self) {
        self.state.lock().unwrap().messages.clear();
    }

    fn set_placeholder_visible(&self, visible: bool) {
        self.state.lock().unwrap().placeholder_visible = visible;
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().input_enabled = enabled;
    }

    fn clear_input(&self) {
        // The input lives client-side; the fragment swap resets it.
    }

    fn scroll_to_latest(&self) {
        // Handled client-side by the scroll anchor in the fragment container.
    }
}

/// Empty-state welcome card with starter questions.
const WELCOME_HTML: &str = r##"<div id="chat-welcome" class="chat-welcome">
    <div class="welcome-avatar">🤖</div>
    <h2>Hi, I'm ChengeAI</h2>
    <p>Ask me anything about your budget, spending, or savings goals.</p>
    <div class="suggested-questions">
        <button type="button" class="suggested-question"
            hx-post="/api/chat" hx-ext="json-enc" hx-target="#messages-area"
            hx-vals='{"message": "How am I doing with my budget this month?"}'>
            How am I doing with my budget this month?
        </button>
        <button type="button" class="suggested-question"
            hx-post="/api/chat" hx-ext="json-enc" hx-target="#messages-area"
            hx-vals='{"message": "Where can I cut back on spending?"}'>
            Where can I cut back on spending?
        </button>
        <button type="button" class="suggested-question"
            hx-post="/api/chat" hx-ext="json-enc" hx-target="#messages-area"
            hx-vals='{"message": "How much should I be saving each month?"}'>
            How much should I be saving each month?
        </button>
    </div>
</div>"##;

fn render_message(out: &mut String, message: &DisplayMessage) {
    let time_html = if message.timestamp.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="message-time">{}</div>"#, message.timestamp)
    };
    let avatar_html = format!(r#"<div class="message-avatar">{}</div>"#, message.avatar);
    let content_html = format!(
        r#"<div class="message-content"><div class="message-bubble">{}</div>{}</div>"#,
        message.body_html, time_html
    );
    // User rows put the avatar on the right, advisor rows on the left.
    let (left, right) = match message.sender {
        Sender::User => (content_html, avatar_html),
        Sender::Ai => (avatar_html, content_html),
    };
    let _ = write!(
        out,
        r#"<div class="message {}" id="{}">{}{}</div>"#,
        message.sender.css_class(),
        message.id,
        left,
        right
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_surface_shows_placeholder() {
        let surface = HtmlSurface::new();
        assert!(surface.placeholder_visible());
        assert!(surface.fragment().contains("chat-welcome"));
    }

    #[test]
    fn test_append_and_remove_by_id() {
        let surface = HtmlSurface::new();
        surface.append(DisplayMessage::user("hello", 'A'));
        surface.append(DisplayMessage::typing());
        assert_eq!(surface.message_count(), 2);

        surface.remove(TYPING_INDICATOR_ID);
        assert_eq!(surface.message_count(), 1);
        assert!(!surface.fragment().contains("typing-dots"));
    }

    #[test]
    fn test_fragment_renders_messages_in_order() {
        let surface = HtmlSurface::new();
        surface.set_placeholder_visible(false);
        surface.append(DisplayMessage::user("question", 'Z'));
        surface.append(DisplayMessage::ai("answer"));

        let html = surface.fragment();
        let user_at = html.find("question").unwrap();
        let ai_at = html.find("answer").unwrap();
        assert!(user_at < ai_at);
        assert!(html.contains("message-user"));
        assert!(html.contains("message-ai"));
        assert!(!html.contains("chat-welcome"));
    }

    #[test]
    fn test_user_message_body_is_escaped() {
        let surface = HtmlSurface::new();
        surface.append(DisplayMessage::user("<b>hi</b>", 'U'));
        let html = surface.fragment();
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(!html.contains("<b>hi</b>"));
    }

    #[test]
    fn test_clear_empties_the_list() {
        let surface = HtmlSurface::new();
        surface.append(DisplayMessage::ai("bye"));
        surface.clear();
        assert_eq!(surface.message_count(), 0);
    }

    #[test]
    fn test_typing_indicator_has_no_timestamp() {
        let msg = DisplayMessage::typing();
        assert!(msg.timestamp.is_empty());
        assert_eq!(msg.id, TYPING_INDICATOR_ID);
    }
}
