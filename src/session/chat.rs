//! Chat session lifecycle.
//!
//! A [`ChatSession`] owns one browsing session's transcript, drives a
//! [`RenderSurface`] with the on-screen representation, persists the
//! transcript through a [`TranscriptStore`], and mediates the round trip to
//! the advisor backend. [`ChatSessionStore`] hands out sessions by id, one
//! per browsing session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::backend::{AdvisorBackend, DEFAULT_INITIAL};
use crate::render::{DisplayMessage, HtmlSurface, RenderSurface, TYPING_INDICATOR_ID};
use crate::session::transcript::{Exchange, SessionStorage, Transcript, TranscriptStore};

/// The one user-facing string for any failed round trip. Raw error detail is
/// logged, never rendered.
pub const CHAT_FAILURE_MESSAGE: &str = "Sorry, I'm having trouble connecting. Please try again.";

/// How long a session may sit idle before the eviction sweep drops it.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// What a call to [`ChatSession::send`] amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was empty after trimming; nothing happened.
    Ignored,
    /// Another request is in flight; this one was dropped.
    Busy,
    /// Round trip succeeded and the exchange was appended.
    Replied,
    /// Round trip failed; the transcript is unchanged.
    Failed,
}

/// A single conversation session.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<ChatSessionInner>,
}

struct ChatSessionInner {
    id: String,
    transcript: RwLock<Transcript>,
    /// Single-slot request token: a `send` that arrives while another is
    /// outstanding is dropped, not queued.
    in_flight: AtomicBool,
    /// Avatar initial, fetched once per session; `None` until then.
    user_initial: RwLock<Option<char>>,
    backend: Arc<dyn AdvisorBackend>,
    store: Arc<dyn TranscriptStore>,
    surface: Arc<dyn RenderSurface>,
}

/// Holds the session's single request slot for the duration of one `send`.
///
/// [`Self::release`] frees the slot on the normal paths. Dropping an armed
/// slot means the handler future was cancelled mid-request (the client
/// disconnected), so the drop unwinds the surface too: stale typing indicator
/// removed, submit control re-enabled.
struct SendSlot<'a> {
    inner: &'a ChatSessionInner,
    armed: bool,
}

impl<'a> SendSlot<'a> {
    fn acquire(inner: &'a ChatSessionInner) -> Option<Self> {
        inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { inner, armed: true })
    }

    fn release(mut self) {
        self.armed = false;
        self.inner.in_flight.store(false, Ordering::Release);
    }
}

impl Drop for SendSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(
                session_id = %self.inner.id,
                "Send cancelled mid-request, unwinding"
            );
            self.inner.surface.remove(TYPING_INDICATOR_ID);
            self.inner.surface.set_input_enabled(true);
            self.inner.in_flight.store(false, Ordering::Release);
        }
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.inner.id)
            .field("exchanges", &self.transcript_len())
            .finish()
    }
}

impl ChatSession {
    /// Create a session with an empty transcript. Call [`Self::restore`] to
    /// replay any persisted history.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        backend: Arc<dyn AdvisorBackend>,
        store: Arc<dyn TranscriptStore>,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        Self {
            inner: Arc::new(ChatSessionInner {
                id: id.into(),
                transcript: RwLock::new(Transcript::new()),
                in_flight: AtomicBool::new(false),
                user_initial: RwLock::new(None),
                backend,
                store,
                surface,
            }),
        }
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Number of completed exchanges.
    #[must_use]
    pub fn transcript_len(&self) -> usize {
        self.inner.transcript.read().unwrap().len()
    }

    /// Current avatar initial; [`DEFAULT_INITIAL`] until user info loads.
    #[must_use]
    pub fn user_initial(&self) -> char {
        self.inner.user_initial.read().unwrap().unwrap_or(DEFAULT_INITIAL)
    }

    /// Fetch the avatar initial once. A failed or malformed lookup pins the
    /// default so the backend is not asked again this session.
    pub async fn ensure_user_initial(&self) {
        if self.inner.user_initial.read().unwrap().is_some() {
            return;
        }
        let initial = match self.inner.backend.user_info().await {
            Ok(info) => info.display_initial(),
            Err(error) => {
                tracing::debug!(
                    session_id = %self.inner.id,
                    error = %error,
                    "Could not load user info, using default initial"
                );
                DEFAULT_INITIAL
            }
        };
        *self.inner.user_initial.write().unwrap() = Some(initial);
    }

    /// Replay a persisted transcript into the surface, if one exists.
    ///
    /// Fetches the avatar initial first so replayed user bubbles carry it.
    /// Absent or corrupt stored data degrades silently to an empty
    /// transcript with the placeholder showing.
    pub async fn restore(&self) {
        self.ensure_user_initial().await;
        let surface = &self.inner.surface;
        let restored = self
            .inner
            .store
            .load()
            .and_then(|raw| match Transcript::from_json(&raw) {
                some @ Some(_) => some,
                None => {
                    tracing::debug!(
                        session_id = %self.inner.id,
                        "Discarding corrupt stored transcript"
                    );
                    None
                }
            });

        match restored {
            Some(transcript) if !transcript.is_empty() => {
                for exchange in transcript.iter() {
                    surface.append(DisplayMessage::user(&exchange.user, self.user_initial()));
                    surface.append(DisplayMessage::ai(&exchange.ai));
                }
                surface.set_placeholder_visible(false);
                tracing::debug!(
                    session_id = %self.inner.id,
                    exchanges = transcript.len(),
                    "Restored transcript"
                );
                *self.inner.transcript.write().unwrap() = transcript;
            }
            _ => surface.set_placeholder_visible(true),
        }
    }

    /// One chat round trip.
    ///
    /// Renders the user message optimistically, shows the typing indicator,
    /// posts the message plus the trailing context window, then renders
    /// either the reply or the fixed failure notice. Only a successful round
    /// trip touches the transcript and its stored copy. The submit control is
    /// re-enabled and the list scrolled on every path.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let message = text.trim();
        if message.is_empty() {
            return SendOutcome::Ignored;
        }
        let Some(slot) = SendSlot::acquire(&self.inner) else {
            tracing::debug!(
                session_id = %self.inner.id,
                "Dropping send, another request is in flight"
            );
            return SendOutcome::Busy;
        };

        let surface = &self.inner.surface;
        surface.remove(TYPING_INDICATOR_ID);
        surface.append(DisplayMessage::user(message, self.user_initial()));
        surface.clear_input();
        surface.set_placeholder_visible(false);
        surface.append(DisplayMessage::typing());
        surface.set_input_enabled(false);

        let history: Vec<Exchange> = self
            .inner
            .transcript
            .read()
            .unwrap()
            .context_window()
            .to_vec();

        tracing::debug!(
            session_id = %self.inner.id,
            message_length = message.len(),
            history = history.len(),
            "Sending chat request"
        );
        let result = self.inner.backend.chat(message, &history).await;

        surface.remove(TYPING_INDICATOR_ID);
        let outcome = match result {
            Ok(reply) => {
                surface.append(DisplayMessage::ai(&reply));
                let mut transcript = self.inner.transcript.write().unwrap();
                transcript.push(Exchange {
                    user: message.to_string(),
                    ai: reply,
                });
                self.inner.store.save(&transcript.to_json());
                tracing::info!(
                    session_id = %self.inner.id,
                    exchanges = transcript.len(),
                    "Chat exchange completed"
                );
                SendOutcome::Replied
            }
            Err(error) => {
                tracing::warn!(
                    session_id = %self.inner.id,
                    error = %error,
                    "Chat request failed"
                );
                surface.append(DisplayMessage::ai(CHAT_FAILURE_MESSAGE));
                SendOutcome::Failed
            }
        };

        surface.set_input_enabled(true);
        surface.scroll_to_latest();
        slot.release();
        outcome
    }

    /// Empty the transcript, the rendered list, and the stored copy.
    ///
    /// Confirmation comes from the caller (the page asks via a confirm
    /// prompt). Unconfirmed calls are a no-op. Returns whether anything
    /// happened.
    pub fn clear(&self, confirmed: bool) -> bool {
        if !confirmed {
            return false;
        }
        let surface = &self.inner.surface;
        surface.clear();
        surface.set_placeholder_visible(true);
        self.inner.transcript.write().unwrap().clear();
        self.inner.store.remove();
        tracing::info!(session_id = %self.inner.id, "Chat cleared");
        true
    }
}

/// A session plus its concrete rendering surface.
///
/// Handlers need the [`HtmlSurface`] to serialize the fragment, while the
/// session itself only knows the trait.
#[derive(Debug, Clone)]
pub struct ChatHandle {
    /// The session.
    pub session: ChatSession,
    /// The surface backing it.
    pub surface: Arc<HtmlSurface>,
}

/// Thread-safe store handing out one [`ChatSession`] per browsing session.
#[derive(Clone)]
pub struct ChatSessionStore {
    inner: Arc<StoreInner>,
}

struct SessionEntry {
    handle: ChatHandle,
    last_seen: Instant,
}

struct StoreInner {
    backend: Arc<dyn AdvisorBackend>,
    storage: SessionStorage,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl std::fmt::Debug for ChatSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSessionStore")
            .field("sessions", &self.len())
            .finish()
    }
}

impl ChatSessionStore {
    /// Create an empty store over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn AdvisorBackend>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend,
                storage: SessionStorage::new(),
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Create a session with a fresh id.
    pub async fn create(&self) -> ChatHandle {
        self.create_with_id(uuid::Uuid::new_v4().to_string()).await
    }

    /// Create a session with a specific id and replay any persisted
    /// transcript for it.
    pub async fn create_with_id(&self, id: impl Into<String>) -> ChatHandle {
        let id = id.into();
        let surface = Arc::new(HtmlSurface::new());
        let store = Arc::new(self.inner.storage.scoped(&id));
        let session = ChatSession::new(
            id.clone(),
            Arc::clone(&self.inner.backend),
            store,
            Arc::clone(&surface) as Arc<dyn RenderSurface>,
        );
        session.restore().await;
        let handle = ChatHandle { session, surface };
        self.inner.sessions.write().unwrap().insert(
            id,
            SessionEntry {
                handle: handle.clone(),
                last_seen: Instant::now(),
            },
        );
        handle
    }

    /// Look up a session by id, refreshing its idle clock.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ChatHandle> {
        let mut sessions = self.inner.sessions.write().unwrap();
        sessions.get_mut(id).map(|entry| {
            entry.last_seen = Instant::now();
            entry.handle.clone()
        })
    }

    /// Look up a session, creating it if absent.
    pub async fn get_or_create(&self, id: &str) -> ChatHandle {
        if let Some(handle) = self.get(id) {
            return handle;
        }
        self.create_with_id(id).await
    }

    /// Remove a session by id, leaving its stored transcript in place.
    pub fn remove(&self, id: &str) -> Option<ChatHandle> {
        self.inner
            .sessions
            .write()
            .unwrap()
            .remove(id)
            .map(|entry| entry.handle)
    }

    /// Drop every session idle for at least `max_idle`, along with its
    /// stored transcript. Returns how many were evicted.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.inner.sessions.write().unwrap();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| entry.last_seen.elapsed() >= max_idle)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.remove(id);
            self.inner.storage.scoped(id).remove();
            tracing::debug!(session_id = %id, "Evicted idle session");
        }
        expired.len()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sessions.read().unwrap().len()
    }

    /// Whether no sessions exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
