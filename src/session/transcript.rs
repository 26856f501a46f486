//! Conversation transcript and its session-scoped persistence.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Maximum number of exchanges sent to the backend as context.
///
/// Older history is retained locally but never leaves the session.
pub const HISTORY_WINDOW: usize = 6;

/// Storage key prefix for persisted transcripts.
const STORAGE_KEY: &str = "chenge_chat_history";

/// One request/response pair, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// What the user asked.
    pub user: String,
    /// What the advisor answered.
    pub ai: String,
}

/// Ordered, append-only sequence of exchanges, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    exchanges: Vec<Exchange>,
}

impl Transcript {
    /// An empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a stored transcript. `None` for corrupt data; the caller
    /// degrades to an empty transcript.
    #[must_use]
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw)
            .ok()
            .map(|exchanges| Self { exchanges })
    }

    /// Serialize for storage.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.exchanges).unwrap_or_default()
    }

    /// Append one completed exchange.
    pub fn push(&mut self, exchange: Exchange) {
        self.exchanges.push(exchange);
    }

    /// Number of exchanges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    /// Whether the transcript holds no exchanges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    /// The trailing [`HISTORY_WINDOW`] exchanges, for the outbound request.
    #[must_use]
    pub fn context_window(&self) -> &[Exchange] {
        let start = self.exchanges.len().saturating_sub(HISTORY_WINDOW);
        &self.exchanges[start..]
    }

    /// Drop every exchange.
    pub fn clear(&mut self) {
        self.exchanges.clear();
    }
}

/// Persistence seam for one session's transcript.
///
/// The stored value is an opaque JSON string; absent or corrupt values read
/// back as "no history".
pub trait TranscriptStore: Send + Sync {
    /// Read the stored transcript, if any.
    fn load(&self) -> Option<String>;
    /// Write (or overwrite) the stored transcript.
    fn save(&self, json: &str);
    /// Remove the stored transcript.
    fn remove(&self);
}

/// In-process key-value storage scoped to the server's lifetime.
///
/// The Rust rendition of the browser's session storage: one entry per
/// browsing session, gone when the process ends, shared with nothing else.
#[derive(Debug, Clone, Default)]
pub struct SessionStorage {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionStorage {
    /// An empty storage area.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`TranscriptStore`] bound to one session's key.
    #[must_use]
    pub fn scoped(&self, session_id: &str) -> ScopedStore {
        ScopedStore {
            key: format!("{STORAGE_KEY}:{session_id}"),
            storage: self.clone(),
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// View over [`SessionStorage`] for a single session key.
#[derive(Debug, Clone)]
pub struct ScopedStore {
    key: String,
    storage: SessionStorage,
}

impl TranscriptStore for ScopedStore {
    fn load(&self) -> Option<String> {
        self.storage.inner.read().unwrap().get(&self.key).cloned()
    }

    fn save(&self, json: &str) {
        self.storage
            .inner
            .write()
            .unwrap()
            .insert(self.key.clone(), json.to_string());
    }

    fn remove(&self) {
        self.storage.inner.write().unwrap().remove(&self.key);
    }
}
