//! Durable storage for the session collection
//!
//! The whole collection lives in a single slot and is replaced as one unit
//! on every save. Loading never fails: a missing or unreadable slot yields
//! an empty collection.

use super::model::{Message, Session, SessionCollection, SessionId};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key of the single durable slot holding every session
pub const SESSION_SLOT_KEY: &str = "pirate-chat-sessions";

/// Persistence boundary for the session collection
pub trait SessionStore: Send + Sync {
    /// Read the slot; corrupt or missing data yields an empty collection
    fn load(&self) -> SessionCollection;

    /// Replace the slot with `sessions`
    fn save(&self, sessions: &SessionCollection) -> crate::Result<()>;
}

/// Decode slot contents
///
/// Entries that are not arrays are skipped. Inside a session only the
/// unreadable messages are dropped; the session itself is kept.
pub fn decode_slot(raw: &str) -> SessionCollection {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Session slot is not valid JSON, starting fresh: {}", e);
            return SessionCollection::new();
        }
    };

    let Value::Object(entries) = value else {
        warn!("Session slot does not hold an object, starting fresh");
        return SessionCollection::new();
    };

    let mut sessions = SessionCollection::new();
    for (key, value) in entries {
        let Value::Array(items) = value else {
            warn!(session = %key, "Skipping session whose messages are not an array");
            continue;
        };
        let messages = decode_messages(&key, items);
        sessions.insert(Session::restore(SessionId::from(key), messages));
    }
    sessions
}

fn decode_messages(session: &str, items: Vec<Value>) -> Vec<Message> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<Message>(item) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(session = %session, index, "Skipping unreadable message: {}", e);
                None
            }
        })
        .collect()
}

/// Encode a collection into slot contents
pub fn encode_slot(sessions: &SessionCollection) -> crate::Result<String> {
    Ok(serde_json::to_string(sessions)?)
}

/// Session store backed by a JSON file named after the slot key
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Create a store keeping its slot inside `dir`
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", SESSION_SLOT_KEY)),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the slot file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> SessionCollection {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let sessions = decode_slot(&raw);
                debug!("Loaded {} sessions from {:?}", sessions.len(), self.path);
                sessions
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session slot at {:?}", self.path);
                SessionCollection::new()
            }
            Err(e) => {
                warn!("Failed to read session slot {:?}: {}", self.path, e);
                SessionCollection::new()
            }
        }
    }

    fn save(&self, sessions: &SessionCollection) -> crate::Result<()> {
        let encoded = encode_slot(sessions)?;
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            crate::utils::ensure_dir(parent)?;
        }
        // Replace the slot atomically.
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, encoded)?;
        std::fs::rename(&tmp_path, &self.path)?;
        debug!("Saved {} sessions to {:?}", sessions.len(), self.path);
        Ok(())
    }
}

/// In-process session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose slot already holds `raw`
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    /// Current slot contents
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> SessionCollection {
        match self.slot.lock().as_deref() {
            Some(raw) => decode_slot(raw),
            None => SessionCollection::new(),
        }
    }

    fn save(&self, sessions: &SessionCollection) -> crate::Result<()> {
        let encoded = encode_slot(sessions)?;
        *self.slot.lock() = Some(encoded);
        Ok(())
    }
}
