//! Session manager: lifecycle of the session collection
//!
//! All state lives in an explicit [`ChatState`] value owned by the caller.
//! Every operation that changes the collection persists it before returning.

use super::model::{Message, Session, SessionCollection, SessionId};
use super::store::SessionStore;
use crate::utils::truncate_chars;
use chrono::{Local, TimeZone};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Preview shown for sessions without any user message
pub const NEW_CONVERSATION_PREVIEW: &str = "New conversation";

/// Characters of the first user message kept in a preview
pub const PREVIEW_MAX_CHARS: usize = 25;

/// Source of the current time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// The session collection together with the active session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatState {
    sessions: SessionCollection,
    active: SessionId,
}

impl ChatState {
    /// All sessions
    pub fn sessions(&self) -> &SessionCollection {
        &self.sessions
    }

    /// Id of the active session
    pub fn active_id(&self) -> &SessionId {
        &self.active
    }

    /// The active session
    pub fn active_session(&self) -> Option<&Session> {
        self.sessions.get(&self.active)
    }

    /// Sessions newest first
    pub fn recent(&self) -> Vec<&Session> {
        self.sessions.recent()
    }
}

/// Manages session creation, selection, deletion and message appends
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a session manager using the wall clock
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a session manager with a custom clock
    pub fn with_clock(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Current time in epoch milliseconds
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Load the stored sessions and pick the active one
    ///
    /// An empty or unreadable slot yields exactly one fresh session. The
    /// newest session becomes active otherwise.
    pub fn initialize(&self) -> ChatState {
        let mut sessions = self.store.load();

        let active = match sessions.most_recent() {
            Some(session) => session.id.clone(),
            None => {
                let id = self.insert_fresh_session(&mut sessions);
                self.persist(&sessions);
                info!(session = %id, "Created initial session");
                id
            }
        };

        debug!(
            "Initialized {} sessions, active {}",
            sessions.len(),
            active
        );
        ChatState { sessions, active }
    }

    /// Create an empty session and make it active
    pub fn create_session(&self, state: &mut ChatState) -> SessionId {
        let id = self.insert_fresh_session(&mut state.sessions);
        state.active = id.clone();
        self.persist(&state.sessions);
        debug!(session = %id, "Created session");
        id
    }

    /// Make an existing session active
    pub fn select_session(&self, state: &mut ChatState, id: &SessionId) -> bool {
        if !state.sessions.contains(id) {
            return false;
        }
        state.active = id.clone();
        true
    }

    /// Remove a session
    ///
    /// Deleting the active session activates the newest remaining one, or a
    /// fresh empty session when none remain. Returns false for unknown ids.
    pub fn delete_session(&self, state: &mut ChatState, target: &SessionId) -> bool {
        if state.sessions.remove(target).is_none() {
            return false;
        }

        if &state.active == target {
            state.active = match state.sessions.most_recent() {
                Some(session) => session.id.clone(),
                None => self.insert_fresh_session(&mut state.sessions),
            };
        }

        self.persist(&state.sessions);
        debug!(session = %target, active = %state.active, "Deleted session");
        true
    }

    /// Append a message to `session_id`, which need not be the active session
    ///
    /// Returns false if the session no longer exists.
    pub fn append_message(
        &self,
        state: &mut ChatState,
        session_id: &SessionId,
        message: Message,
    ) -> bool {
        let Some(session) = state.sessions.get_mut(session_id) else {
            return false;
        };
        session.messages.push(message);
        self.persist(&state.sessions);
        true
    }

    fn insert_fresh_session(&self, sessions: &mut SessionCollection) -> SessionId {
        // Ids must stay unique when two sessions share a millisecond.
        let mut millis = self.now_millis();
        while sessions.contains(&SessionId::from_millis(millis)) {
            millis += 1;
        }
        let session = Session::new(millis);
        let id = session.id.clone();
        sessions.insert(session);
        id
    }

    fn persist(&self, sessions: &SessionCollection) {
        if let Err(e) = self.store.save(sessions) {
            warn!("Failed to save chat sessions: {}", e);
        }
    }
}

/// Human-readable label for a session, in the local time zone
pub fn title_for(session: &Session) -> String {
    title_for_in(session, &Local)
}

/// Human-readable label for a session, e.g. `Oct 18, 02:30 PM`
pub fn title_for_in<Tz>(session: &Session, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if !session.has_known_creation_time() {
        return session.id.to_string();
    }
    match tz.timestamp_millis_opt(session.created_at).single() {
        Some(created) => created.format("%b %-d, %I:%M %p").to_string(),
        None => session.id.to_string(),
    }
}

/// Short preview of a session: its first user message, truncated
pub fn preview_for(sessions: &SessionCollection, id: &SessionId) -> String {
    sessions
        .get(id)
        .and_then(Session::first_user_message)
        .map(|message| truncate_chars(&message.text, PREVIEW_MAX_CHARS))
        .unwrap_or_else(|| NEW_CONVERSATION_PREVIEW.to_string())
}
