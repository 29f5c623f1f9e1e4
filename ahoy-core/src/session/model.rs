//! Session data structures

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of every generated session id
pub const SESSION_ID_PREFIX: &str = "chat-";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    /// Older slots written by the browser client store this as `"ai"`
    #[serde(alias = "ai")]
    Assistant,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message text; absent in slots where a failed reply was stored
    #[serde(default)]
    pub text: String,
    /// Message author
    pub sender: Sender,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
}

impl Message {
    /// Create a message
    pub fn new(sender: Sender, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            text: text.into(),
            sender,
            timestamp,
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>, timestamp: i64) -> Self {
        Self::new(Sender::User, text, timestamp)
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>, timestamp: i64) -> Self {
        Self::new(Sender::Assistant, text, timestamp)
    }
}

/// Session identifier, `chat-<creation epoch ms>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Build the id for a session created at `millis`
    pub fn from_millis(millis: i64) -> Self {
        Self(format!("{}{}", SESSION_ID_PREFIX, millis))
    }

    /// The id as stored
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time encoded in the id, if it has one
    pub fn creation_millis(&self) -> Option<i64> {
        self.0
            .strip_prefix(SESSION_ID_PREFIX)
            .unwrap_or(&self.0)
            .parse()
            .ok()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A conversation session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Unique id
    pub id: SessionId,
    /// Creation time in epoch milliseconds; `i64::MIN` when unknown
    pub created_at: i64,
    /// Messages in insertion order
    pub messages: Vec<Message>,
}

impl Session {
    /// Create an empty session created at `millis`
    pub fn new(millis: i64) -> Self {
        Self {
            id: SessionId::from_millis(millis),
            created_at: millis,
            messages: Vec::new(),
        }
    }

    /// Rebuild a session read back from storage
    pub fn restore(id: SessionId, messages: Vec<Message>) -> Self {
        let created_at = id.creation_millis().unwrap_or(i64::MIN);
        Self {
            id,
            created_at,
            messages,
        }
    }

    /// Whether the creation time could be recovered from the id
    pub fn has_known_creation_time(&self) -> bool {
        self.created_at != i64::MIN
    }

    /// First message sent by the user
    pub fn first_user_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.sender == Sender::User)
    }
}

/// All sessions, keyed by id
///
/// Serializes as the durable slot format: an object mapping each session id
/// to its message array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCollection {
    sessions: BTreeMap<SessionId, Session>,
}

impl SessionCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Insert a session, replacing any session with the same id
    pub fn insert(&mut self, session: Session) -> Option<Session> {
        self.sessions.insert(session.id.clone(), session)
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    /// Sessions newest first
    ///
    /// Sorted by descending creation time. The sort is stable over the
    /// id-ordered map, so equal creation times keep ascending id order.
    pub fn recent(&self) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    /// The newest session
    pub fn most_recent(&self) -> Option<&Session> {
        self.recent().into_iter().next()
    }
}

impl Serialize for SessionCollection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(
            self.sessions
                .iter()
                .map(|(id, session)| (id.as_str(), &session.messages)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_round_trips_creation_time() {
        let id = SessionId::from_millis(1_700_000_000_000);
        assert_eq!(id.as_str(), "chat-1700000000000");
        assert_eq!(id.creation_millis(), Some(1_700_000_000_000));
    }

    #[test]
    fn test_session_id_without_numeric_suffix() {
        assert_eq!(SessionId::from("chat-abc").creation_millis(), None);
        assert_eq!(SessionId::from("chat-").creation_millis(), None);
        assert_eq!(SessionId::from("42").creation_millis(), Some(42));
    }

    #[test]
    fn test_restore_unknown_creation_time() {
        let session = Session::restore(SessionId::from("legacy"), Vec::new());
        assert_eq!(session.created_at, i64::MIN);
        assert!(!session.has_known_creation_time());
    }

    #[test]
    fn test_sender_accepts_ai_alias() {
        let msg: Message =
            serde_json::from_str(r#"{"text":"Arr","sender":"ai","timestamp":5}"#).unwrap();
        assert_eq!(msg.sender, Sender::Assistant);

        let encoded = serde_json::to_string(&msg).unwrap();
        assert_eq!(encoded, r#"{"text":"Arr","sender":"assistant","timestamp":5}"#);
    }

    #[test]
    fn test_recent_orders_numerically_newest_first() {
        let mut sessions = SessionCollection::new();
        sessions.insert(Session::new(9));
        sessions.insert(Session::new(100));
        sessions.insert(Session::new(20));

        let ids: Vec<&str> = sessions.recent().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["chat-100", "chat-20", "chat-9"]);
    }

    #[test]
    fn test_recent_puts_unknown_times_last_in_id_order() {
        let mut sessions = SessionCollection::new();
        sessions.insert(Session::restore(SessionId::from("chat-zeta"), Vec::new()));
        sessions.insert(Session::restore(SessionId::from("chat-alpha"), Vec::new()));
        sessions.insert(Session::new(1));

        let ids: Vec<&str> = sessions.recent().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["chat-1", "chat-alpha", "chat-zeta"]);
    }

    #[test]
    fn test_recent_keeps_id_order_for_equal_creation_times() {
        let mut sessions = SessionCollection::new();
        sessions.insert(Session::restore(SessionId::from("chat-100"), Vec::new()));
        sessions.insert(Session::new(200));
        sessions.insert(Session::restore(SessionId::from("100"), Vec::new()));

        let recent = sessions.recent();
        assert_eq!(recent[1].created_at, recent[2].created_at);
        let ids: Vec<&str> = recent.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["chat-200", "100", "chat-100"]);
        assert_eq!(sessions.most_recent().unwrap().id.as_str(), "chat-200");
    }

    #[test]
    fn test_insert_same_id_replaces() {
        let mut sessions = SessionCollection::new();
        let mut first = Session::new(7);
        first.messages.push(Message::user("old", 7));
        sessions.insert(first);

        let replaced = sessions.insert(Session::new(7));
        assert!(replaced.is_some());
        assert_eq!(sessions.len(), 1);
        assert!(sessions.get(&SessionId::from_millis(7)).unwrap().messages.is_empty());
    }

    #[test]
    fn test_collection_serializes_as_slot_object() {
        let mut sessions = SessionCollection::new();
        let mut session = Session::new(100);
        session.messages.push(Message::user("Hello", 101));
        sessions.insert(session);

        let value = serde_json::to_value(&sessions).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "chat-100": [{"text": "Hello", "sender": "user", "timestamp": 101}]
            })
        );
    }
}
