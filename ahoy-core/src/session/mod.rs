//! Chat sessions
//!
//! Sessions are kept in a single JSON slot so the whole collection can be
//! replaced atomically after every change.

pub mod manager;
pub mod model;
pub mod store;

pub use manager::{
    preview_for, title_for, title_for_in, ChatState, Clock, SessionManager, SystemClock,
    NEW_CONVERSATION_PREVIEW,
};
pub use model::{Message, Sender, Session, SessionCollection, SessionId};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, SESSION_SLOT_KEY};
