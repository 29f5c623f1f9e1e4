//! Conversation logic for ahoy
//!
//! This crate drives a single send: optimistic user append, relay round-trip
//! and the assistant reply (or apology) landing in the right session.

pub mod conversation;

pub use conversation::{ConversationController, PendingSend, SendOutcome, RELAY_ERROR_TEXT};
