//! Conversation controller: one send from user input to settled reply
//!
//! A send moves through `idle -> sending -> settled -> idle` per session.
//! [`ConversationController::send`] runs the whole cycle; front ends that
//! must stay responsive during the round-trip call [`begin_send`],
//! [`dispatch`] and [`settle`] themselves.
//!
//! [`begin_send`]: ConversationController::begin_send
//! [`dispatch`]: ConversationController::dispatch
//! [`settle`]: ConversationController::settle

use ahoy_core::session::{ChatState, Message, SessionId, SessionManager};
use ahoy_providers::{RelayClient, RelayError, RelayResult};
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Assistant message appended when the relay round-trip fails
pub const RELAY_ERROR_TEXT: &str =
    "Arrr, there be an error in the communication! Try again, matey!";

/// A send that has been optimistically appended and awaits its reply
#[derive(Debug, Clone)]
pub struct PendingSend {
    session_id: SessionId,
    history: Vec<Message>,
}

impl PendingSend {
    /// Session the reply belongs to
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Full history sent to the relay, ending with the user message
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// The user message that started this send
    pub fn user_message(&self) -> Option<&Message> {
        self.history.last()
    }
}

/// Result of a send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Precondition failed; nothing changed
    Ignored,
    /// The relay answered and its reply was appended
    Appended(Message),
    /// The relay failed and the apology was appended
    Errored(Message),
}

impl SendOutcome {
    /// Assistant message produced by the send, if any
    pub fn message(&self) -> Option<&Message> {
        match self {
            SendOutcome::Ignored => None,
            SendOutcome::Appended(message) | SendOutcome::Errored(message) => Some(message),
        }
    }
}

/// Drives sends for every session, at most one in flight per session
pub struct ConversationController {
    sessions: SessionManager,
    relay: Arc<dyn RelayClient>,
    timeout: Duration,
    sending: HashSet<SessionId>,
}

impl ConversationController {
    /// Create a controller; `timeout` bounds each relay round-trip
    pub fn new(sessions: SessionManager, relay: Arc<dyn RelayClient>, timeout: Duration) -> Self {
        Self {
            sessions,
            relay,
            timeout,
            sending: HashSet::new(),
        }
    }

    /// Session manager used for appends
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Whether a send is in flight for `session_id`
    pub fn is_sending(&self, session_id: &SessionId) -> bool {
        self.sending.contains(session_id)
    }

    /// Start a send into the active session
    ///
    /// Appends the trimmed input as a user message, clears `input` and marks
    /// the session as sending. Blank input, a missing active session or a
    /// send already in flight for that session leave everything untouched
    /// and return `None`.
    pub fn begin_send(&mut self, state: &mut ChatState, input: &mut String) -> Option<PendingSend> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }

        let session_id = state.active_session()?.id.clone();
        if self.sending.contains(&session_id) {
            debug!(session = %session_id, "Send already in flight, ignoring");
            return None;
        }

        let message = Message::user(text, self.sessions.now_millis());
        if !self.sessions.append_message(state, &session_id, message) {
            return None;
        }
        input.clear();
        self.sending.insert(session_id.clone());

        let history = state
            .sessions()
            .get(&session_id)
            .map(|session| session.messages.clone())
            .unwrap_or_default();
        debug!(session = %session_id, "Sending {} messages", history.len());

        Some(PendingSend {
            session_id,
            history,
        })
    }

    /// Relay round-trip for `pending`, bounded by the controller timeout
    ///
    /// The future owns everything it needs so it can run on another task
    /// while the caller keeps mutating the chat state.
    pub fn dispatch(&self, pending: &PendingSend) -> BoxFuture<'static, RelayResult<String>> {
        let relay = Arc::clone(&self.relay);
        let history = pending.history.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            match tokio::time::timeout(timeout, relay.send(&history)).await {
                Ok(result) => result,
                Err(_) => Err(RelayError::Timeout(timeout)),
            }
        })
    }

    /// Finish a send with the relay result
    ///
    /// The reply, or the apology on failure, is appended to the session the
    /// send was made for, whichever session is active now. The session
    /// returns to idle either way.
    pub fn settle(
        &mut self,
        state: &mut ChatState,
        pending: PendingSend,
        result: RelayResult<String>,
    ) -> SendOutcome {
        self.sending.remove(&pending.session_id);

        let sent_at = pending.user_message().map_or(i64::MIN, |m| m.timestamp);
        let now = self.sessions.now_millis().max(sent_at);

        let outcome = match result {
            Ok(text) => {
                info!(session = %pending.session_id, "Relay replied");
                SendOutcome::Appended(Message::assistant(text, now))
            }
            Err(e) => {
                warn!(session = %pending.session_id, "Relay round-trip failed: {}", e);
                SendOutcome::Errored(Message::assistant(RELAY_ERROR_TEXT, now))
            }
        };

        if let Some(message) = outcome.message() {
            if !self
                .sessions
                .append_message(state, &pending.session_id, message.clone())
            {
                warn!(
                    session = %pending.session_id,
                    "Session was deleted before its reply arrived, dropping reply"
                );
            }
        }
        outcome
    }

    /// Run a whole send: begin, relay round-trip, settle
    pub async fn send(&mut self, state: &mut ChatState, input: &mut String) -> SendOutcome {
        let Some(pending) = self.begin_send(state, input) else {
            return SendOutcome::Ignored;
        };
        let result = self.dispatch(&pending).await;
        self.settle(state, pending, result)
    }
}
