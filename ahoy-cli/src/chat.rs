//! Interactive chat loop
//!
//! The loop owns the chat state. Relay round-trips run on spawned tasks and
//! report back over a channel, so chats can be switched, created and deleted
//! while a reply is still on its way.

use ahoy_agent::{ConversationController, PendingSend, SendOutcome};
use ahoy_core::config::Config;
use ahoy_core::session::{title_for, ChatState, FileSessionStore, SessionId, SessionManager};
use ahoy_providers::{HttpRelayClient, RelayResult};
use anyhow::Result;
use console::style;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Split};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::render;

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Say(String),
    New,
    List,
    Switch(String),
    Delete(Option<String>),
    History,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl ReplCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return ReplCommand::Say(line.to_string());
        };

        let mut parts = command.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts
            .next()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        match (name, arg) {
            ("new", _) => ReplCommand::New,
            ("list" | "ls", _) => ReplCommand::List,
            ("switch" | "s", Some(target)) => ReplCommand::Switch(target),
            ("delete" | "rm", target) => ReplCommand::Delete(target),
            ("history", _) => ReplCommand::History,
            ("help" | "?", _) => ReplCommand::Help,
            ("quit" | "exit" | "q", _) => ReplCommand::Quit,
            _ => ReplCommand::Unknown(line.to_string()),
        }
    }
}

/// Resolve a 1-based position in the recency listing, or a raw session id
fn resolve_target(state: &ChatState, target: &str) -> Option<SessionId> {
    if let Ok(position) = target.parse::<usize>() {
        return state
            .recent()
            .get(position.checked_sub(1)?)
            .map(|session| session.id.clone());
    }
    let id = SessionId::from(target);
    state.sessions().contains(&id).then_some(id)
}

/// One read from the terminal
#[derive(Debug, PartialEq, Eq)]
enum StdinLine {
    Text(String),
    /// The line was not valid UTF-8 and has been discarded
    Unreadable,
    Closed,
}

/// Read the next line; bad bytes cost only the line they are on
async fn read_input<R>(lines: &mut Split<R>) -> StdinLine
where
    R: AsyncBufRead + Unpin,
{
    match lines.next_segment().await {
        Ok(Some(bytes)) => match String::from_utf8(bytes) {
            Ok(mut line) => {
                if line.ends_with('\r') {
                    line.pop();
                }
                StdinLine::Text(line)
            }
            Err(e) => {
                warn!("Discarding input line that is not valid UTF-8: {}", e);
                StdinLine::Unreadable
            }
        },
        Ok(None) => StdinLine::Closed,
        Err(e) => {
            warn!("Failed to read from stdin: {}", e);
            StdinLine::Closed
        }
    }
}

type SettledSend = (PendingSend, RelayResult<String>);

pub async fn run_chat(config: &Config, storage_dir: PathBuf) -> Result<()> {
    let store = Arc::new(FileSessionStore::new(storage_dir));
    let manager = SessionManager::new(store);
    let mut state = manager.initialize();

    let relay = Arc::new(HttpRelayClient::from_config(&config.client));
    let mut controller = ConversationController::new(
        manager.clone(),
        relay,
        Duration::from_secs(config.client.timeout_secs),
    );

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<SettledSend>();
    let mut lines = BufReader::new(tokio::io::stdin()).split(b'\n');

    render::print_banner();
    if let Some(session) = state.active_session() {
        render::print_session(session);
    }

    loop {
        prompt();
        tokio::select! {
            input = read_input(&mut lines) => {
                let line = match input {
                    StdinLine::Text(line) => line,
                    StdinLine::Unreadable => {
                        println!("{}", style("Could not read that line, try again.").yellow());
                        continue;
                    }
                    StdinLine::Closed => break,
                };
                match ReplCommand::parse(&line) {
                    ReplCommand::Empty => {}
                    ReplCommand::Quit => break,
                    ReplCommand::Help => render::print_help(),
                    ReplCommand::List => {
                        render::print_session_list(state.sessions(), Some(state.active_id()));
                    }
                    ReplCommand::History => {
                        if let Some(session) = state.active_session() {
                            render::print_session(session);
                        }
                    }
                    ReplCommand::New => {
                        manager.create_session(&mut state);
                        if let Some(session) = state.active_session() {
                            render::print_session(session);
                        }
                    }
                    ReplCommand::Switch(target) => match resolve_target(&state, &target) {
                        Some(id) => {
                            manager.select_session(&mut state, &id);
                            if let Some(session) = state.active_session() {
                                render::print_session(session);
                            }
                        }
                        None => println!("{} {}", style("No chat matches").yellow(), target),
                    },
                    ReplCommand::Delete(target) => {
                        let id = match target {
                            Some(target) => resolve_target(&state, &target),
                            None => Some(state.active_id().clone()),
                        };
                        match id {
                            Some(id) if manager.delete_session(&mut state, &id) => {
                                println!("{} {}", style("Deleted").dim(), id);
                                if let Some(session) = state.active_session() {
                                    render::print_session(session);
                                }
                            }
                            _ => println!("{}", style("No such chat").yellow()),
                        }
                    }
                    ReplCommand::Unknown(line) => {
                        println!("{} {}", style("Unknown command:").yellow(), line);
                    }
                    ReplCommand::Say(text) => {
                        let mut input = text;
                        match controller.begin_send(&mut state, &mut input) {
                            Some(pending) => {
                                let reply = controller.dispatch(&pending);
                                let reply_tx = reply_tx.clone();
                                tokio::spawn(async move {
                                    let result = reply.await;
                                    let _ = reply_tx.send((pending, result));
                                });
                            }
                            None if controller.is_sending(state.active_id()) => {
                                println!("{}", style("Still waiting on the last reply in this chat...").dim());
                            }
                            None => {}
                        }
                    }
                }
            }
            Some((pending, result)) = reply_rx.recv() => {
                let session_id = pending.session_id().clone();
                let outcome = controller.settle(&mut state, pending, result);
                debug!(session = %session_id, "Send settled: {:?}", outcome);
                print_outcome(&state, &session_id, &outcome);
            }
        }
    }

    Ok(())
}

fn print_outcome(state: &ChatState, session_id: &SessionId, outcome: &SendOutcome) {
    let Some(message) = outcome.message() else {
        return;
    };
    println!();
    if session_id != state.active_id() {
        let label = state
            .sessions()
            .get(session_id)
            .map(title_for)
            .unwrap_or_else(|| session_id.to_string());
        println!("{} {}", style("reply in").dim(), style(label).bold());
    }
    render::print_message(message);
}

fn prompt() {
    print!("{} ", style(">").cyan().bold());
    let _ = std::io::stdout().flush();
}
