//! Terminal rendering of sessions and messages

use ahoy_core::session::{
    preview_for, title_for, Message, Sender, Session, SessionCollection, SessionId,
};
use chrono::{Local, TimeZone};
use console::style;

pub fn print_banner() {
    println!("{}", style("AhoyBot").bold().cyan());
    println!("{}", style("Talk like a pirate, matey! Arrr!").dim());
    println!("{}", style("Type /help for commands.").dim());
}

pub fn print_help() {
    println!("  /new             start a new chat");
    println!("  /list            list chats, newest first");
    println!("  /switch <n|id>   switch to a chat");
    println!("  /delete [n|id]   delete a chat (default: current)");
    println!("  /history         show the current chat");
    println!("  /quit            leave");
}

/// List sessions newest first, marking `active` when given
pub fn print_session_list(sessions: &SessionCollection, active: Option<&SessionId>) {
    if sessions.is_empty() {
        println!("{}", style("No saved chats yet.").dim());
        return;
    }
    for (index, session) in sessions.recent().iter().enumerate() {
        let marker = if Some(&session.id) == active { "*" } else { " " };
        println!(
            "{} {:>2}. {}  {}  {}",
            marker,
            index + 1,
            style(title_for(session)).bold(),
            preview_for(sessions, &session.id),
            style(format!("({} messages)", session.messages.len())).dim(),
        );
    }
}

pub fn print_session(session: &Session) {
    println!(
        "{} {}",
        style("──").dim(),
        style(title_for(session)).bold()
    );
    if session.messages.is_empty() {
        println!(
            "{}",
            style("Ahoy there, matey! Ask me something and I'll answer in pirate speak.").dim()
        );
    }
    for message in &session.messages {
        print_message(message);
    }
}

pub fn print_message(message: &Message) {
    let time = Local
        .timestamp_millis_opt(message.timestamp)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default();
    let who = match message.sender {
        Sender::User => style("you ").green().bold(),
        Sender::Assistant => style("ahoy").cyan().bold(),
    };
    println!("{} {} {}", style(time).dim(), who, message.text);
}
