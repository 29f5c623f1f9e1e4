//! CLI entry point for ahoy

mod chat;
mod render;

use ahoy_core::config::{Config, ConfigLoader};
use ahoy_core::logging::init_logging;
use ahoy_core::session::{FileSessionStore, SessionCollection, SessionStore};
use ahoy_manager::{run_server, AppState};
use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::info;

#[derive(Parser)]
#[command(name = "ahoy")]
#[command(about = "Pirate chat sessions and the relay that answers them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init,
    /// Run the chat relay server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Start an interactive chat
    Chat {
        /// Relay chat endpoint, e.g. http://localhost:3001/chat
        #[arg(short, long)]
        relay_url: Option<String>,
    },
    /// List saved chat sessions
    Sessions,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Init => run_init(&config_loader),
        Commands::Serve { port } => {
            let mut config = load_config(&config_loader)?;
            if let Some(port) = port {
                config.relay.port = port;
            }
            let _guard = init_logging(&config.logging);
            info!("Starting relay");
            run_serve(config).await
        }
        Commands::Chat { relay_url } => {
            let mut config = load_config(&config_loader)?;
            if let Some(url) = relay_url {
                config.client.relay_url = url;
            }
            // Keep the terminal for the conversation.
            config.logging.stdout = false;
            let _guard = init_logging(&config.logging);
            let storage_dir = config_loader.storage_dir(&config);
            info!("Starting chat with sessions in {:?}", storage_dir);
            chat::run_chat(&config, storage_dir).await
        }
        Commands::Sessions => {
            let config = load_config(&config_loader)?;
            run_sessions(config_loader.storage_dir(&config));
            Ok(())
        }
    }
}

/// Load configuration, anchoring a relative log directory at the config dir
fn load_config(loader: &ConfigLoader) -> Result<Config> {
    let mut config = loader.load()?;
    let log_dir = PathBuf::from(&config.logging.dir);
    if log_dir.is_relative() {
        config.logging.dir = loader.config_dir().join(log_dir).to_string_lossy().to_string();
    }
    Ok(config)
}

fn run_init(loader: &ConfigLoader) -> Result<()> {
    let path = loader.config_path();
    if path.exists() {
        println!("{} {}", style("Config already exists:").yellow(), path.display());
        return Ok(());
    }
    loader.save(&Config::default())?;
    println!("{} {}", style("Wrote").green(), path.display());
    println!("Set GEMINI_API_KEY (or provider.api_key) before running `ahoy serve`.");
    Ok(())
}

async fn run_serve(config: Config) -> Result<()> {
    let state = AppState::from_config(&config.provider);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C");
            let _ = shutdown_tx.send(());
        }
    });

    run_server(state, &config.relay, shutdown_rx).await
}

/// Read the saved sessions without creating or writing anything
fn load_sessions(storage_dir: PathBuf) -> SessionCollection {
    FileSessionStore::new(storage_dir).load()
}

fn run_sessions(storage_dir: PathBuf) {
    render::print_session_list(&load_sessions(storage_dir), None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahoy_core::session::{Message, Session, SessionId};
    use tempfile::TempDir;

    #[test]
    fn test_load_sessions_does_not_create_slot() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path());

        let sessions = load_sessions(temp_dir.path().to_path_buf());

        assert!(sessions.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_load_sessions_leaves_slot_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path());
        let mut saved = SessionCollection::new();
        let mut session = Session::new(100);
        session.messages.push(Message::user("Hello", 101));
        saved.insert(session);
        store.save(&saved).unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let sessions = load_sessions(temp_dir.path().to_path_buf());

        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains(&SessionId::from("chat-100")));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }
}
