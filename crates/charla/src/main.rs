//! # charla
//!
//! `charla serve` runs the chat server; `charla send` and `charla chat` talk
//! to one, over the realtime connection when it is available and over HTTP
//! otherwise.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use charla_client::ChatClient;
use charla_core::{Mode, Reply, ReplySource};
use charla_responder::{KeywordResponder, Latency};
use charla_server::{ChatServer, ServerConfig};
use charla_settings::CharlaSettings;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Dual-transport chat.
#[derive(Parser, Debug)]
#[command(name = "charla", version, about = "Dual-transport chat server and client")]
struct Cli {
    /// Log filter (overrides settings; `RUST_LOG` overrides both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Settings file (defaults to `~/.charla/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server until Ctrl-C.
    Serve {
        /// Host to bind.
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (0 for auto-assign).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Send one message and print the reply.
    Send {
        /// Message text.
        text: String,
        /// Server base URL.
        #[arg(long)]
        server_url: Option<String>,
        /// Skip the realtime connection and use HTTP only.
        #[arg(long)]
        fallback_only: bool,
    },
    /// Chat line by line over stdin.
    Chat {
        /// Server base URL.
        #[arg(long)]
        server_url: Option<String>,
    },
}

fn load_settings(path: Option<&Path>) -> Result<CharlaSettings> {
    match path {
        Some(path) => charla_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => charla_settings::load_settings().context("Failed to load settings"),
    }
}

/// `[mode] text`, with apologies marked.
fn format_reply(reply: &Reply) -> String {
    match reply.source() {
        ReplySource::Bot(mode) => format!("[{mode}] {reply}"),
        ReplySource::Apology(kind) => format!("[error: {kind}] {reply}"),
    }
}

async fn serve(settings: &CharlaSettings, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = ServerConfig::from(&settings.server);
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let latency = Latency::from_millis(settings.server.min_delay_ms, settings.server.max_delay_ms);
    let server = ChatServer::new(config, Arc::new(KeywordResponder::new(latency)));
    let addr = server.listen().await.context("Failed to start server")?;
    tracing::info!(%addr, "ready, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    server.shutdown().await;
    Ok(())
}

async fn send(settings: &CharlaSettings, text: &str, fallback_only: bool) -> Result<()> {
    let client = ChatClient::new(&settings.client);
    if !fallback_only {
        let _ = client.start().await;
    }
    let reply = client.send_message(text).await;
    println!("{}", format_reply(&reply));
    client.close();
    Ok(())
}

async fn chat(settings: &CharlaSettings) -> Result<()> {
    let client = ChatClient::new(&settings.client);
    let mode = client.start().await;
    if mode == Mode::Fallback {
        eprintln!("realtime connection unavailable, using HTTP");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let reply = client.send_message(&line).await;
        println!("{}", format_reply(&reply));
    }
    client.close();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.settings.as_deref())?;
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    charla_core::logging::init_subscriber(&settings.logging.level);

    match cli.command {
        Command::Serve { host, port } => serve(&settings, host, port).await,
        Command::Send {
            text,
            server_url,
            fallback_only,
        } => {
            if let Some(url) = server_url {
                settings.client.server_url = url;
            }
            send(&settings, &text, fallback_only).await
        }
        Command::Chat { server_url } => {
            if let Some(url) = server_url {
                settings.client.server_url = url;
            }
            chat(&settings).await
        }
    }
}
