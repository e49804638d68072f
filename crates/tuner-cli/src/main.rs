//! Tuner CLI - Terminal Channel Player
//!
//! Features:
//! - Channel list with keyboard and mouse navigation
//! - Low-latency playback through an external player
//! - Next-channel preloading
//! - Playlist listing and channel reachability checks

use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;
use tuner_core::PlayerConfig;

mod commands;
mod external;
mod ipc;
mod output;
mod tui;

/// Tuner CLI - Playlist channel player
#[derive(Parser)]
#[command(name = "tuner")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Minimal IPTV channel player", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play channels from a playlist
    Watch {
        /// Playlist URL or path (defaults to the configured playlist)
        playlist: Option<String>,

        /// External player command
        #[arg(long)]
        player: Option<String>,
    },

    /// List the channels of a playlist
    List {
        /// Playlist URL or path
        playlist: Option<String>,
    },

    /// Check that every channel of a playlist starts
    Check {
        /// Playlist URL or path
        playlist: Option<String>,

        /// Only check the first N channels
        #[arg(short, long)]
        limit: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    let owns_terminal = matches!(cli.command, Commands::Watch { .. });
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_writer(cli.log_file.as_deref(), owns_terminal)?)
        .with_ansi(cli.log_file.is_none())
        .init();

    let mut config = match &cli.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::default(),
    };

    match cli.command {
        Commands::Watch { playlist, player } => {
            if let Some(playlist) = playlist {
                config.playlist = playlist;
            }
            if let Some(player) = player {
                config.external_player.command = player;
            }
            config.validate()?;
            tui::run(config).await?;
        }
        Commands::List { playlist } => {
            if let Some(playlist) = playlist {
                config.playlist = playlist;
            }
            commands::list(&config, &cli.format).await?;
        }
        Commands::Check { playlist, limit, timeout } => {
            if let Some(playlist) = playlist {
                config.playlist = playlist;
            }
            commands::check(&config, limit, timeout, &cli.format).await?;
        }
    }

    Ok(())
}

/// Log to the given file, to stderr, or nowhere while the terminal UI is up
fn log_writer(path: Option<&Path>, owns_terminal: bool) -> anyhow::Result<BoxMakeWriter> {
    if let Some(path) = path {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        return Ok(BoxMakeWriter::new(Mutex::new(file)));
    }
    if owns_terminal {
        return Ok(BoxMakeWriter::new(io::sink));
    }
    Ok(BoxMakeWriter::new(io::stderr))
}
