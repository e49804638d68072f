//! Tuner Core - Channel Player Library
//!
//! This crate provides the core of a playlist-driven channel player:
//! - Line-oriented playlist loading (`#EXTINF` names, stream URLs)
//! - Stream variant classification (adaptive HLS, adaptive DASH, direct)
//! - Channel switching with exactly one live session at a time
//! - Next-channel preloading
//! - Keyboard/pointer input handling for a channel list front end
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Tuner Core                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐         ┌──────────────┐                      │
//! │  │   Playlist   │         │    Input     │                      │
//! │  │    Loader    │         │    Shell     │                      │
//! │  └──────┬───────┘         └──────┬───────┘                      │
//! │         │                        │                              │
//! │         └───────────┬────────────┘                              │
//! │                     │                                           │
//! │              ┌──────┴──────┐                                    │
//! │              │   Player    │                                    │
//! │              └──────┬──────┘                                    │
//! │                     │                                           │
//! │              ┌──────┴──────┐       ┌──────────────┐             │
//! │              │   Channel   │──────▶│  Preloader   │             │
//! │              │  Switcher   │       └──────────────┘             │
//! │              └──────┬──────┘                                    │
//! │                     │                                           │
//! │              ┌──────┴──────┐                                    │
//! │              │  Playback   │  HLS / DASH / direct sessions      │
//! │              │  Backend    │                                    │
//! │              └─────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod player;
pub mod playlist;
pub mod preload;
pub mod shell;
pub mod switcher;
pub mod types;

pub use config::{PlayerConfig, SessionTuning, ShellTimings};
pub use engine::{classify, Capabilities, HttpBackend, OpenRequest, PlaybackBackend, StreamSession};
pub use error::{Error, Result};
pub use player::{LogNotifier, Notifier, Player};
pub use playlist::{parse_playlist, resolve_channel_urls, PlaylistLoader};
pub use preload::Preloader;
pub use shell::{HintState, InputEvent, Key, Shell, ShellAction};
pub use switcher::ChannelSwitcher;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "Tuner Core initialized");
}
