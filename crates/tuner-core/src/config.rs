//! Player configuration
//!
//! Every field has a default matching the tuned low-latency profile, so a
//! TOML file only needs to list what it overrides.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Playlist loaded when none is given
pub const DEFAULT_PLAYLIST_URL: &str =
    "https://raw.githubusercontent.com/juztnobadi24/mychannels/main/juztchannels.m3u";

/// Top-level player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Playlist URL or local path
    pub playlist: String,
    /// Playlist fetch timeout in milliseconds (None = wait forever)
    pub playlist_timeout_ms: Option<u64>,
    /// Low-latency parameters handed to each session
    pub tuning: SessionTuning,
    /// Input timing windows
    pub timings: ShellTimings,
    /// External player used by the terminal front end
    pub external_player: ExternalPlayerConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            playlist: DEFAULT_PLAYLIST_URL.to_string(),
            playlist_timeout_ms: None,
            tuning: SessionTuning::default(),
            timings: ShellTimings::default(),
            external_player: ExternalPlayerConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlayerConfig =
            toml::from_str(content).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Check the configuration for values the player cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.playlist.trim().is_empty() {
            return Err(Error::InvalidConfig("playlist must not be empty".into()));
        }
        if self.playlist_timeout_ms == Some(0) {
            return Err(Error::InvalidConfig("playlist_timeout_ms must be positive".into()));
        }
        self.timings.validate()?;
        self.tuning.validate()?;
        if self.external_player.command.trim().is_empty() {
            return Err(Error::InvalidConfig("external_player.command must not be empty".into()));
        }
        Ok(())
    }

    pub fn playlist_timeout(&self) -> Option<Duration> {
        self.playlist_timeout_ms.map(Duration::from_millis)
    }
}

/// Per-variant session parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    pub hls: HlsTuning,
    pub dash: DashTuning,
}

impl SessionTuning {
    fn validate(&self) -> Result<()> {
        if self.hls.max_buffer_length <= 0.0 {
            return Err(Error::InvalidConfig("hls.max_buffer_length must be positive".into()));
        }
        if self.hls.live_max_latency_duration < self.hls.live_sync_duration {
            return Err(Error::InvalidConfig(
                "hls.live_max_latency_duration must not be below hls.live_sync_duration".into(),
            ));
        }
        if self.dash.buffering_goal <= 0.0 {
            return Err(Error::InvalidConfig("dash.buffering_goal must be positive".into()));
        }
        Ok(())
    }
}

/// Adaptive HLS engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HlsTuning {
    /// Forward buffer target (seconds)
    pub max_buffer_length: f64,
    /// Index of the first rendition, lowest bandwidth first
    pub start_level: usize,
    /// Start loading segments as soon as the manifest is parsed
    pub auto_start_load: bool,
    /// Distance from the live edge to play at (seconds)
    pub live_sync_duration: f64,
    /// Latency after which the engine jumps back to the live edge (seconds)
    pub live_max_latency_duration: f64,
    /// Use partial segments when the stream offers them
    pub low_latency_mode: bool,
}

impl Default for HlsTuning {
    fn default() -> Self {
        Self {
            max_buffer_length: 3.0,
            start_level: 0,
            auto_start_load: true,
            live_sync_duration: 2.0,
            live_max_latency_duration: 8.0,
            low_latency_mode: true,
        }
    }
}

/// Adaptive DASH engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashTuning {
    /// Forward buffer target (seconds)
    pub buffering_goal: f64,
    /// Buffer required to resume after a stall (seconds)
    pub rebuffering_goal: f64,
    pub low_latency_mode: bool,
    pub abr_enabled: bool,
    /// Minimum time between rendition switches (seconds)
    pub abr_switch_interval: f64,
}

impl Default for DashTuning {
    fn default() -> Self {
        Self {
            buffering_goal: 1.5,
            rebuffering_goal: 1.0,
            low_latency_mode: true,
            abr_enabled: true,
            abr_switch_interval: 2.0,
        }
    }
}

/// Timing windows for the input shell, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellTimings {
    /// Two Enter presses closer than this toggle fullscreen
    pub double_enter_ms: u64,
    /// Delay before a single click toggles the sidebar
    pub click_delay_ms: u64,
    /// Pointer idle time before the cursor is hidden
    pub cursor_idle_ms: u64,
    /// Startup hint starts fading
    pub hint_fade_ms: u64,
    /// Startup hint is removed
    pub hint_remove_ms: u64,
}

impl Default for ShellTimings {
    fn default() -> Self {
        Self {
            double_enter_ms: 400,
            click_delay_ms: 250,
            cursor_idle_ms: 2000,
            hint_fade_ms: 4000,
            hint_remove_ms: 5000,
        }
    }
}

impl ShellTimings {
    fn validate(&self) -> Result<()> {
        let windows = [
            ("double_enter_ms", self.double_enter_ms),
            ("click_delay_ms", self.click_delay_ms),
            ("cursor_idle_ms", self.cursor_idle_ms),
            ("hint_fade_ms", self.hint_fade_ms),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, value)| *value == 0) {
            return Err(Error::InvalidConfig(format!("timings.{} must be positive", name)));
        }
        if self.hint_remove_ms < self.hint_fade_ms {
            return Err(Error::InvalidConfig(
                "timings.hint_remove_ms must not be below timings.hint_fade_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn double_enter(&self) -> Duration {
        Duration::from_millis(self.double_enter_ms)
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }

    pub fn cursor_idle(&self) -> Duration {
        Duration::from_millis(self.cursor_idle_ms)
    }

    pub fn hint_fade(&self) -> Duration {
        Duration::from_millis(self.hint_fade_ms)
    }

    pub fn hint_remove(&self) -> Duration {
        Duration::from_millis(self.hint_remove_ms)
    }
}

/// External player process settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalPlayerConfig {
    /// Executable name or path
    pub command: String,
    /// Arguments added before the variant-specific ones
    pub extra_args: Vec<String>,
}

impl Default for ExternalPlayerConfig {
    fn default() -> Self {
        Self {
            command: "mpv".to_string(),
            extra_args: Vec::new(),
        }
    }
}
