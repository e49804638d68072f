//! Core types for Tuner

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Playlist Types
// =============================================================================

/// Optional metadata carried on an `#EXTINF` line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAttributes {
    /// EPG identifier (`tvg-id`)
    pub tvg_id: Option<String>,
    /// Logo URL (`tvg-logo`)
    pub logo: Option<String>,
    /// Group name (`group-title`)
    pub group: Option<String>,
}

impl ChannelAttributes {
    pub fn is_empty(&self) -> bool {
        self.tvg_id.is_none() && self.logo.is_none() && self.group.is_none()
    }
}

/// A named stream entry from a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Display name
    pub name: String,
    /// Stream URL, as written in the playlist
    pub url: String,
    /// Extra metadata
    #[serde(default, skip_serializing_if = "ChannelAttributes::is_empty")]
    pub attributes: ChannelAttributes,
}

impl Channel {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            attributes: ChannelAttributes::default(),
        }
    }

    /// Default display name for the channel at a 0-based position
    pub fn default_name(index: usize) -> String {
        format!("Channel {}", index + 1)
    }
}

/// Ordered channel list together with where it came from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Playlist {
    /// URL or path the playlist was loaded from
    pub source: String,
    /// Channels in playlist order
    pub channels: Vec<Channel>,
}

impl Playlist {
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }
}

// =============================================================================
// Playback Types
// =============================================================================

/// Playback strategy chosen for a stream URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamVariant {
    /// HLS through an adaptive streaming engine
    AdaptiveHls,
    /// MPEG-DASH through an adaptive streaming engine
    AdaptiveDash,
    /// Progressive/direct playback by the native media element
    Direct,
}

impl std::fmt::Display for StreamVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamVariant::AdaptiveHls => write!(f, "hls"),
            StreamVariant::AdaptiveDash => write!(f, "dash"),
            StreamVariant::Direct => write!(f, "direct"),
        }
    }
}

/// Channel switcher state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitcherState {
    /// No session is running
    Idle,
    /// A session for `index` is running
    Active {
        index: usize,
        variant: StreamVariant,
        session_id: SessionId,
    },
}

impl SwitcherState {
    pub fn is_active(&self) -> bool {
        matches!(self, SwitcherState::Active { .. })
    }
}

impl std::fmt::Display for SwitcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitcherState::Idle => write!(f, "idle"),
            SwitcherState::Active { index, variant, .. } => {
                write!(f, "active({}, {})", index, variant)
            }
        }
    }
}
