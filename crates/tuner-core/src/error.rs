//! Error types for Tuner Core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Playlist errors
    #[error("Failed to fetch playlist: {0}")]
    PlaylistFetch(String),

    #[error("Failed to parse playlist: {0}")]
    PlaylistParse(String),

    #[error("Playlist contains no channels")]
    EmptyPlaylist,

    // Switching errors
    #[error("Channel {index} out of range (playlist has {len} channels)")]
    ChannelOutOfRange { index: usize, len: usize },

    #[error("Invalid stream URL '{url}': {reason}")]
    InvalidStreamUrl { url: String, reason: String },

    // Playback errors
    #[error("Playback failed to start for {url}: {reason}")]
    PlaybackStart { url: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a playback start error
    pub fn playback(url: impl Into<String>, reason: impl ToString) -> Self {
        Error::PlaybackStart {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for failures of the playlist load, which are shown to the user.
    ///
    /// Every other error is logged and swallowed by the player.
    pub fn is_playlist_error(&self) -> bool {
        matches!(
            self,
            Error::PlaylistFetch(_) | Error::PlaylistParse(_) | Error::EmptyPlaylist | Error::Io(_)
        )
    }

    /// Returns the error code for log correlation
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::PlaylistFetch(_) => "PLAYLIST_FETCH",
            Error::PlaylistParse(_) => "PLAYLIST_PARSE",
            Error::EmptyPlaylist => "PLAYLIST_EMPTY",
            Error::ChannelOutOfRange { .. } => "CHANNEL_RANGE",
            Error::InvalidStreamUrl { .. } => "STREAM_URL",
            Error::PlaybackStart { .. } => "PLAYBACK_START",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Network(_) => "NETWORK",
            Error::Io(_) => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_errors_are_surfaced() {
        assert!(Error::PlaylistFetch("404".into()).is_playlist_error());
        assert!(Error::EmptyPlaylist.is_playlist_error());
        assert!(!Error::playback("http://a/b.ts", "codec").is_playlist_error());
    }

    #[test]
    fn test_error_display() {
        let err = Error::ChannelOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Channel 4 out of range (playlist has 2 channels)");
        assert_eq!(err.error_code(), "CHANNEL_RANGE");
    }
}
