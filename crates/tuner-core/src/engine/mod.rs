//! Playback engines for HLS, DASH and direct streams
//!
//! A [`PlaybackBackend`] is the external streaming capability: it turns a
//! classified stream URL into a running [`StreamSession`] and warms metadata
//! for channels that are likely to be selected next.

mod http;

pub use http::HttpBackend;

use crate::{config::SessionTuning, types::StreamVariant, Result, SessionId};
use async_trait::async_trait;
use url::Url;

/// Variants a backend can play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// An adaptive HLS engine is available
    pub hls: bool,
    /// An adaptive DASH engine is available
    pub dash: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            hls: true,
            dash: true,
        }
    }
}

/// Everything needed to open one session
#[derive(Debug, Clone)]
pub struct OpenRequest<'a> {
    pub session_id: SessionId,
    pub url: &'a Url,
    pub variant: StreamVariant,
    pub tuning: &'a SessionTuning,
}

/// The external streaming capability
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Adaptive engines this backend provides
    fn capabilities(&self) -> Capabilities;

    /// Create a session for the requested variant without starting playback
    async fn open(&self, request: OpenRequest<'_>) -> Result<Box<dyn StreamSession>>;

    /// Issue a detached metadata-only request for `url`
    fn warm(&self, url: &Url);
}

/// A live binding between the backend and one channel's stream
#[async_trait]
pub trait StreamSession: Send {
    fn id(&self) -> SessionId;

    fn variant(&self) -> StreamVariant;

    /// Start playback
    async fn start(&mut self) -> Result<()>;

    /// Enter or leave fullscreen while playing
    async fn set_fullscreen(&mut self, _fullscreen: bool) -> Result<()> {
        Ok(())
    }

    /// Continue playback after the stream was paused
    async fn resume(&mut self) -> Result<()> {
        Ok(())
    }

    /// Stop playback and release decoder and network resources
    async fn release(self: Box<Self>);
}

/// Pick the playback variant for a stream URL
///
/// `.m3u8` goes to the HLS engine when the backend has one, `.mpd` to the
/// DASH engine, anything else is played directly. A `.m3u8` stream without
/// an HLS engine falls through to direct playback.
pub fn classify(url: &str, capabilities: Capabilities) -> StreamVariant {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    };

    if path.ends_with(".m3u8") && capabilities.hls {
        return StreamVariant::AdaptiveHls;
    }
    if path.ends_with(".mpd") && capabilities.dash {
        return StreamVariant::AdaptiveDash;
    }

    StreamVariant::Direct
}
