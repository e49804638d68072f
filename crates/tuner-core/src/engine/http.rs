//! Headless HTTP backend
//!
//! Drives each variant as far as the network allows without decoding:
//! - HLS: multivariant playlist, start level selection, media playlist, live edge
//! - DASH: MPD fetch and root element validation
//! - Direct: first bytes of the stream

use super::{Capabilities, OpenRequest, PlaybackBackend, StreamSession};
use crate::{
    config::{DashTuning, HlsTuning},
    error::Error,
    types::StreamVariant,
    Result, SessionId,
};
use async_trait::async_trait;
use m3u8_rs::Playlist as HlsPlaylist;
use quick_xml::{events::Event, Reader};
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Bytes requested when probing a direct stream
const DIRECT_PROBE_BYTES: u64 = 64 * 1024;

/// Backend that plays sessions headlessly over HTTP
pub struct HttpBackend {
    client: Client,
    capabilities: Capabilities,
}

impl HttpBackend {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            capabilities: Capabilities::default(),
        }
    }
}

#[async_trait]
impl PlaybackBackend for HttpBackend {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn open(&self, request: OpenRequest<'_>) -> Result<Box<dyn StreamSession>> {
        let base = SessionBase {
            id: request.session_id,
            url: request.url.clone(),
            client: self.client.clone(),
        };

        let session: Box<dyn StreamSession> = match request.variant {
            StreamVariant::AdaptiveHls => Box::new(HlsSession {
                base,
                tuning: request.tuning.hls.clone(),
                live_edge: None,
            }),
            StreamVariant::AdaptiveDash => Box::new(DashSession {
                base,
                tuning: request.tuning.dash.clone(),
                is_live: None,
            }),
            StreamVariant::Direct => Box::new(DirectSession { base }),
        };

        debug!(session_id = %request.session_id, variant = %request.variant, "Session opened");
        Ok(session)
    }

    fn warm(&self, url: &Url) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(url = %url, "No runtime available, skipping preload");
            return;
        };

        let client = self.client.clone();
        let url = url.clone();
        handle.spawn(async move {
            match client.head(url.clone()).send().await {
                Ok(response) => debug!(url = %url, status = %response.status(), "Preload finished"),
                Err(e) => debug!(url = %url, error = %e, "Preload failed"),
            }
        });
    }
}

/// State shared by all session kinds
struct SessionBase {
    id: SessionId,
    url: Url,
    client: Client,
}

impl SessionBase {
    async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::playback(url.as_str(), e))?;

        if !response.status().is_success() {
            return Err(Error::playback(
                url.as_str(),
                format!("HTTP {}", response.status()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| Error::playback(url.as_str(), e))
    }
}

/// Position to start a live stream at, `sync` seconds behind the edge
fn live_start_position(window: f64, sync: f64) -> f64 {
    (window - sync).max(0.0)
}

struct HlsSession {
    base: SessionBase,
    tuning: HlsTuning,
    /// Start position behind the live edge, set once the media playlist is parsed
    live_edge: Option<f64>,
}

impl HlsSession {
    /// Resolve the media playlist to play from a multivariant or media playlist
    async fn select_media(&self) -> Result<(Url, Option<m3u8_rs::MediaPlaylist>)> {
        let url = &self.base.url;
        let content = self.base.get_text(url).await?;

        let playlist = m3u8_rs::parse_playlist_res(content.as_bytes())
            .map_err(|e| Error::playback(url.as_str(), format!("invalid HLS playlist: {:?}", e)))?;

        match playlist {
            HlsPlaylist::MediaPlaylist(media) => Ok((url.clone(), Some(media))),
            HlsPlaylist::MasterPlaylist(master) => {
                let mut variants: Vec<_> = master
                    .variants
                    .iter()
                    .filter(|v| !v.is_i_frame)
                    .collect();
                variants.sort_by_key(|v| v.bandwidth);

                if variants.is_empty() {
                    return Err(Error::playback(url.as_str(), "no variants in HLS playlist"));
                }

                let level = self.tuning.start_level.min(variants.len() - 1);
                let variant = variants[level];
                let media_url = url
                    .join(&variant.uri)
                    .map_err(|e| Error::playback(url.as_str(), e))?;

                info!(
                    session_id = %self.base.id,
                    levels = variants.len(),
                    level,
                    bandwidth = variant.bandwidth,
                    "Manifest parsed"
                );

                Ok((media_url, None))
            }
        }
    }
}

#[async_trait]
impl StreamSession for HlsSession {
    fn id(&self) -> SessionId {
        self.base.id
    }

    fn variant(&self) -> StreamVariant {
        StreamVariant::AdaptiveHls
    }

    #[instrument(skip(self), fields(session_id = %self.base.id, url = %self.base.url))]
    async fn start(&mut self) -> Result<()> {
        let (media_url, media) = self.select_media().await?;

        if !self.tuning.auto_start_load {
            debug!("Automatic loading disabled, waiting at manifest");
            return Ok(());
        }

        let media = match media {
            Some(media) => media,
            None => {
                let content = self.base.get_text(&media_url).await?;
                m3u8_rs::parse_media_playlist_res(content.as_bytes()).map_err(|e| {
                    Error::playback(media_url.as_str(), format!("invalid media playlist: {:?}", e))
                })?
            }
        };

        if media.segments.is_empty() {
            return Err(Error::playback(media_url.as_str(), "media playlist has no segments"));
        }

        let window: f64 = media.segments.iter().map(|s| s.duration as f64).sum();
        if media.end_list {
            self.live_edge = None;
            info!(duration = window, "Playing VOD stream");
        } else {
            let position = live_start_position(window, self.tuning.live_sync_duration);
            self.live_edge = Some(position);
            info!(
                window,
                position,
                max_latency = self.tuning.live_max_latency_duration,
                low_latency = self.tuning.low_latency_mode,
                "Playing live stream"
            );
        }

        Ok(())
    }

    async fn release(self: Box<Self>) {
        debug!(session_id = %self.base.id, live_edge = ?self.live_edge, "HLS session released");
    }
}

/// Check that `content` is an MPD document and report whether it is live
fn parse_mpd_root(content: &str) -> std::result::Result<bool, String> {
    let mut reader = Reader::from_str(content);

    loop {
        match reader.read_event() {
            Ok(Event::Start(root)) | Ok(Event::Empty(root)) => {
                if root.local_name().as_ref() != b"MPD" {
                    return Err(format!(
                        "root element <{}> is not an MPD",
                        String::from_utf8_lossy(root.name().as_ref())
                    ));
                }
                return match root.try_get_attribute("type") {
                    Ok(Some(kind)) => Ok(kind.value.as_ref() == b"dynamic"),
                    Ok(None) => Ok(false),
                    Err(e) => Err(format!("invalid MPD attributes: {}", e)),
                };
            }
            Ok(Event::Eof) => return Err("response is not an MPD".to_string()),
            Err(e) => return Err(format!("invalid MPD: {}", e)),
            // Declaration, comments, doctype
            Ok(_) => {}
        }
    }
}

struct DashSession {
    base: SessionBase,
    tuning: DashTuning,
    is_live: Option<bool>,
}

#[async_trait]
impl StreamSession for DashSession {
    fn id(&self) -> SessionId {
        self.base.id
    }

    fn variant(&self) -> StreamVariant {
        StreamVariant::AdaptiveDash
    }

    #[instrument(skip(self), fields(session_id = %self.base.id, url = %self.base.url))]
    async fn start(&mut self) -> Result<()> {
        let content = self.base.get_text(&self.base.url).await?;

        let is_live = parse_mpd_root(&content)
            .map_err(|reason| Error::playback(self.base.url.as_str(), reason))?;
        self.is_live = Some(is_live);

        info!(
            is_live,
            buffering_goal = self.tuning.buffering_goal,
            rebuffering_goal = self.tuning.rebuffering_goal,
            abr = self.tuning.abr_enabled,
            "Manifest parsed"
        );

        Ok(())
    }

    async fn release(self: Box<Self>) {
        debug!(session_id = %self.base.id, is_live = ?self.is_live, "DASH session released");
    }
}

struct DirectSession {
    base: SessionBase,
}

#[async_trait]
impl StreamSession for DirectSession {
    fn id(&self) -> SessionId {
        self.base.id
    }

    fn variant(&self) -> StreamVariant {
        StreamVariant::Direct
    }

    #[instrument(skip(self), fields(session_id = %self.base.id, url = %self.base.url))]
    async fn start(&mut self) -> Result<()> {
        let url = &self.base.url;
        let response = self
            .base
            .client
            .get(url.clone())
            .header(header::RANGE, format!("bytes=0-{}", DIRECT_PROBE_BYTES - 1))
            .send()
            .await
            .map_err(|e| Error::playback(url.as_str(), e))?;

        if !response.status().is_success() {
            return Err(Error::playback(
                url.as_str(),
                format!("HTTP {}", response.status()),
            ));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        info!(status = %response.status(), content_type = %content_type, "Direct stream opened");
        Ok(())
    }

    async fn release(self: Box<Self>) {
        debug!(session_id = %self.base.id, "Direct session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionTuning;

    #[test]
    fn test_live_start_position() {
        assert_eq!(live_start_position(12.0, 2.0), 10.0);
        assert_eq!(live_start_position(1.0, 2.0), 0.0);
    }

    #[test]
    fn test_mpd_root_detection() {
        let live = r#"<?xml version="1.0"?>
<!-- packager -->
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="dynamic" minimumUpdatePeriod="PT2S">
  <Period/>
</MPD>"#;
        let vod = r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" mediaPresentationDuration="PT60S"></MPD>"#;
        let prefixed = r#"<dash:MPD xmlns:dash="urn:mpeg:dash:schema:mpd:2011" type="static"/>"#;

        assert_eq!(parse_mpd_root(live), Ok(true));
        assert_eq!(parse_mpd_root(vod), Ok(false));
        assert_eq!(parse_mpd_root(prefixed), Ok(false));
    }

    #[test]
    fn test_non_mpd_documents_rejected() {
        let html = "<html><body><!-- <MPD type=\"dynamic\"> --><p>type=\"dynamic\"</p></body></html>";
        assert!(parse_mpd_root(html).is_err());
        assert!(parse_mpd_root("").is_err());
        assert!(parse_mpd_root("#EXTM3U\n").is_err());
    }

    #[tokio::test]
    async fn test_open_selects_session_kind() {
        let backend = HttpBackend::new(Duration::from_secs(1)).unwrap();
        let tuning = SessionTuning::default();
        let url = Url::parse("http://127.0.0.1:9/live.mpd").unwrap();

        for variant in [
            StreamVariant::AdaptiveHls,
            StreamVariant::AdaptiveDash,
            StreamVariant::Direct,
        ] {
            let session_id = SessionId::new();
            let session = backend
                .open(OpenRequest {
                    session_id,
                    url: &url,
                    variant,
                    tuning: &tuning,
                })
                .await
                .unwrap();

            assert_eq!(session.variant(), variant);
            assert_eq!(session.id(), session_id);
            session.release().await;
        }
    }

    #[tokio::test]
    async fn test_start_failure_is_playback_error() {
        let backend = HttpBackend::new(Duration::from_millis(500)).unwrap();
        let tuning = SessionTuning::default();
        // Port 9 (discard) is closed on test hosts, so the connection is refused
        let url = Url::parse("http://127.0.0.1:9/stream.ts").unwrap();

        let mut session = backend
            .open(OpenRequest {
                session_id: SessionId::new(),
                url: &url,
                variant: StreamVariant::Direct,
                tuning: &tuning,
            })
            .await
            .unwrap();

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, Error::PlaybackStart { .. }));
    }

    #[test]
    fn test_warm_without_runtime_is_noop() {
        let backend = HttpBackend::new(Duration::from_secs(1)).unwrap();
        backend.warm(&Url::parse("http://127.0.0.1:9/next.m3u8").unwrap());
    }
}
