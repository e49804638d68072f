//! Channel Switcher - owns the single active playback session
//!
//! Each switch:
//! - releases the previous session completely
//! - classifies the target URL into a stream variant
//! - opens and starts a session with the low-latency tuning
//! - preloads the following channel

use crate::{
    config::SessionTuning,
    engine::{classify, OpenRequest, PlaybackBackend, StreamSession},
    preload::Preloader,
    types::{Channel, StreamVariant, SwitcherState},
    Error, Result, SessionId,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Channel switcher state machine
pub struct ChannelSwitcher {
    /// Streaming delegate
    backend: Arc<dyn PlaybackBackend>,
    /// Parameters handed to every new session
    tuning: SessionTuning,
    /// The active session, if any
    session: Option<Box<dyn StreamSession>>,
    /// Current state
    state: SwitcherState,
    /// State change broadcaster
    state_tx: watch::Sender<SwitcherState>,
    /// Last selected channel
    current_index: Option<usize>,
    /// Next-channel warmer
    preloader: Preloader,
    /// Completed calls to `select_channel`
    switches: u64,
    /// Sessions released
    teardowns: u64,
}

impl ChannelSwitcher {
    pub fn new(backend: Arc<dyn PlaybackBackend>, tuning: SessionTuning) -> Self {
        let (state_tx, _) = watch::channel(SwitcherState::Idle);

        Self {
            backend,
            tuning,
            session: None,
            state: SwitcherState::Idle,
            state_tx,
            current_index: None,
            preloader: Preloader::new(),
            switches: 0,
            teardowns: 0,
        }
    }

    pub fn state(&self) -> SwitcherState {
        self.state
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SwitcherState> {
        self.state_tx.subscribe()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Variant of the running session
    pub fn current_variant(&self) -> Option<StreamVariant> {
        self.session.as_ref().map(|s| s.variant())
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn switches(&self) -> u64 {
        self.switches
    }

    pub fn teardowns(&self) -> u64 {
        self.teardowns
    }

    pub fn preloader(&self) -> &Preloader {
        &self.preloader
    }

    fn set_state(&mut self, new_state: SwitcherState) {
        if self.state != new_state {
            info!(from = %self.state, to = %new_state, "State transition");
        }
        self.state = new_state;
        let _ = self.state_tx.send(new_state);
    }

    /// Switch playback to `channels[index]`
    ///
    /// Failures to open or start the stream are logged and swallowed; the
    /// current index moves to `index` regardless.
    #[instrument(skip(self, channels), fields(channels = channels.len()))]
    pub async fn select_channel(&mut self, channels: &[Channel], index: usize) -> Result<SwitcherState> {
        let channel = channels.get(index).ok_or(Error::ChannelOutOfRange {
            index,
            len: channels.len(),
        })?;

        self.teardown().await;

        let variant = classify(&channel.url, self.backend.capabilities());
        info!(index, name = %channel.name, url = %channel.url, variant = %variant, "Switching channel");

        match self.open(&channel.url, variant).await {
            Ok(mut session) => {
                if let Err(e) = session.start().await {
                    warn!(index, code = e.error_code(), error = %e, "Playback did not start");
                }
                let session_id = session.id();
                self.session = Some(session);
                self.set_state(SwitcherState::Active {
                    index,
                    variant,
                    session_id,
                });
            }
            Err(e) => {
                warn!(index, code = e.error_code(), error = %e, "Could not open session");
                self.set_state(SwitcherState::Idle);
            }
        }

        self.current_index = Some(index);
        self.switches += 1;

        let next = (index + 1) % channels.len();
        self.preloader
            .preload(next, &channels[next].url, self.backend.as_ref());

        Ok(self.state)
    }

    async fn open(&self, url: &str, variant: StreamVariant) -> Result<Box<dyn StreamSession>> {
        let url = Url::parse(url).map_err(|e| Error::InvalidStreamUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        self.backend
            .open(OpenRequest {
                session_id: SessionId::new(),
                url: &url,
                variant,
                tuning: &self.tuning,
            })
            .await
    }

    /// Release the active session, if any
    async fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(session_id = %session.id(), variant = %session.variant(), "Releasing session");
            session.release().await;
            self.teardowns += 1;
        }
    }

    /// Apply a fullscreen change to the active session
    pub async fn set_fullscreen(&mut self, fullscreen: bool) {
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.set_fullscreen(fullscreen).await {
                warn!(session_id = %session.id(), code = e.error_code(), error = %e, "Fullscreen not applied");
            }
        }
    }

    /// Resume the active session after a pause
    pub async fn resume(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.resume().await {
                warn!(session_id = %session.id(), code = e.error_code(), error = %e, "Resume failed");
            }
        }
    }

    /// Stop playback and return to idle
    #[instrument(skip(self))]
    pub async fn stop(&mut self) {
        self.teardown().await;
        self.set_state(SwitcherState::Idle);
    }

    /// Stop playback and forget all per-playlist state, before a new playlist is used
    pub async fn reset(&mut self) {
        self.stop().await;
        self.current_index = None;
        self.preloader.clear();
    }
}
