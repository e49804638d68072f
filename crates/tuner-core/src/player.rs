//! Player - the single owner of playlist, switcher and shell state
//!
//! Front ends feed input events in and render the returned actions. Channel
//! selection, fullscreen and resume are applied to the active session here
//! before the actions are handed back.

use crate::{
    config::PlayerConfig,
    engine::PlaybackBackend,
    playlist::PlaylistLoader,
    shell::{InputEvent, Shell, ShellAction},
    switcher::ChannelSwitcher,
    types::{Channel, Playlist, SwitcherState},
    Result,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Surfaces errors the user has to see
pub trait Notifier: Send + Sync {
    /// Show `message` to the user
    fn alert(&self, message: &str);
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, message: &str) {
        error!(alert = message, "Alert");
    }
}

/// Channel player controller
pub struct Player {
    config: PlayerConfig,
    loader: PlaylistLoader,
    playlist: Playlist,
    switcher: ChannelSwitcher,
    shell: Shell,
    notifier: Arc<dyn Notifier>,
}

impl Player {
    pub fn new(
        config: PlayerConfig,
        backend: Arc<dyn PlaybackBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;

        let loader = PlaylistLoader::new(config.playlist_timeout())?;
        let switcher = ChannelSwitcher::new(backend, config.tuning.clone());
        let shell = Shell::new(config.timings.clone(), Instant::now());

        Ok(Self {
            config,
            loader,
            playlist: Playlist::default(),
            switcher,
            shell,
            notifier,
        })
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn channels(&self) -> &[Channel] {
        &self.playlist.channels
    }

    pub fn switcher(&self) -> &ChannelSwitcher {
        &self.switcher
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut Shell {
        &mut self.shell
    }

    pub fn state(&self) -> SwitcherState {
        self.switcher.state()
    }

    /// Index of the channel last selected
    pub fn current_index(&self) -> Option<usize> {
        self.switcher.current_index()
    }

    /// Load the configured playlist
    pub async fn load_default_playlist(&mut self) -> Result<()> {
        let source = self.config.playlist.clone();
        self.load_playlist(&source).await
    }

    /// Replace the channel list from `source` and start the first channel
    ///
    /// On failure the user is alerted and the channel list stays empty.
    #[instrument(skip(self))]
    pub async fn load_playlist(&mut self, source: &str) -> Result<()> {
        self.clear().await;

        match self.loader.load(source).await {
            Ok(playlist) => self.set_playlist(playlist).await,
            Err(e) => {
                error!(code = e.error_code(), error = %e, "Playlist load failed");
                self.notifier
                    .alert(&format!("Unable to load playlist: {}", e));
                Err(e)
            }
        }
    }

    /// Use an already parsed playlist and start its first channel
    pub async fn set_playlist(&mut self, playlist: Playlist) -> Result<()> {
        self.clear().await;

        info!(source = %playlist.source, channels = playlist.len(), "Using playlist");
        self.shell.set_channels(playlist.len());
        self.playlist = playlist;

        if !self.playlist.is_empty() {
            self.select_channel(0).await?;
        }
        Ok(())
    }

    async fn clear(&mut self) {
        self.switcher.reset().await;
        self.playlist = Playlist::default();
        self.shell.set_channels(0);
    }

    /// Switch to the channel at `index`
    pub async fn select_channel(&mut self, index: usize) -> Result<SwitcherState> {
        let state = self
            .switcher
            .select_channel(&self.playlist.channels, index)
            .await?;
        self.shell.set_current(index);
        Ok(state)
    }

    /// Feed one input event
    pub async fn handle_input(&mut self, event: InputEvent, now: Instant) -> Vec<ShellAction> {
        let actions = self.shell.handle(event, now);
        self.apply(&actions).await;
        actions
    }

    /// Fire due timers
    pub async fn tick(&mut self, now: Instant) -> Vec<ShellAction> {
        let actions = self.shell.tick(now);
        self.apply(&actions).await;
        actions
    }

    async fn apply(&mut self, actions: &[ShellAction]) {
        for action in actions {
            match action {
                ShellAction::Select(index) => {
                    if let Err(e) = self.select_channel(*index).await {
                        warn!(index, error = %e, "Selection ignored");
                    }
                }
                ShellAction::ToggleFullscreen => {
                    let fullscreen = self.shell.is_fullscreen();
                    self.switcher.set_fullscreen(fullscreen).await;
                }
                ShellAction::Resume => self.switcher.resume().await,
                _ => {}
            }
        }
    }

    /// Release the active session
    pub async fn shutdown(&mut self) {
        self.switcher.stop().await;
    }
}
