//! External player backend
//!
//! Each session runs one player process (mpv by default) with arguments
//! derived from the variant's low-latency tuning. Fullscreen and resume reach
//! the running process over mpv's JSON IPC socket. Releasing a session kills
//! and reaps the process before the next one is spawned.

use crate::ipc::{self, MpvIpc};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tuner_core::config::{ExternalPlayerConfig, SessionTuning};
use tuner_core::{
    Capabilities, Error, HttpBackend, OpenRequest, PlaybackBackend, Result, SessionId,
    StreamSession, StreamVariant,
};
use url::Url;

/// Timeout for preload requests
const WARM_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend that hands streams to an external player process
pub struct ExternalPlayerBackend {
    config: ExternalPlayerConfig,
    /// Metadata preloads go through the HTTP backend
    http: HttpBackend,
    /// Start new sessions fullscreen
    fullscreen: Arc<AtomicBool>,
    /// Receives the session id whenever a player pauses
    paused: Option<mpsc::UnboundedSender<SessionId>>,
}

impl ExternalPlayerBackend {
    pub fn new(config: ExternalPlayerConfig) -> Result<Self> {
        Ok(Self {
            config,
            http: HttpBackend::new(WARM_TIMEOUT)?,
            fullscreen: Arc::new(AtomicBool::new(false)),
            paused: None,
        })
    }

    /// Report player pauses on `paused`
    pub fn with_pause_events(mut self, paused: mpsc::UnboundedSender<SessionId>) -> Self {
        self.paused = Some(paused);
        self
    }

    /// Shared flag read whenever a session is opened
    pub fn fullscreen_flag(&self) -> Arc<AtomicBool> {
        self.fullscreen.clone()
    }
}

#[async_trait]
impl PlaybackBackend for ExternalPlayerBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn open(&self, request: OpenRequest<'_>) -> Result<Box<dyn StreamSession>> {
        let socket = ipc::socket_path(request.session_id);
        let args = player_args(
            &self.config,
            request.variant,
            request.tuning,
            self.fullscreen.load(Ordering::Relaxed),
            Some(&socket),
            request.url,
        );

        debug!(session_id = %request.session_id, command = %self.config.command, ?args, "Prepared player");

        Ok(Box::new(ProcessSession {
            id: request.session_id,
            variant: request.variant,
            url: request.url.clone(),
            command: self.config.command.clone(),
            args,
            socket,
            paused: self.paused.clone(),
            child: None,
            ipc: None,
        }))
    }

    fn warm(&self, url: &Url) {
        self.http.warm(url);
    }
}

/// Build the player command line for one stream
pub fn player_args(
    config: &ExternalPlayerConfig,
    variant: StreamVariant,
    tuning: &SessionTuning,
    fullscreen: bool,
    ipc_socket: Option<&Path>,
    url: &Url,
) -> Vec<String> {
    let mut args = config.extra_args.clone();
    args.push("--really-quiet".to_string());
    args.push("--force-window=immediate".to_string());
    if let Some(socket) = ipc_socket {
        args.push(format!("--input-ipc-server={}", socket.display()));
    }

    match variant {
        StreamVariant::AdaptiveHls => {
            let hls = &tuning.hls;
            args.push(format!("--cache-secs={}", hls.max_buffer_length));
            // Level 0 is the lowest bitrate
            if hls.start_level == 0 {
                args.push("--hls-bitrate=min".to_string());
            }
            if hls.low_latency_mode {
                args.push("--profile=low-latency".to_string());
            }
            args.push(format!(
                "--demuxer-lavf-o=live_start_index=-{}",
                hls.live_sync_duration.ceil().max(1.0) as u64
            ));
        }
        StreamVariant::AdaptiveDash => {
            let dash = &tuning.dash;
            args.push(format!("--cache-secs={}", dash.buffering_goal));
            args.push(format!("--cache-pause-wait={}", dash.rebuffering_goal));
            if dash.low_latency_mode {
                args.push("--profile=low-latency".to_string());
            }
        }
        StreamVariant::Direct => {}
    }

    if fullscreen {
        args.push("--fs".to_string());
    }

    args.push(url.to_string());
    args
}

struct ProcessSession {
    id: SessionId,
    variant: StreamVariant,
    url: Url,
    command: String,
    args: Vec<String>,
    socket: PathBuf,
    paused: Option<mpsc::UnboundedSender<SessionId>>,
    child: Option<Child>,
    ipc: Option<MpvIpc>,
}

impl ProcessSession {
    fn ipc(&self) -> Result<&MpvIpc> {
        self.ipc
            .as_ref()
            .ok_or_else(|| Error::playback(self.url.as_str(), "player not running"))
    }

    fn set_property(&self, name: &str, value: serde_json::Value) -> Result<()> {
        self.ipc()?
            .set_property(name, value)
            .map_err(|e| Error::playback(self.url.as_str(), e))
    }
}

#[async_trait]
impl StreamSession for ProcessSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn variant(&self) -> StreamVariant {
        self.variant
    }

    async fn start(&mut self) -> Result<()> {
        let child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::playback(self.url.as_str(), format!("{}: {}", self.command, e)))?;

        info!(session_id = %self.id, pid = ?child.id(), variant = %self.variant, "Player started");
        self.child = Some(child);
        self.ipc = Some(MpvIpc::spawn(self.socket.clone(), self.id, self.paused.clone()));
        Ok(())
    }

    async fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()> {
        debug!(session_id = %self.id, fullscreen, "Setting fullscreen");
        self.set_property("fullscreen", json!(fullscreen))
    }

    async fn resume(&mut self) -> Result<()> {
        debug!(session_id = %self.id, "Resuming player");
        self.set_property("pause", json!(false))
    }

    async fn release(self: Box<Self>) {
        let ProcessSession { id, child, ipc, .. } = *self;
        if let Some(ipc) = ipc {
            ipc.close().await;
        }
        if let Some(mut child) = child {
            match child.kill().await {
                Ok(()) => debug!(session_id = %id, "Player stopped"),
                Err(e) => warn!(session_id = %id, error = %e, "Could not stop player"),
            }
        }
    }
}
