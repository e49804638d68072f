//! Integration tests for Tuner Core

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};
use url::Url;

use tuner_core::{
    parse_playlist, Capabilities, Channel, Error, InputEvent, Key, Notifier, OpenRequest,
    PlaybackBackend, Player, PlayerConfig, Playlist, SessionId, ShellAction, StreamSession,
    StreamVariant, SwitcherState,
};

// =============================================================================
// Test doubles
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Open(String, StreamVariant),
    Start(String),
    Release(String),
    Warm(String),
    Fullscreen(String, bool),
    Resume(String),
}

#[derive(Default)]
struct RecordingBackend {
    calls: Arc<Mutex<Vec<Call>>>,
    /// URLs whose sessions fail to start
    failing: Vec<String>,
    no_hls: bool,
}

impl RecordingBackend {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }
}

struct RecordingSession {
    id: SessionId,
    url: String,
    variant: StreamVariant,
    fail_start: bool,
    calls: Arc<Mutex<Vec<Call>>>,
}

#[async_trait]
impl StreamSession for RecordingSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn variant(&self) -> StreamVariant {
        self.variant
    }

    async fn start(&mut self) -> tuner_core::Result<()> {
        self.calls.lock().unwrap().push(Call::Start(self.url.clone()));
        if self.fail_start {
            return Err(Error::playback(self.url.clone(), "autoplay blocked"));
        }
        Ok(())
    }

    async fn set_fullscreen(&mut self, fullscreen: bool) -> tuner_core::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Fullscreen(self.url.clone(), fullscreen));
        Ok(())
    }

    async fn resume(&mut self) -> tuner_core::Result<()> {
        self.calls.lock().unwrap().push(Call::Resume(self.url.clone()));
        Ok(())
    }

    async fn release(self: Box<Self>) {
        self.calls.lock().unwrap().push(Call::Release(self.url.clone()));
    }
}

#[async_trait]
impl PlaybackBackend for RecordingBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            hls: !self.no_hls,
            dash: true,
        }
    }

    async fn open(&self, request: OpenRequest<'_>) -> tuner_core::Result<Box<dyn StreamSession>> {
        let url = request.url.to_string();
        self.calls
            .lock()
            .unwrap()
            .push(Call::Open(url.clone(), request.variant));

        Ok(Box::new(RecordingSession {
            id: request.session_id,
            fail_start: self.failing.contains(&url),
            url,
            variant: request.variant,
            calls: self.calls.clone(),
        }))
    }

    fn warm(&self, url: &Url) {
        self.calls.lock().unwrap().push(Call::Warm(url.to_string()));
    }
}

#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}

const EXAMPLE: &str = "#EXTINF:-1,News\nhttp://a/news.m3u8\nhttp://b/direct.ts";

fn playlist(content: &str) -> Playlist {
    Playlist {
        source: "memory".to_string(),
        channels: parse_playlist(content),
    }
}

fn player(backend: Arc<RecordingBackend>) -> (Player, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let player = Player::new(PlayerConfig::default(), backend, notifier.clone()).unwrap();
    (player, notifier)
}

// =============================================================================
// Playlist Tests
// =============================================================================

#[test]
fn test_example_playlist() {
    let channels = parse_playlist(EXAMPLE);
    assert_eq!(
        channels,
        vec![
            Channel::new("News", "http://a/news.m3u8"),
            Channel::new("Channel 2", "http://b/direct.ts"),
        ]
    );
}

#[test]
fn test_channel_count_equals_url_lines() {
    let content = "#EXTM3U\n# comment\n\nhttp://a/1\n#EXTINF:-1,Two\nhttp://a/2\n\n\nhttp://a/3\n";
    let expected = content
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.trim().starts_with('#'))
        .count();

    assert_eq!(parse_playlist(content).len(), expected);
}

// =============================================================================
// Switching Tests
// =============================================================================

#[tokio::test]
async fn test_example_variants() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());

    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);
    assert!(matches!(
        player.state(),
        SwitcherState::Active { index: 0, variant: StreamVariant::AdaptiveHls, .. }
    ));

    assert_ok!(player.select_channel(1).await);
    assert!(matches!(
        player.state(),
        SwitcherState::Active { index: 1, variant: StreamVariant::Direct, .. }
    ));
}

#[tokio::test]
async fn test_release_precedes_next_open() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());

    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);
    assert_ok!(player.select_channel(1).await);

    let calls: Vec<Call> = backend
        .calls()
        .into_iter()
        .filter(|c| !matches!(c, Call::Warm(_)))
        .collect();

    assert_eq!(
        calls,
        vec![
            Call::Open("http://a/news.m3u8".into(), StreamVariant::AdaptiveHls),
            Call::Start("http://a/news.m3u8".into()),
            Call::Release("http://a/news.m3u8".into()),
            Call::Open("http://b/direct.ts".into(), StreamVariant::Direct),
            Call::Start("http://b/direct.ts".into()),
        ]
    );
}

#[tokio::test]
async fn test_teardowns_equal_switches_after_first() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());
    let content = "http://a/1.m3u8\nhttp://a/2.mpd\nhttp://a/3.ts\nhttp://a/4.m3u8";

    assert_ok!(player.set_playlist(playlist(content)).await);
    for index in [3, 1, 1, 2, 0, 3] {
        assert_ok!(player.select_channel(index).await);
        assert!(player.switcher().has_session());
    }

    let switches = player.switcher().switches();
    assert_eq!(switches, 7);
    assert_eq!(player.switcher().teardowns(), switches - 1);
    assert_eq!(backend.count(|c| matches!(c, Call::Release(_))) as u64, switches - 1);
    assert_eq!(
        backend.count(|c| matches!(c, Call::Open(..))) - backend.count(|c| matches!(c, Call::Release(_))),
        1
    );
}

#[tokio::test]
async fn test_start_failure_is_swallowed() {
    let backend = Arc::new(RecordingBackend {
        failing: vec!["http://b/direct.ts".to_string()],
        ..Default::default()
    });
    let (mut player, notifier) = player(backend.clone());

    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);
    let state = assert_ok!(player.select_channel(1).await);

    assert!(state.is_active());
    assert_eq!(player.current_index(), Some(1));
    assert!(notifier.alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_hls_without_engine_plays_direct() {
    let backend = Arc::new(RecordingBackend {
        no_hls: true,
        ..Default::default()
    });
    let (mut player, _) = player(backend.clone());

    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);

    assert_eq!(player.switcher().current_variant(), Some(StreamVariant::Direct));
}

#[tokio::test]
async fn test_out_of_range_selection() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());

    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);
    let err = assert_err!(player.select_channel(2).await);

    assert!(matches!(err, Error::ChannelOutOfRange { index: 2, len: 2 }));
    assert_eq!(player.current_index(), Some(0));
}

// =============================================================================
// Preload Tests
// =============================================================================

#[tokio::test]
async fn test_next_channel_is_warmed_once() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());
    let content = "http://a/1.m3u8\nhttp://a/2.m3u8\nhttp://a/3.m3u8";

    assert_ok!(player.set_playlist(playlist(content)).await);
    assert_ok!(player.select_channel(0).await);
    assert_ok!(player.select_channel(0).await);

    assert_eq!(
        backend.count(|c| *c == Call::Warm("http://a/2.m3u8".into())),
        1
    );

    assert_ok!(player.select_channel(2).await);
    assert_eq!(
        backend.count(|c| *c == Call::Warm("http://a/1.m3u8".into())),
        1
    );
}

#[tokio::test]
async fn test_reload_clears_preload_set() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());

    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);
    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);

    assert_eq!(
        backend.count(|c| *c == Call::Warm("http://b/direct.ts".into())),
        2
    );
    assert_eq!(player.switcher().teardowns(), 1);
}

// =============================================================================
// Playlist Load Errors
// =============================================================================

#[tokio::test]
async fn test_failed_load_alerts_and_leaves_list_empty() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, notifier) = player(backend.clone());
    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);

    let err = assert_err!(player.load_playlist("/nonexistent/tuner/list.m3u").await);

    assert!(err.is_playlist_error());
    assert!(player.channels().is_empty());
    assert_eq!(player.state(), SwitcherState::Idle);
    assert!(!player.switcher().has_session());

    let alerts = notifier.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("Unable to load playlist"));
}

#[tokio::test]
async fn test_load_from_file_starts_first_channel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("list.m3u");
    std::fs::write(&path, EXAMPLE).unwrap();

    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());

    assert_ok!(player.load_playlist(path.to_str().unwrap()).await);

    assert_eq!(player.channels().len(), 2);
    assert_eq!(player.current_index(), Some(0));
    assert_eq!(player.switcher().current_variant(), Some(StreamVariant::AdaptiveHls));
}

#[tokio::test]
async fn test_relative_entries_play_from_file_playlist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("list.m3u");
    std::fs::write(
        &path,
        "#EXTINF:-1,Rel\nlive/ch1.m3u8\n#EXTINF:-1,Abs\nhttp://127.0.0.1:9/a.ts",
    )
    .unwrap();

    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());
    assert_ok!(player.load_playlist(path.to_str().unwrap()).await);

    assert!(player.switcher().has_session());
    assert!(player.state().is_active());
    assert_eq!(player.switcher().current_variant(), Some(StreamVariant::AdaptiveHls));
    assert!(player.channels()[0].url.starts_with("file://"));

    assert_ok!(player.select_channel(1).await);
    assert_ok!(player.select_channel(0).await);

    assert!(player.switcher().has_session());
    assert_eq!(player.switcher().switches(), 3);
    assert_eq!(player.switcher().teardowns(), 2);
}

// =============================================================================
// Input Tests
// =============================================================================

#[tokio::test]
async fn test_enter_navigate_enter_switches_channel() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());
    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);
    let t0 = Instant::now();

    let opened = player.handle_input(InputEvent::Key(Key::Enter), t0).await;
    assert_eq!(opened, vec![ShellAction::OpenSidebar { highlighted: 0 }]);

    player
        .handle_input(InputEvent::Key(Key::Down), t0 + Duration::from_millis(500))
        .await;
    let actions = player
        .handle_input(InputEvent::Key(Key::Enter), t0 + Duration::from_millis(1000))
        .await;

    assert_eq!(actions, vec![ShellAction::Select(1), ShellAction::CloseSidebar]);
    assert_eq!(player.current_index(), Some(1));
    assert_eq!(player.switcher().current_variant(), Some(StreamVariant::Direct));
    assert_eq!(player.shell().highlighted(), 1);
}

#[tokio::test]
async fn test_double_enter_fullscreen_keeps_channel() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());
    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);
    let t0 = Instant::now();

    player.handle_input(InputEvent::Key(Key::Enter), t0).await;
    let actions = player
        .handle_input(InputEvent::Key(Key::Enter), t0 + Duration::from_millis(399))
        .await;

    assert!(actions.contains(&ShellAction::ToggleFullscreen));
    assert!(player.shell().is_fullscreen());
    assert!(!player.shell().is_sidebar_open());
    assert_eq!(player.switcher().switches(), 1);
}

#[tokio::test]
async fn test_fullscreen_reaches_running_session() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());
    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);
    let t0 = Instant::now();

    player.handle_input(InputEvent::Key(Key::Enter), t0).await;
    player
        .handle_input(InputEvent::Key(Key::Enter), t0 + Duration::from_millis(200))
        .await;
    player.handle_input(InputEvent::DoubleClick, t0 + Duration::from_secs(1)).await;

    let toggles: Vec<Call> = backend
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Fullscreen(..)))
        .collect();
    assert_eq!(
        toggles,
        vec![
            Call::Fullscreen("http://a/news.m3u8".into(), true),
            Call::Fullscreen("http://a/news.m3u8".into(), false),
        ]
    );
    assert_eq!(backend.count(|c| matches!(c, Call::Open(..))), 1);
}

#[tokio::test]
async fn test_pause_in_fullscreen_resumes_session() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());
    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);
    let t0 = Instant::now();

    player.handle_input(InputEvent::Paused, t0).await;
    assert_eq!(backend.count(|c| matches!(c, Call::Resume(_))), 0);

    player.handle_input(InputEvent::DoubleClick, t0).await;
    let actions = player.handle_input(InputEvent::Paused, t0).await;

    assert_eq!(actions, vec![ShellAction::Resume]);
    assert_eq!(
        backend.calls().last(),
        Some(&Call::Resume("http://a/news.m3u8".into()))
    );
}

#[tokio::test]
async fn test_click_opens_sidebar_on_tick() {
    let backend = Arc::new(RecordingBackend::default());
    let (mut player, _) = player(backend.clone());
    assert_ok!(player.set_playlist(playlist(EXAMPLE)).await);
    let t0 = Instant::now();

    assert!(player.handle_input(InputEvent::Click, t0).await.is_empty());
    let actions = player.tick(t0 + Duration::from_millis(260)).await;

    assert!(actions.contains(&ShellAction::OpenSidebar { highlighted: 0 }));
}
