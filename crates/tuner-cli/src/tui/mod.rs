//! Terminal front end for `tuner watch`.
//!
//! Uses `ratatui` + `crossterm` for rendering. Input is read on a dedicated
//! thread and fed to the player; shell timers are driven from the deadline
//! the shell reports.

mod ui;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Position, Rect};
use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tuner_core::{InputEvent, Key, Notifier, Player, PlayerConfig, SessionId, ShellAction, SwitcherState};

use crate::external::ExternalPlayerBackend;

/// How long the input thread blocks before checking for shutdown
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Notifier that parks the message until the event loop shows it
#[derive(Debug, Default)]
pub struct TerminalNotifier {
    pending: Mutex<Option<String>>,
}

impl TerminalNotifier {
    /// Take the message waiting to be shown
    pub fn take(&self) -> Option<String> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        warn!(alert = message, "Alert");
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.to_string());
    }
}

/// Render state that lives outside the player
#[derive(Debug, Default)]
pub struct ViewState {
    pub loading: bool,
    /// Blocking alert; input only dismisses it while shown
    pub alert: Option<String>,
    pub list_state: ListState,
    /// Rows of the channel list as last drawn
    pub list_area: Option<Rect>,
}

/// What a key press means to the event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyInput {
    Quit,
    Input(InputEvent),
    Ignore,
}

fn map_key(key: KeyEvent, sidebar_open: bool) -> KeyInput {
    if key.kind != KeyEventKind::Press {
        return KeyInput::Ignore;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyInput::Quit,
        KeyCode::Char('q') => KeyInput::Quit,
        KeyCode::Esc if sidebar_open => KeyInput::Input(InputEvent::OverlayClick),
        KeyCode::Enter => KeyInput::Input(InputEvent::Key(Key::Enter)),
        KeyCode::Up => KeyInput::Input(InputEvent::Key(Key::Up)),
        KeyCode::Down => KeyInput::Input(InputEvent::Key(Key::Down)),
        KeyCode::Char(' ') => KeyInput::Input(InputEvent::Key(Key::Space)),
        KeyCode::Char(c) => KeyInput::Input(InputEvent::Key(Key::Char(c))),
        _ => KeyInput::Ignore,
    }
}

/// Turns raw mouse events into shell input
///
/// Terminals report no double clicks, so two presses within the click
/// delay produce a second `Click` followed by `DoubleClick`.
#[derive(Debug)]
struct PointerMapper {
    click_delay: Duration,
    last_click: Option<Instant>,
}

impl PointerMapper {
    fn new(click_delay: Duration) -> Self {
        Self {
            click_delay,
            last_click: None,
        }
    }

    fn map(
        &mut self,
        mouse: MouseEvent,
        sidebar_open: bool,
        list_area: Option<Rect>,
        list_offset: usize,
        now: Instant,
    ) -> Vec<InputEvent> {
        match mouse.kind {
            MouseEventKind::Moved => vec![InputEvent::PointerMove],
            MouseEventKind::Down(MouseButton::Left) if sidebar_open => {
                let position = Position::new(mouse.column, mouse.row);
                match list_area {
                    Some(area) if area.contains(position) => {
                        let row = usize::from(mouse.row - area.y);
                        vec![InputEvent::ChooseChannel(list_offset + row)]
                    }
                    _ => vec![InputEvent::OverlayClick],
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let double = self
                    .last_click
                    .is_some_and(|last| now.saturating_duration_since(last) < self.click_delay);
                if double {
                    self.last_click = None;
                    vec![InputEvent::Click, InputEvent::DoubleClick]
                } else {
                    self.last_click = Some(now);
                    vec![InputEvent::Click]
                }
            }
            _ => Vec::new(),
        }
    }
}

/// Run the interactive player until the user quits
///
/// # Errors
///
/// Returns an error if the player cannot be built or the terminal fails.
pub async fn run(config: PlayerConfig) -> Result<()> {
    let (pause_tx, mut pause_rx) = mpsc::unbounded_channel();
    let backend = Arc::new(
        ExternalPlayerBackend::new(config.external_player.clone())?.with_pause_events(pause_tx),
    );
    let fullscreen = backend.fullscreen_flag();
    let notifier = Arc::new(TerminalNotifier::default());
    let click_delay = config.timings.click_delay();
    let mut player = Player::new(config, backend, notifier.clone())?;

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to enter alternate screen")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let stop = Arc::new(AtomicBool::new(false));
    spawn_input_reader(tx, stop.clone());

    let result = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(mut terminal) => {
            let mut session = Session {
                player: &mut player,
                notifier: &notifier,
                fullscreen: &fullscreen,
                pointer: PointerMapper::new(click_delay),
                view: ViewState::default(),
            };
            session.run(&mut terminal, &mut rx, &mut pause_rx).await
        }
        Err(e) => Err(anyhow::Error::new(e).context("failed to create terminal")),
    };

    stop.store(true, Ordering::Relaxed);
    player.shutdown().await;

    // Cleanup (always attempt even if the event loop failed)
    disable_raw_mode().context("failed to disable raw mode")?;
    crossterm::execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;

    result
}

fn spawn_input_reader(tx: mpsc::UnboundedSender<Event>, stop: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Input read failed");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "Input poll failed");
                    break;
                }
            }
        }
    });
}

type Term = Terminal<CrosstermBackend<io::Stdout>>;

struct Session<'a> {
    player: &'a mut Player,
    notifier: &'a TerminalNotifier,
    fullscreen: &'a AtomicBool,
    pointer: PointerMapper,
    view: ViewState,
}

impl Session<'_> {
    async fn run(
        &mut self,
        terminal: &mut Term,
        rx: &mut mpsc::UnboundedReceiver<Event>,
        paused: &mut mpsc::UnboundedReceiver<SessionId>,
    ) -> Result<()> {
        self.view.loading = true;
        self.draw(terminal)?;

        let loaded = tokio::select! {
            result = self.player.load_default_playlist() => Some(result),
            () = wait_for_quit(rx) => None,
        };
        self.view.loading = false;
        match loaded {
            None => {
                info!("Quit while loading playlist");
                return Ok(());
            }
            Some(Err(e)) => debug!(error = %e, "Starting without channels"),
            Some(Ok(())) => {}
        }

        loop {
            if self.view.alert.is_none() {
                self.view.alert = self.notifier.take();
            }
            self.draw(terminal)?;

            let deadline = if self.view.alert.is_some() {
                None
            } else {
                self.player.shell().next_deadline()
            };
            let timer = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    if !self.on_event(event).await {
                        break;
                    }
                }
                Some(session_id) = paused.recv() => {
                    if is_current(self.player.state(), session_id) {
                        let actions = self.player.handle_input(InputEvent::Paused, Instant::now()).await;
                        self.apply(&actions);
                    }
                }
                () = timer => {
                    let actions = self.player.tick(Instant::now()).await;
                    self.apply(&actions);
                }
            }
        }

        Ok(())
    }

    fn draw(&mut self, terminal: &mut Term) -> Result<()> {
        let player = &*self.player;
        let view = &mut self.view;
        terminal
            .draw(|frame| ui::draw(frame, player, view))
            .context("failed to draw TUI")?;
        Ok(())
    }

    /// Returns `false` when the user quits
    async fn on_event(&mut self, event: Event) -> bool {
        if self.view.alert.is_some() {
            let dismiss = match &event {
                Event::Key(key) => key.kind == KeyEventKind::Press,
                Event::Mouse(mouse) => matches!(mouse.kind, MouseEventKind::Down(_)),
                _ => false,
            };
            if dismiss {
                self.view.alert = None;
            }
            return true;
        }

        let sidebar_open = self.player.shell().is_sidebar_open();
        let now = Instant::now();
        let inputs = match event {
            Event::Key(key) => match map_key(key, sidebar_open) {
                KeyInput::Quit => return false,
                KeyInput::Input(input) => vec![input],
                KeyInput::Ignore => Vec::new(),
            },
            Event::Mouse(mouse) => self.pointer.map(
                mouse,
                sidebar_open,
                self.view.list_area,
                self.view.list_state.offset(),
                now,
            ),
            _ => Vec::new(),
        };

        for input in inputs {
            let actions = self.player.handle_input(input, now).await;
            self.apply(&actions);
        }
        true
    }

    /// The player already applied the actions to the running session;
    /// the fullscreen flag carries the setting over to the next one.
    fn apply(&mut self, actions: &[ShellAction]) {
        if actions.contains(&ShellAction::ToggleFullscreen) {
            let fullscreen = self.player.shell().is_fullscreen();
            self.fullscreen.store(fullscreen, Ordering::Relaxed);
            debug!(fullscreen, "Fullscreen toggled");
        }
    }
}

/// Pauses of a player that was already replaced are ignored
fn is_current(state: SwitcherState, paused: SessionId) -> bool {
    matches!(state, SwitcherState::Active { session_id, .. } if session_id == paused)
}

/// Resolve once the user asks to quit; other input is dropped
async fn wait_for_quit(rx: &mut mpsc::UnboundedReceiver<Event>) {
    while let Some(event) = rx.recv().await {
        if let Event::Key(key) = event {
            if map_key(key, false) == KeyInput::Quit {
                return;
            }
        }
    }
    std::future::pending::<()>().await;
}
