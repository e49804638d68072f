//! Input shell - sidebar, highlight, fullscreen and cursor state
//!
//! The shell never touches a screen or a player. It turns timestamped input
//! events into [`ShellAction`]s; the front end renders them and the
//! controller turns [`ShellAction::Select`] into a channel switch. Timers are
//! explicit deadlines checked by [`Shell::tick`].

use crate::config::ShellTimings;
use std::time::Instant;

/// Keys the shell reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Up,
    Down,
    Space,
    Char(char),
}

/// User and media input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(Key),
    /// Single click on the video surface
    Click,
    /// Double click on the video surface
    DoubleClick,
    /// Click on the dimmed overlay next to the open sidebar
    OverlayClick,
    /// Click on a channel in the open sidebar
    ChooseChannel(usize),
    PointerMove,
    /// Playback was paused by the media element
    Paused,
}

/// What the front end should do in response to input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    /// Play the channel at this index
    Select(usize),
    /// Show the channel list with this entry highlighted
    OpenSidebar { highlighted: usize },
    CloseSidebar,
    /// Move the highlight and scroll it into view
    Highlight(usize),
    ToggleFullscreen,
    ShowCursor,
    HideCursor,
    FadeHint,
    RemoveHint,
    /// Swallow the key instead of applying its default media shortcut
    SuppressDefault,
    /// Restart playback that was paused
    Resume,
}

/// Startup hint visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintState {
    Visible,
    Fading,
    Removed,
}

/// Input shell state machine
#[derive(Debug, Clone)]
pub struct Shell {
    timings: ShellTimings,
    channel_count: usize,
    current: usize,
    highlighted: usize,
    sidebar_open: bool,
    fullscreen: bool,
    last_enter: Option<Instant>,
    /// Deadline of a single click waiting to be confirmed
    pending_click: Option<Instant>,
    cursor_visible: bool,
    cursor_deadline: Option<Instant>,
    hint: HintState,
    started_at: Instant,
}

impl Shell {
    pub fn new(timings: ShellTimings, now: Instant) -> Self {
        Self {
            timings,
            channel_count: 0,
            current: 0,
            highlighted: 0,
            sidebar_open: false,
            fullscreen: false,
            last_enter: None,
            pending_click: None,
            cursor_visible: true,
            cursor_deadline: None,
            hint: HintState::Visible,
            started_at: now,
        }
    }

    /// Replace the channel list the shell navigates
    pub fn set_channels(&mut self, count: usize) {
        self.channel_count = count;
        self.current = 0;
        self.highlighted = 0;
    }

    /// Record the channel that is now playing
    pub fn set_current(&mut self, index: usize) {
        self.current = index;
        if !self.sidebar_open {
            self.highlighted = index;
        }
    }

    /// Sync with the real fullscreen state after the front end applied a toggle
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn is_sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn hint(&self) -> HintState {
        self.hint
    }

    /// Apply one input event
    pub fn handle(&mut self, event: InputEvent, now: Instant) -> Vec<ShellAction> {
        let mut actions = Vec::new();

        match event {
            InputEvent::Key(Key::Enter) => self.on_enter(now, &mut actions),
            InputEvent::Key(Key::Up) if self.sidebar_open => self.move_highlight(-1, &mut actions),
            InputEvent::Key(Key::Down) if self.sidebar_open => self.move_highlight(1, &mut actions),
            InputEvent::Key(Key::Space) if self.fullscreen => {
                actions.push(ShellAction::SuppressDefault)
            }
            InputEvent::Key(Key::Char(c)) if self.fullscreen && c.eq_ignore_ascii_case(&'k') => {
                actions.push(ShellAction::SuppressDefault)
            }
            InputEvent::Key(_) => {}
            InputEvent::Click => {
                if self.pending_click.take().is_none() {
                    self.pending_click = Some(now + self.timings.click_delay());
                }
            }
            InputEvent::DoubleClick => self.toggle_fullscreen(&mut actions),
            InputEvent::OverlayClick => self.close_sidebar(&mut actions),
            InputEvent::ChooseChannel(index) if index < self.channel_count => {
                actions.push(ShellAction::Select(index));
                self.close_sidebar(&mut actions);
            }
            InputEvent::ChooseChannel(_) => {}
            InputEvent::PointerMove => {
                if !self.cursor_visible {
                    self.cursor_visible = true;
                    actions.push(ShellAction::ShowCursor);
                }
                self.cursor_deadline = Some(now + self.timings.cursor_idle());
            }
            InputEvent::Paused if self.fullscreen => actions.push(ShellAction::Resume),
            InputEvent::Paused => {}
        }

        actions
    }

    /// Fire every timer whose deadline has passed
    pub fn tick(&mut self, now: Instant) -> Vec<ShellAction> {
        let mut actions = Vec::new();

        if self.pending_click.is_some_and(|deadline| now >= deadline) {
            self.pending_click = None;
            if self.sidebar_open {
                self.close_sidebar(&mut actions);
            } else {
                self.open_sidebar(&mut actions);
            }
        }

        if self.cursor_deadline.is_some_and(|deadline| now >= deadline) {
            self.cursor_deadline = None;
            self.cursor_visible = false;
            actions.push(ShellAction::HideCursor);
        }

        let elapsed = now.saturating_duration_since(self.started_at);
        if self.hint == HintState::Visible && elapsed >= self.timings.hint_fade() {
            self.hint = HintState::Fading;
            actions.push(ShellAction::FadeHint);
        }
        if self.hint == HintState::Fading && elapsed >= self.timings.hint_remove() {
            self.hint = HintState::Removed;
            actions.push(ShellAction::RemoveHint);
        }

        actions
    }

    /// Earliest pending timer, so an event loop knows how long it may sleep
    pub fn next_deadline(&self) -> Option<Instant> {
        let hint = match self.hint {
            HintState::Visible => Some(self.started_at + self.timings.hint_fade()),
            HintState::Fading => Some(self.started_at + self.timings.hint_remove()),
            HintState::Removed => None,
        };

        [self.pending_click, self.cursor_deadline, hint]
            .into_iter()
            .flatten()
            .min()
    }

    fn on_enter(&mut self, now: Instant, actions: &mut Vec<ShellAction>) {
        let double = self
            .last_enter
            .is_some_and(|last| now.saturating_duration_since(last) < self.timings.double_enter());

        if double {
            // Second press of a double-Enter: undo the open from the first press
            self.last_enter = None;
            self.close_sidebar(actions);
            self.toggle_fullscreen(actions);
        } else if self.sidebar_open {
            if self.channel_count > 0 {
                actions.push(ShellAction::Select(self.highlighted));
            }
            self.close_sidebar(actions);
        } else {
            self.last_enter = Some(now);
            self.open_sidebar(actions);
        }
    }

    fn move_highlight(&mut self, step: isize, actions: &mut Vec<ShellAction>) {
        if self.channel_count == 0 {
            return;
        }
        let count = self.channel_count as isize;
        self.highlighted = (self.highlighted as isize + step).rem_euclid(count) as usize;
        actions.push(ShellAction::Highlight(self.highlighted));
    }

    fn open_sidebar(&mut self, actions: &mut Vec<ShellAction>) {
        self.sidebar_open = true;
        self.highlighted = self.current;
        actions.push(ShellAction::OpenSidebar {
            highlighted: self.highlighted,
        });
    }

    fn close_sidebar(&mut self, actions: &mut Vec<ShellAction>) {
        if self.sidebar_open {
            self.sidebar_open = false;
            self.highlighted = self.current;
            actions.push(ShellAction::CloseSidebar);
        }
    }

    fn toggle_fullscreen(&mut self, actions: &mut Vec<ShellAction>) {
        self.fullscreen = !self.fullscreen;
        actions.push(ShellAction::ToggleFullscreen);
    }
}
