//! TUI rendering for the channel player.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use tuner_core::{HintState, Player, SwitcherState};

use super::ViewState;

const HINT: &str = "Press Enter to open channels · Enter twice for fullscreen";

/// Draws the player UI.
#[allow(clippy::indexing_slicing)]
pub fn draw(frame: &mut Frame, player: &Player, view: &mut ViewState) {
    let shell = player.shell();
    let header = if shell.is_fullscreen() { 0 } else { 3 };
    let footer = u16::from(shell.is_cursor_visible());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(header), // now playing
            Constraint::Min(3),         // video + sidebar
            Constraint::Length(footer), // key help
        ])
        .split(frame.area());

    if header > 0 {
        draw_header(frame, chunks[0], player);
    }
    draw_main(frame, chunks[1], player, view);
    if footer > 0 {
        draw_footer(frame, chunks[2]);
    }

    if let Some(message) = &view.alert {
        draw_alert(frame, message);
    }
}

fn current_name(player: &Player) -> Option<&str> {
    player
        .current_index()
        .and_then(|i| player.channels().get(i))
        .map(|c| c.name.as_str())
}

/// Draws the header with the current channel and switcher state.
fn draw_header(frame: &mut Frame, area: Rect, player: &Player) {
    let state_style = match player.state() {
        SwitcherState::Active { .. } => Style::default().fg(Color::Green),
        SwitcherState::Idle => Style::default().fg(Color::DarkGray),
    };

    let line = Line::from(vec![
        Span::raw(current_name(player).unwrap_or("-")),
        Span::raw("  "),
        Span::styled(player.state().to_string(), state_style),
    ]);
    let header = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Tuner · {} channels ", player.channels().len())),
    );
    frame.render_widget(header, area);
}

#[allow(clippy::indexing_slicing)]
fn draw_main(frame: &mut Frame, area: Rect, player: &Player, view: &mut ViewState) {
    if player.shell().is_sidebar_open() {
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(area);
        draw_sidebar(frame, panes[0], player, view);
        draw_video(frame, panes[1], player, view);
    } else {
        view.list_area = None;
        draw_video(frame, area, player, view);
    }
}

/// Draws the channel list with the highlighted entry.
fn draw_sidebar(frame: &mut Frame, area: Rect, player: &Player, view: &mut ViewState) {
    let shell = player.shell();
    let items: Vec<ListItem> = player
        .channels()
        .iter()
        .enumerate()
        .map(|(i, channel)| {
            let style = if i == shell.current() {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(channel.name.as_str()).style(style)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Channels ");
    view.list_area = Some(block.inner(area));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    view.list_state.select(Some(shell.highlighted()));
    frame.render_stateful_widget(list, area, &mut view.list_state);
}

/// Draws the playback area and the startup hint.
fn draw_video(frame: &mut Frame, area: Rect, player: &Player, view: &ViewState) {
    let mut lines = Vec::new();

    if view.loading {
        lines.push(Line::from("Loading playlist..."));
    } else if player.channels().is_empty() {
        lines.push(Line::styled("No channels", Style::default().fg(Color::DarkGray)));
    } else {
        let name = current_name(player).unwrap_or("-");
        lines.push(Line::from(Span::styled(
            name,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        if let Some(variant) = player.switcher().current_variant() {
            lines.push(Line::from(format!("{} stream", variant)));
        }
    }

    match player.shell().hint() {
        HintState::Visible => {
            lines.push(Line::default());
            lines.push(Line::styled(HINT, Style::default().fg(Color::Cyan)));
        }
        HintState::Fading => {
            lines.push(Line::default());
            lines.push(Line::styled(
                HINT,
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
            ));
        }
        HintState::Removed => {}
    }

    let block = if player.shell().is_fullscreen() {
        Block::default()
    } else {
        Block::default().borders(Borders::ALL)
    };
    let video = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(video, area);
}

fn draw_footer(frame: &mut Frame, area: Rect) {
    let help = Line::from(vec![
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" channels  "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" move  "),
        Span::styled("Enter Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" fullscreen  "),
        Span::styled("click", Style::default().fg(Color::Yellow)),
        Span::raw(" menu  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" quit"),
    ]);
    frame.render_widget(Paragraph::new(help), area);
}

/// Draws a modal over everything else.
fn draw_alert(frame: &mut Frame, message: &str) {
    let area = centered(frame.area(), 60, 7);
    let text = vec![
        Line::from(message),
        Line::default(),
        Line::styled("Press any key", Style::default().fg(Color::DarkGray)),
    ];
    let popup = Paragraph::new(text).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Error "),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_fits_inside() {
        let outer = Rect::new(0, 0, 100, 40);
        let inner = centered(outer, 60, 7);
        assert_eq!(inner, Rect::new(20, 16, 60, 7));

        let small = Rect::new(0, 0, 30, 4);
        assert_eq!(centered(small, 60, 7), small);
    }
}
