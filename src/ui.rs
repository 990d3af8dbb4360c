//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`. It only
//! reads `App`; every change goes through the runtime.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::time::Duration;

use crate::app::{App, NowPlaying};
use crate::config::{ControlsSettings, UiSettings};
use crate::coordinator::SessionPhase;
use crate::engine::RepeatMode;

const CONTROLS: [(&str, &str); 12] = [
    ("j/k", "up/down"),
    ("h/l", "prev/next song"),
    ("H/L", ""),
    ("enter", "play selected song"),
    ("space/p", "play/pause"),
    ("gg/G", "top/bottom"),
    ("zz", "jump to playing"),
    ("K", "metadata"),
    ("s", "shuffle"),
    ("r", "repeat"),
    ("f", "follow"),
    ("q", "quit"),
];

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    CONTROLS
        .iter()
        .map(|(k, v)| {
            if *k == "H/L" {
                format!("[H/L] scrub -/+{scrub_seconds}s")
            } else {
                format!("[{k}] {v}")
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Format an optional duration, rounding up partial seconds, showing total seconds.
fn format_duration_mmss_ceil(d: Option<Duration>) -> String {
    let Some(d) = d else {
        return "-".to_string();
    };

    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }
    format!("{}:{:02} ({}s)", total_secs / 60, total_secs % 60, total_secs)
}

fn phase_text(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Empty => "Stopped",
        SessionPhase::Loaded => "Loading",
        SessionPhase::Playing => "Playing",
        SessionPhase::Paused => "Paused",
        SessionPhase::Ended => "Ended",
        SessionPhase::Released => "Released",
    }
}

/// Title and artist of the playing track, joined by the configured separator.
fn now_playing_text(np: &NowPlaying, ui: &UiSettings) -> Option<String> {
    let track = np.track.as_ref()?;
    let mut text = track.display_title();
    if let Some(artist) = track
        .artist
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
    {
        text.push_str(&ui.now_playing_separator);
        text.push_str(artist);
    }
    Some(text)
}

fn progress_text(np: &NowPlaying) -> String {
    let elapsed = format_mmss(Duration::from_millis(np.position_ms));
    if np.duration_ms > 0 {
        format!(
            "{elapsed}/{}",
            format_mmss(Duration::from_millis(np.duration_ms))
        )
    } else {
        elapsed
    }
}

fn status_text(app: &App, ui: &UiSettings) -> String {
    let np = &app.now_playing;
    let mut parts: Vec<String> = Vec::new();

    match now_playing_text(np, ui) {
        Some(song) => {
            parts.push(format!(" Song: {song} [{}]", progress_text(np)));
            parts.push(phase_text(np.phase).to_string());
        }
        None => parts.push(format!(" {}", phase_text(np.phase))),
    }

    parts.push(if np.shuffle { "Shuffle: ON" } else { "Shuffle: OFF" }.to_string());
    parts.push(
        match np.repeat {
            RepeatMode::Off => "Repeat: Off",
            RepeatMode::One => "Repeat: One",
        }
        .to_string(),
    );
    parts.push(
        if app.follow_playback {
            "CURSOR: Follow"
        } else {
            "CURSOR: Free-roam"
        }
        .to_string(),
    );

    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {dir}"));
    }
    if let Some(notice) = &app.notice {
        parts.push(notice.clone());
    }
    parts.join(" • ")
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Visible window `[start, end)` of `total` rows that keeps `selected` centered.
fn visible_window(total: usize, height: usize, selected: usize) -> (usize, usize) {
    if total <= height || height == 0 {
        return (0, total);
    }
    let half = height / 2;
    let mut start = selected.saturating_sub(half);
    if start + height > total {
        start = total - height;
    }
    (start, start + height)
}

fn left_pad() -> Padding {
    Padding {
        left: 1,
        right: 0,
        top: 0,
        bottom: 0,
    }
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" refrain ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status = Paragraph::new(status_text(app, ui_settings))
        .block(Block::bordered().padding(left_pad()).title(" now playing "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, chunks[1]);

    // Only build items for the visible window.
    {
        let total = app.tracks.len();
        let height = chunks[2].height.saturating_sub(2) as usize;
        let (start, end) = visible_window(total, height, app.selected);
        let playing_at = app.now_playing_position();

        let items: Vec<ListItem> = app.tracks[start..end]
            .iter()
            .enumerate()
            .map(|(offset, track)| {
                let marker = if playing_at == Some(start + offset) {
                    "♪ "
                } else {
                    "  "
                };
                ListItem::new(format!("{marker}{}", track.display))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(" tracks "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if total > 0 {
            state.select(Some(app.selected - start));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    if app.metadata_window {
        // Keep the popup inside the list area so it doesn't cover header/status/footer.
        let popup_area = centered_rect_sized(72, 10, chunks[2]);
        frame.render_widget(Clear, popup_area);

        let meta = match app.tracks.get(app.selected) {
            Some(track) => format!(
                "Title: {}\nArtist: {}\nAlbum: {}\nDuration: {}\nPath: {}\nArtwork: {}",
                track.display_title(),
                track.artist.as_deref().unwrap_or("-"),
                track.album.as_deref().unwrap_or("-"),
                format_duration_mmss_ceil(track.duration),
                track.uri,
                track.artwork_key().as_deref().unwrap_or("-"),
            ),
            None => "No track selected".to_string(),
        };
        let meta_paragraph = Paragraph::new(meta)
            .block(
                Block::default()
                    .padding(left_pad())
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    let footer = Paragraph::new(controls_text(controls_settings.scrub_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(left_pad()),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}
