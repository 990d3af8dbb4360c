use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::app::App;
use crate::config;
use crate::coordinator::{CoordinatorError, PlaybackCoordinator};
use crate::engine::{EngineFactory, RepeatMode};
use crate::host::{ControlSurfaceLauncher, HostStatus, SessionHost};
use crate::ui;

/// State tracked by the runtime event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Same for `zz` (jump to the playing track).
    pub pending_zz: bool,
}

/// Main terminal event loop. It is the single writer of the session: engine
/// events, control-surface commands and key presses are applied here one at
/// a time. Returns `Ok(())` once the session host has stopped.
pub fn run<F: EngineFactory, L: ControlSurfaceLauncher>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    coordinator: &mut PlaybackCoordinator<F>,
    host: &mut SessionHost<L>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        coordinator.process_engine_events()?;
        if host.pump(coordinator)? == HostStatus::Stopped {
            break;
        }

        app.sync();
        app.set_progress(coordinator.position_ms(), coordinator.duration_ms());
        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.controls))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, coordinator, host, state)? {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Apply one key press. Returns `true` when the user quit.
pub(super) fn handle_key_event<F: EngineFactory, L: ControlSurfaceLauncher>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    coordinator: &mut PlaybackCoordinator<F>,
    host: &mut SessionHost<L>,
    state: &mut EventLoopState,
) -> Result<bool, CoordinatorError> {
    let was_gg = std::mem::take(&mut state.pending_gg);
    let was_zz = std::mem::take(&mut state.pending_zz);

    match key.code {
        KeyCode::Char('q') => {
            host.on_task_removed(coordinator);
            return Ok(true);
        }
        KeyCode::Char('g') => {
            if was_gg {
                app.follow_playback_off();
                app.set_selected(0);
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            app.set_selected(app.tracks.len().saturating_sub(1));
        }
        KeyCode::Char('z') => {
            if was_zz {
                if let Some(i) = app.now_playing_position() {
                    app.set_selected(i);
                }
            } else {
                state.pending_zz = true;
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Enter => {
            if app.has_tracks() && !app.selected_is_playing() {
                app.follow_playback_on();
                debug!(index = app.selected, "playing selection");
                coordinator.set_queue_and_play(app.tracks.clone(), app.selected)?;
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => coordinator.toggle_play_pause(),
        KeyCode::Char('l') => {
            app.follow_playback_on();
            coordinator.next();
        }
        KeyCode::Char('h') => {
            app.follow_playback_on();
            coordinator.previous();
        }
        KeyCode::Char('L') => {
            let step = settings.controls.scrub_seconds.saturating_mul(1_000);
            coordinator.seek_to(coordinator.position_ms().saturating_add(step));
        }
        KeyCode::Char('H') => {
            let step = settings.controls.scrub_seconds.saturating_mul(1_000);
            coordinator.seek_to(coordinator.position_ms().saturating_sub(step));
        }
        KeyCode::Char('s') => {
            let enabled = !coordinator.shuffle().get();
            coordinator.set_shuffle(enabled);
        }
        KeyCode::Char('r') => {
            let mode = match coordinator.repeat().get() {
                RepeatMode::Off => RepeatMode::One,
                RepeatMode::One => RepeatMode::Off,
            };
            coordinator.set_repeat(mode);
        }
        KeyCode::Char('f') => {
            if app.follow_playback {
                app.follow_playback_off();
            } else {
                app.follow_playback_on();
            }
        }
        KeyCode::Char('K') => app.toggle_metadata_window(),
        _ => {}
    }

    Ok(false)
}
