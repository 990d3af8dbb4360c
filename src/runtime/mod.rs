use std::env;
use std::path::Path;

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::coordinator::PlaybackCoordinator;
use crate::engine::RodioEngineFactory;
use crate::host::{HostStatus, MprisLauncher, SessionHost};
use crate::library::{CatalogError, scan};

mod event_loop;
mod logging;
mod settings;
mod startup;

#[cfg(test)]
mod tests;

const APP_NAME: &str = "refrain";

/// Status-box text for a catalog that could not be read.
fn scan_notice(err: &CatalogError) -> String {
    match err {
        CatalogError::PermissionDenied(_) => format!("{err}; grant read access and restart"),
        _ => err.to_string(),
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_warning) = settings::load_settings();
    let log_path = logging::init_logging(&settings);
    if let Some(msg) = config_warning {
        warn!("{msg}");
    }
    info!(log = ?log_path, "{APP_NAME} starting");

    let dir = env::args().nth(1).unwrap_or_else(|| {
        env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "Music".to_string())
    });

    let mut app = App::new(Vec::new());
    app.set_current_dir(dir.clone());
    match scan(Path::new(&dir), &settings.library) {
        Ok(tracks) => {
            if tracks.is_empty() {
                app.set_notice("no audio files found");
            }
            app.set_tracks(tracks);
        }
        Err(e) => {
            warn!(error = %e, "library scan failed");
            app.set_notice(scan_notice(&e));
        }
    }

    // The one coordinator of this process; everything below borrows it.
    let mut coordinator = PlaybackCoordinator::new(RodioEngineFactory);
    startup::apply_playback_defaults(&mut coordinator, &settings);
    let mut host = SessionHost::attach(&mut coordinator, MprisLauncher, APP_NAME);
    app.attach(&coordinator);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(
        &mut terminal,
        &settings,
        &mut app,
        &mut coordinator,
        &mut host,
        &mut state,
    );

    // Error exits still tear the session down in task-removal order.
    if host.status() != HostStatus::Stopped {
        host.on_task_removed(&mut coordinator);
    }
    app.detach();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match &run_result {
        Ok(()) => info!("{APP_NAME} exited"),
        Err(e) => warn!(error = %e, "{APP_NAME} exited with error"),
    }
    run_result
}
