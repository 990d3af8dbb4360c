//! Background session host.
//!
//! Keeps a system-visible control surface (MPRIS) bound to the coordinator
//! for as long as the session lives, independent of what the UI shows. The
//! host never builds an engine itself; it asks the coordinator for one.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coordinator::{
    CoordinatorError, HostSignal, PlaybackCoordinator, SessionPhase, Subscription,
};
use crate::engine::EngineFactory;
use crate::library::Track;
use crate::mpris::{ControlCmd, MprisHandle, PlaybackStatus, spawn_mpris};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to spawn control surface thread: {0}")]
    Spawn(#[from] io::Error),
    #[error("session bus unavailable: {0}")]
    Bus(String),
    #[error("control surface exited during startup")]
    Startup,
}

/// Starts the system control surface. Commands from it arrive on `tx`.
pub trait ControlSurfaceLauncher {
    fn launch(&self, tx: Sender<ControlCmd>, identity: &str) -> Result<MprisHandle, HostError>;
}

#[derive(Debug, Default)]
pub struct MprisLauncher;

impl ControlSurfaceLauncher for MprisLauncher {
    fn launch(&self, tx: Sender<ControlCmd>, identity: &str) -> Result<MprisHandle, HostError> {
        spawn_mpris(tx, identity)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HostStatus {
    /// Waiting for the first queue to start.
    Idle,
    Running,
    /// Task removed; the session is over.
    Stopped,
}

pub struct SessionHost<L: ControlSurfaceLauncher> {
    launcher: L,
    app_name: String,
    signals: Receiver<HostSignal>,
    commands: Receiver<ControlCmd>,
    command_tx: Sender<ControlCmd>,
    surface: Option<MprisHandle>,
    launch_failed: bool,
    track: Subscription<Option<Track>>,
    phase: Subscription<SessionPhase>,
    status: HostStatus,
}

fn status_for(phase: SessionPhase) -> PlaybackStatus {
    match phase {
        // Ended only lasts until auto-advance picks the next item.
        SessionPhase::Playing | SessionPhase::Ended => PlaybackStatus::Playing,
        SessionPhase::Loaded | SessionPhase::Paused => PlaybackStatus::Paused,
        SessionPhase::Empty | SessionPhase::Released => PlaybackStatus::Stopped,
    }
}

impl<L: ControlSurfaceLauncher> SessionHost<L> {
    /// Bind a host to `coordinator`. Nothing starts until the coordinator
    /// signals that a queue is playing.
    pub fn attach<F: EngineFactory>(
        coordinator: &mut PlaybackCoordinator<F>,
        launcher: L,
        app_name: &str,
    ) -> Self {
        let (signal_tx, signals) = mpsc::channel();
        coordinator.attach_host(signal_tx);
        let (command_tx, commands) = mpsc::channel();
        Self {
            launcher,
            app_name: app_name.to_string(),
            signals,
            commands,
            command_tx,
            surface: None,
            launch_failed: false,
            track: coordinator.current_track().subscribe(),
            phase: coordinator.session_phase().subscribe(),
            status: HostStatus::Idle,
        }
    }

    pub fn status(&self) -> HostStatus {
        self.status
    }

    #[cfg(test)]
    pub fn surface(&self) -> Option<&MprisHandle> {
        self.surface.as_ref()
    }

    /// Handle pending activation signals and control-surface commands, then
    /// mirror the coordinator's state onto the surface.
    pub fn pump<F: EngineFactory>(
        &mut self,
        coordinator: &mut PlaybackCoordinator<F>,
    ) -> Result<HostStatus, CoordinatorError> {
        if self.status == HostStatus::Stopped {
            return Ok(self.status);
        }

        let signals: Vec<HostSignal> = self.signals.try_iter().collect();
        for signal in signals {
            match signal {
                HostSignal::Activate => self.activate(coordinator)?,
            }
        }

        let commands: Vec<ControlCmd> = self.commands.try_iter().collect();
        for cmd in commands {
            self.dispatch(coordinator, cmd);
            if self.status == HostStatus::Stopped {
                return Ok(self.status);
            }
        }

        self.sync(coordinator);
        Ok(self.status)
    }

    fn activate<F: EngineFactory>(
        &mut self,
        coordinator: &mut PlaybackCoordinator<F>,
    ) -> Result<(), CoordinatorError> {
        coordinator.ensure_engine()?;
        self.status = HostStatus::Running;
        if self.surface.is_some() || self.launch_failed {
            return Ok(());
        }

        match self
            .launcher
            .launch(self.command_tx.clone(), &self.app_name)
        {
            Ok(surface) => {
                surface.set_track_metadata(
                    coordinator.current_track().get().as_ref(),
                    &self.app_name,
                );
                surface.set_playback(status_for(coordinator.phase()));
                self.surface = Some(surface);
                info!("control surface started");
            }
            Err(e) => {
                // Playback goes on without system controls.
                warn!(error = %e, "control surface unavailable");
                self.launch_failed = true;
            }
        }
        Ok(())
    }

    /// Map one control-surface command onto the coordinator.
    pub fn dispatch<F: EngineFactory>(
        &mut self,
        coordinator: &mut PlaybackCoordinator<F>,
        cmd: ControlCmd,
    ) {
        debug!(?cmd, "control surface command");
        match cmd {
            ControlCmd::Play => coordinator.play(),
            ControlCmd::Pause => coordinator.pause(),
            ControlCmd::PlayPause => coordinator.toggle_play_pause(),
            ControlCmd::Next => coordinator.next(),
            ControlCmd::Prev => coordinator.previous(),
            ControlCmd::Stop => {
                coordinator.pause();
                coordinator.seek_to(0);
            }
            ControlCmd::Seek(offset_micros) => {
                let target = coordinator.position_ms() as i64 + offset_micros / 1_000;
                let duration = coordinator.duration_ms() as i64;
                if duration > 0 && target >= duration {
                    coordinator.next();
                } else {
                    coordinator.seek_to(target.max(0) as u64);
                }
            }
            ControlCmd::SetPosition(micros) => {
                let duration = coordinator.duration_ms() as i64;
                let target = micros / 1_000;
                if micros >= 0 && (duration == 0 || target <= duration) {
                    coordinator.seek_to(target as u64);
                }
            }
            ControlCmd::Quit => self.on_task_removed(coordinator),
        }
    }

    /// The whole task is going away: pause, release the engine, stop.
    pub fn on_task_removed<F: EngineFactory>(&mut self, coordinator: &mut PlaybackCoordinator<F>) {
        coordinator.pause();
        coordinator.release();
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(surface) = self.surface.take() {
            surface.set_playback(PlaybackStatus::Stopped);
        }
        self.status = HostStatus::Stopped;
        info!("session host stopped");
    }

    fn sync<F: EngineFactory>(&mut self, coordinator: &PlaybackCoordinator<F>) {
        let track = self.track.latest();
        let phase = self.phase.latest();
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        if let Some(track) = track {
            surface.set_track_metadata(track.as_ref(), &self.app_name);
        }
        if let Some(phase) = phase {
            surface.set_playback(status_for(phase));
        }
        surface.set_position(coordinator.position_ms());
    }
}

#[cfg(test)]
mod tests;
