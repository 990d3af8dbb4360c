use std::sync::mpsc::{self, Receiver, Sender};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::observable::Observable;
use super::session::{Queue, SessionPhase, SessionState};
use crate::engine::{
    EngineError, EngineEvent, EngineFactory, MediaItem, PlaybackEngine, RepeatMode,
};
use crate::library::Track;

/// Signals from the coordinator to the background session host.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HostSignal {
    /// A queue started playing; the host should come up if it is not already.
    Activate,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to load {uri}: {reason}")]
    Load { uri: String, reason: String },
}

/// Sole owner of the playback engine and of the session it plays.
pub struct PlaybackCoordinator<F: EngineFactory> {
    factory: F,
    pub(super) engine: Option<F::Engine>,
    pub(super) events: Option<Receiver<EngineEvent>>,
    pub(super) session: SessionState,
    host: Option<Sender<HostSignal>>,

    pub(super) is_playing: Observable<bool>,
    pub(super) current_index: Observable<usize>,
    pub(super) current_track: Observable<Option<Track>>,
    pub(super) phase: Observable<SessionPhase>,
    pub(super) shuffle: Observable<bool>,
    pub(super) repeat: Observable<RepeatMode>,
}

impl<F: EngineFactory> PlaybackCoordinator<F> {
    /// A coordinator with no engine yet. The engine is built on first use.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            engine: None,
            events: None,
            session: SessionState::default(),
            host: None,
            is_playing: Observable::new(false),
            current_index: Observable::new(0),
            current_track: Observable::new(None),
            phase: Observable::new(SessionPhase::Empty),
            shuffle: Observable::new(false),
            repeat: Observable::new(RepeatMode::Off),
        }
    }

    /// Where `HostSignal`s go. Replaces any earlier host channel.
    pub fn attach_host(&mut self, tx: Sender<HostSignal>) {
        self.host = Some(tx);
    }

    pub fn is_playing(&self) -> &Observable<bool> {
        &self.is_playing
    }

    pub fn current_index(&self) -> &Observable<usize> {
        &self.current_index
    }

    pub fn current_track(&self) -> &Observable<Option<Track>> {
        &self.current_track
    }

    pub fn session_phase(&self) -> &Observable<SessionPhase> {
        &self.phase
    }

    pub fn shuffle(&self) -> &Observable<bool> {
        &self.shuffle
    }

    pub fn repeat(&self) -> &Observable<RepeatMode> {
        &self.repeat
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.get()
    }

    #[cfg(test)]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[cfg(test)]
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// The live engine, built on the first call.
    pub fn ensure_engine(&mut self) -> Result<&mut F::Engine, CoordinatorError> {
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => self.build_engine()?,
        };
        Ok(self.engine.insert(engine))
    }

    fn build_engine(&mut self) -> Result<F::Engine, CoordinatorError> {
        let mut engine = self.factory.build()?;
        let (tx, rx) = mpsc::channel();
        engine.set_listener(tx);
        engine.set_shuffle_enabled(self.shuffle.get());
        engine.set_repeat_mode(self.repeat.get());

        self.events = Some(rx);
        self.session = SessionState::default();
        if self.phase.get() == SessionPhase::Released {
            self.phase.set(SessionPhase::Empty);
        }
        info!("playback engine built");
        Ok(engine)
    }

    /// Replace the queue with `tracks` and start playing at `start_index`.
    ///
    /// The current track is published right away; the engine confirms it
    /// later through `ActiveItemChanged`.
    pub fn set_queue_and_play(
        &mut self,
        tracks: Vec<Track>,
        start_index: usize,
    ) -> Result<(), CoordinatorError> {
        if tracks.is_empty() {
            self.clear_queue();
            return Ok(());
        }

        let start = start_index.min(tracks.len() - 1);
        if start != start_index {
            warn!(start_index, len = tracks.len(), "start index out of range; clamped");
        }
        let items: Vec<MediaItem> = tracks
            .iter()
            .map(|t| MediaItem {
                id: t.id,
                uri: t.uri.clone(),
            })
            .collect();

        let engine = self.ensure_engine()?;
        engine.set_media_list(items, start, 0);
        engine.prepare();
        engine.set_auto_start(true);

        self.session.generation += 1;
        self.session.queue = Queue::new(tracks, start);
        self.session.request(start);
        self.publish_current();
        self.phase.set(SessionPhase::Loaded);
        debug!(
            start,
            len = self.session.queue.len(),
            generation = self.session.generation,
            "queue replaced"
        );
        self.signal_host();
        Ok(())
    }

    fn clear_queue(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.pause();
            engine.set_media_list(Vec::new(), 0, 0);
            self.session.generation += 1;
        }
        self.session.clear_queue();
        self.publish_current();
        if self.phase.get() != SessionPhase::Released {
            self.phase.set(SessionPhase::Empty);
        }
        debug!("queue cleared");
    }

    fn signal_host(&mut self) {
        let Some(tx) = self.host.as_ref() else {
            return;
        };
        if tx.send(HostSignal::Activate).is_err() {
            debug!("session host is gone; dropping its channel");
            self.host = None;
        }
    }

    pub fn play(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.play();
        }
    }

    pub fn pause(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.pause();
        }
    }

    pub fn toggle_play_pause(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if engine.is_playing() {
            engine.pause();
        } else {
            engine.play();
        }
    }

    pub fn seek_to(&mut self, position_ms: u64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.seek_to(position_ms);
        }
    }

    /// Skip forward in the engine's order and keep playing.
    pub fn next(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        engine.skip_to_next();
        if !engine.is_playing() {
            engine.play();
        }
    }

    /// Skip back in the engine's order and keep playing.
    pub fn previous(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        engine.skip_to_previous();
        if !engine.is_playing() {
            engine.play();
        }
    }

    pub fn duration_ms(&self) -> u64 {
        match self.engine.as_ref() {
            Some(engine) if !self.session.queue.is_empty() => engine.duration_ms(),
            _ => 0,
        }
    }

    pub fn position_ms(&self) -> u64 {
        match self.engine.as_ref() {
            Some(engine) if !self.session.queue.is_empty() => engine.position_ms(),
            _ => 0,
        }
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        self.shuffle.set(enabled);
        if let Some(engine) = self.engine.as_mut() {
            engine.set_shuffle_enabled(enabled);
        }
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat.set(mode);
        if let Some(engine) = self.engine.as_mut() {
            engine.set_repeat_mode(mode);
        }
    }

    /// Tear down the engine and reset the session.
    ///
    /// Only whole-session shutdown calls this; closing a view never does.
    pub fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.release();
            info!("playback engine released");
        }
        self.events = None;
        self.session = SessionState::default();
        self.is_playing.set(false);
        self.publish_current();
        self.phase.set(SessionPhase::Released);
    }

    /// Apply every engine event received so far, in delivery order.
    ///
    /// Returns how many events were applied.
    pub fn process_engine_events(&mut self) -> Result<usize, CoordinatorError> {
        let mut applied = 0;
        loop {
            let batch: Vec<EngineEvent> = match self.events.as_ref() {
                Some(rx) => rx.try_iter().collect(),
                None => return Ok(applied),
            };
            if batch.is_empty() {
                return Ok(applied);
            }
            for event in batch {
                self.apply_event(event)?;
                applied += 1;
            }
        }
    }

    pub(super) fn publish_current(&mut self) {
        let index = self
            .session
            .displayed_index()
            .unwrap_or_else(|| self.session.queue.position());
        let track = self.session.current_track().cloned();
        self.current_index.set(index);
        self.current_track.set(track);
    }
}
