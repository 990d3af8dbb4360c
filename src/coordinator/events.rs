//! Engine event adapter: turns `EngineEvent`s into session updates.

use tracing::{debug, error, trace};

use super::playback::{CoordinatorError, PlaybackCoordinator};
use super::session::SessionPhase;
use crate::engine::{EngineEvent, EngineEventKind, EngineFactory, PlaybackState};

impl<F: EngineFactory> PlaybackCoordinator<F> {
    pub(super) fn apply_event(&mut self, event: EngineEvent) -> Result<(), CoordinatorError> {
        trace!(?event, "engine event");
        // Item and state events from a replaced media list describe a queue
        // we no longer hold.
        let stale = event.generation < self.session.generation;
        match event.kind {
            EngineEventKind::IsPlayingChanged(playing) => {
                self.session.playing = playing;
                self.is_playing.set(playing);
                self.refresh_phase();
            }
            _ if stale => {
                debug!(
                    generation = event.generation,
                    current = self.session.generation,
                    "dropping stale engine event"
                );
            }
            EngineEventKind::ActiveItemChanged { index } => {
                self.session.confirm(index);
                self.publish_current();
                if self.phase.get() == SessionPhase::Ended {
                    self.phase.set(SessionPhase::Loaded);
                }
                self.refresh_phase();
            }
            EngineEventKind::PlaybackStateChanged(PlaybackState::Ended) => {
                self.phase.set(SessionPhase::Ended);
                if !self.session.queue.is_empty() {
                    self.next();
                }
            }
            EngineEventKind::PlaybackStateChanged(PlaybackState::Ready) => {
                self.refresh_phase();
            }
            EngineEventKind::PlaybackStateChanged(state) => {
                trace!(?state, "engine state");
            }
            EngineEventKind::LoadFailed { uri, reason } => {
                error!(%uri, %reason, "engine failed to load track");
                return Err(CoordinatorError::Load { uri, reason });
            }
        }
        Ok(())
    }

    /// Derive the phase from the queue and the playing flag.
    fn refresh_phase(&mut self) {
        let next = match self.phase.get() {
            SessionPhase::Released | SessionPhase::Ended => return,
            _ if self.session.queue.is_empty() => SessionPhase::Empty,
            _ if self.session.playing => SessionPhase::Playing,
            SessionPhase::Loaded => SessionPhase::Loaded,
            _ => SessionPhase::Paused,
        };
        self.phase.set(next);
    }
}
