use crate::library::Track;

/// Ordered tracks plus the current position.
///
/// The position is always in bounds unless the queue is empty. A queue is
/// replaced as a whole; it is never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queue {
    tracks: Vec<Track>,
    position: usize,
}

impl Queue {
    /// Build a queue positioned at `start`, clamped to the last track.
    pub fn new(tracks: Vec<Track>, start: usize) -> Self {
        let position = start.min(tracks.len().saturating_sub(1));
        Self { tracks, position }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Move to `index` if it is in bounds.
    pub(super) fn set_position(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.position = index;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// No queue set.
    #[default]
    Empty,
    /// Queue handed to the engine, which is still preparing.
    Loaded,
    Playing,
    Paused,
    /// The current track finished; auto-advance is under way.
    Ended,
    /// The engine was released; only `ensure_engine` leaves this phase.
    Released,
}

/// Coordinator-owned session state.
///
/// The index is two-phase: `request` records what the coordinator asked the
/// engine for, `confirm` records what the engine reported. The displayed
/// index is the confirmed one once it arrives.
#[derive(Debug, Default)]
pub struct SessionState {
    pub(super) queue: Queue,
    pub(super) requested: Option<usize>,
    pub(super) confirmed: Option<usize>,
    pub(super) playing: bool,
    /// Media lists handed to the current engine so far.
    pub(super) generation: u64,
}

impl SessionState {
    #[cfg(test)]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn displayed_index(&self) -> Option<usize> {
        self.confirmed.or(self.requested)
    }

    /// The track at the displayed index, absent when that index is out of range.
    pub fn current_track(&self) -> Option<&Track> {
        self.displayed_index().and_then(|i| self.queue.get(i))
    }

    pub(super) fn request(&mut self, index: usize) {
        self.queue.set_position(index);
        self.requested = Some(index);
        self.confirmed = None;
    }

    pub(super) fn confirm(&mut self, index: usize) {
        self.queue.set_position(index);
        self.confirmed = Some(index);
        self.requested = None;
    }

    /// Forget the queue but keep the generation count in step with the engine.
    pub(super) fn clear_queue(&mut self) {
        self.queue = Queue::default();
        self.requested = None;
        self.confirmed = None;
    }
}
