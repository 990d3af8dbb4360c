//! Application model types: `App` and `NowPlaying`.
//!
//! The `App` struct holds the song list, the cursor and a mirror of the
//! coordinator's observable state for rendering. It reads that state through
//! subscriptions and never talks to the engine.

use crate::coordinator::{PlaybackCoordinator, SessionPhase, Subscription};
use crate::engine::{EngineFactory, RepeatMode};
use crate::library::Track;

/// What the now-playing bar shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NowPlaying {
    pub track: Option<Track>,
    pub index: usize,
    pub playing: bool,
    pub phase: SessionPhase,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub position_ms: u64,
    pub duration_ms: u64,
}

struct Subscriptions {
    playing: Subscription<bool>,
    index: Subscription<usize>,
    track: Subscription<Option<Track>>,
    phase: Subscription<SessionPhase>,
    shuffle: Subscription<bool>,
    repeat: Subscription<RepeatMode>,
}

/// The main application model.
pub struct App {
    pub tracks: Vec<Track>,
    pub selected: usize,
    pub now_playing: NowPlaying,

    /// Cursor jumps to the playing track whenever it changes.
    pub follow_playback: bool,
    /// One-line message for the status box (scan errors, missing access).
    pub notice: Option<String>,
    pub current_dir: Option<String>,
    pub metadata_window: bool,

    subs: Option<Subscriptions>,
}

impl App {
    /// Create a new `App` with the provided list of `tracks`.
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            selected: 0,
            now_playing: NowPlaying::default(),
            follow_playback: true,
            notice: None,
            current_dir: None,
            metadata_window: false,
            subs: None,
        }
    }

    /// Start mirroring `coordinator`'s observable state.
    pub fn attach<F: EngineFactory>(&mut self, coordinator: &PlaybackCoordinator<F>) {
        self.subs = Some(Subscriptions {
            playing: coordinator.is_playing().subscribe(),
            index: coordinator.current_index().subscribe(),
            track: coordinator.current_track().subscribe(),
            phase: coordinator.session_phase().subscribe(),
            shuffle: coordinator.shuffle().subscribe(),
            repeat: coordinator.repeat().subscribe(),
        });
    }

    /// Stop mirroring. The coordinator is unaffected.
    pub fn detach(&mut self) {
        self.subs = None;
    }

    #[cfg(test)]
    pub fn is_attached(&self) -> bool {
        self.subs.is_some()
    }

    /// Pull pushed state changes into `now_playing`. Returns whether anything changed.
    pub fn sync(&mut self) -> bool {
        let Some(subs) = self.subs.as_ref() else {
            return false;
        };
        let before = self.now_playing.clone();
        let np = &mut self.now_playing;

        if let Some(v) = subs.playing.latest() {
            np.playing = v;
        }
        if let Some(v) = subs.index.latest() {
            np.index = v;
        }
        if let Some(v) = subs.track.latest() {
            np.track = v;
        }
        if let Some(v) = subs.phase.latest() {
            np.phase = v;
        }
        if let Some(v) = subs.shuffle.latest() {
            np.shuffle = v;
        }
        if let Some(v) = subs.repeat.latest() {
            np.repeat = v;
        }

        let track_changed = before.track != self.now_playing.track;
        if track_changed && self.follow_playback {
            if let Some(i) = self.now_playing_position() {
                self.selected = i;
            }
        }
        before != self.now_playing
    }

    /// Record engine position and duration for the progress display.
    pub fn set_progress(&mut self, position_ms: u64, duration_ms: u64) {
        self.now_playing.position_ms = position_ms;
        self.now_playing.duration_ms = duration_ms;
    }

    /// Index in `tracks` of the track that is playing, if it is listed.
    pub fn now_playing_position(&self) -> Option<usize> {
        let id = self.now_playing.track.as_ref()?.id;
        self.tracks.iter().position(|t| t.id == id)
    }

    /// Return true if the library contains any tracks.
    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    /// Replace the listing after a rescan, keeping the cursor in range.
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.selected = self.selected.min(self.tracks.len().saturating_sub(1));
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    /// Set the selected track index, clamped to the listing.
    pub fn set_selected(&mut self, idx: usize) {
        self.selected = idx.min(self.tracks.len().saturating_sub(1));
    }

    /// Move selection to the next track, wrapping to the first.
    pub fn next(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + 1) % self.tracks.len();
        }
    }

    /// Move selection to the previous track, wrapping to the last.
    pub fn prev(&mut self) {
        if self.has_tracks() {
            self.selected = match self.selected {
                0 => self.tracks.len() - 1,
                i => i - 1,
            };
        }
    }

    /// Whether the cursor sits on the track that is playing right now.
    pub fn selected_is_playing(&self) -> bool {
        self.now_playing.playing && self.now_playing_position() == Some(self.selected)
    }
}
