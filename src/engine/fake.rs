//! Scriptable in-memory engine for coordinator and host tests.
//!
//! `FakeFactory` hands out `FakeEngine`s that record every call into a
//! shared log and emit the same events the rodio engine would, with
//! identity play order and wrapping skips. `FakeProbe` lets a test inspect
//! the log and inject engine-side events such as end of track.

use std::sync::{Arc, Mutex, MutexGuard};

use super::types::{
    EngineError, EngineEvent, EngineEventKind, EngineFactory, EngineListener, MediaItem,
    PlaybackEngine, PlaybackState, RepeatMode,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    SetListener,
    SetMediaList { len: usize, start: usize, offset_ms: u64 },
    Prepare,
    SetAutoStart(bool),
    Play,
    Pause,
    SeekTo(u64),
    Next,
    Prev,
    Shuffle(bool),
    Repeat(RepeatMode),
    Release,
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub calls: Vec<Call>,
    pub builds: usize,
    pub fail_build: bool,
    pub listener: Option<EngineListener>,
    pub generation: u64,
    pub items: Vec<MediaItem>,
    pub pos: usize,
    pub playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub released: bool,
}

impl FakeState {
    fn emit(&self, kind: EngineEventKind) {
        if let Some(tx) = &self.listener {
            let _ = tx.send(EngineEvent {
                generation: self.generation,
                kind,
            });
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.emit(EngineEventKind::IsPlayingChanged(playing));
        }
    }
}

type Shared = Arc<Mutex<FakeState>>;

fn lock(shared: &Shared) -> MutexGuard<'_, FakeState> {
    shared.lock().unwrap_or_else(|p| p.into_inner())
}

pub(crate) struct FakeFactory {
    shared: Shared,
}

pub(crate) struct FakeEngine {
    shared: Shared,
}

/// Test-side view of the engine the coordinator owns.
#[derive(Clone)]
pub(crate) struct FakeProbe {
    shared: Shared,
}

impl FakeFactory {
    pub fn new() -> (Self, FakeProbe) {
        let shared: Shared = Arc::new(Mutex::new(FakeState::default()));
        (
            Self {
                shared: shared.clone(),
            },
            FakeProbe { shared },
        )
    }
}

impl EngineFactory for FakeFactory {
    type Engine = FakeEngine;

    fn build(&self) -> Result<FakeEngine, EngineError> {
        let mut s = lock(&self.shared);
        if s.fail_build {
            return Err(EngineError::Device("fake device unavailable".to_string()));
        }
        // A rebuilt engine starts from scratch, like a fresh audio thread.
        let builds = s.builds + 1;
        let calls = std::mem::take(&mut s.calls);
        *s = FakeState {
            calls,
            builds,
            ..FakeState::default()
        };
        Ok(FakeEngine {
            shared: self.shared.clone(),
        })
    }
}

impl FakeEngine {
    fn record(&self, call: Call) -> MutexGuard<'_, FakeState> {
        let mut s = lock(&self.shared);
        s.calls.push(call);
        s
    }

    fn skip(&mut self, call: Call, forward: bool) {
        let mut s = self.record(call);
        let len = s.items.len();
        if len == 0 {
            return;
        }
        s.pos = if forward {
            (s.pos + 1) % len
        } else if s.pos == 0 {
            len - 1
        } else {
            s.pos - 1
        };
        let index = s.pos;
        s.emit(EngineEventKind::ActiveItemChanged { index });
    }
}

impl PlaybackEngine for FakeEngine {
    fn set_listener(&mut self, listener: EngineListener) {
        let mut s = self.record(Call::SetListener);
        s.listener = Some(listener);
    }

    fn set_media_list(&mut self, items: Vec<MediaItem>, start_index: usize, start_offset_ms: u64) {
        let mut s = self.record(Call::SetMediaList {
            len: items.len(),
            start: start_index,
            offset_ms: start_offset_ms,
        });
        s.generation += 1;
        s.items = items;
        s.pos = start_index;
        if start_index < s.items.len() {
            s.emit(EngineEventKind::ActiveItemChanged { index: start_index });
        }
    }

    fn prepare(&mut self) {
        let s = self.record(Call::Prepare);
        if !s.items.is_empty() {
            s.emit(EngineEventKind::PlaybackStateChanged(PlaybackState::Ready));
        }
    }

    fn set_auto_start(&mut self, auto_start: bool) {
        let mut s = self.record(Call::SetAutoStart(auto_start));
        if !s.items.is_empty() {
            s.set_playing(auto_start);
        }
    }

    fn play(&mut self) {
        let mut s = self.record(Call::Play);
        if !s.items.is_empty() {
            s.set_playing(true);
        }
    }

    fn pause(&mut self) {
        let mut s = self.record(Call::Pause);
        s.set_playing(false);
    }

    fn seek_to(&mut self, position_ms: u64) {
        let mut s = self.record(Call::SeekTo(position_ms));
        s.position_ms = position_ms;
    }

    fn skip_to_next(&mut self) {
        self.skip(Call::Next, true);
    }

    fn skip_to_previous(&mut self) {
        self.skip(Call::Prev, false);
    }

    fn set_shuffle_enabled(&mut self, enabled: bool) {
        self.record(Call::Shuffle(enabled));
    }

    fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.record(Call::Repeat(mode));
    }

    fn duration_ms(&self) -> u64 {
        lock(&self.shared).duration_ms
    }

    fn position_ms(&self) -> u64 {
        lock(&self.shared).position_ms
    }

    fn is_playing(&self) -> bool {
        lock(&self.shared).playing
    }

    fn release(&mut self) {
        let mut s = self.record(Call::Release);
        s.released = true;
        s.playing = false;
        s.listener = None;
    }
}

impl FakeProbe {
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.shared).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.shared).calls.clear();
    }

    pub fn builds(&self) -> usize {
        lock(&self.shared).builds
    }

    pub fn released(&self) -> bool {
        lock(&self.shared).released
    }

    pub fn fail_next_build(&self) {
        lock(&self.shared).fail_build = true;
    }

    pub fn set_times(&self, position_ms: u64, duration_ms: u64) {
        let mut s = lock(&self.shared);
        s.position_ms = position_ms;
        s.duration_ms = duration_ms;
    }

    /// Report the current item as finished, like the audio thread's end check.
    pub fn finish_current(&self) {
        let s = lock(&self.shared);
        s.emit(EngineEventKind::PlaybackStateChanged(PlaybackState::Ended));
    }

    /// Emit an arbitrary event tagged with the engine's current generation.
    pub fn emit(&self, kind: EngineEventKind) {
        lock(&self.shared).emit(kind);
    }

    /// Emit an event tagged as belonging to the previous media list.
    pub fn emit_stale(&self, kind: EngineEventKind) {
        let s = lock(&self.shared);
        if let Some(tx) = &s.listener {
            let _ = tx.send(EngineEvent {
                generation: s.generation.saturating_sub(1),
                kind,
            });
        }
    }
}
