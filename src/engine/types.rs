//! Engine capability interface and the values crossing it.
//!
//! The coordinator only ever talks to an engine through `PlaybackEngine`;
//! the engine answers through `EngineEvent`s sent to the registered listener.

use std::io;
use std::sync::mpsc::Sender;

use thiserror::Error;

/// One entry of the engine's media list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: u64,
    pub uri: String,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum RepeatMode {
    /// Finished items are reported as `Ended`.
    #[default]
    Off,
    /// Restart the current item when it ends, without reporting `Ended`.
    One,
}

/// Coarse engine playback state, reported through `PlaybackStateChanged`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing loaded (or the load was superseded).
    Idle,
    /// Opening and decoding the current item.
    Buffering,
    /// Current item is ready to produce audio.
    Ready,
    /// Current item played to its end.
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEventKind {
    IsPlayingChanged(bool),
    /// The engine moved to another media-list entry, by command or by itself.
    ActiveItemChanged { index: usize },
    PlaybackStateChanged(PlaybackState),
    /// The current item could not be opened or decoded.
    LoadFailed { uri: String, reason: String },
}

/// An engine notification.
///
/// `generation` counts `set_media_list` calls since the engine was built
/// (0 before the first one), so listeners can drop events that describe a
/// media list they have already replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub generation: u64,
    pub kind: EngineEventKind,
}

pub type EngineListener = Sender<EngineEvent>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no audio output device: {0}")]
    Device(String),
    #[error("failed to spawn audio thread: {0}")]
    Spawn(#[from] io::Error),
    #[error("audio thread exited during startup")]
    Startup,
}

/// Commands a playback engine accepts.
///
/// Every mutating call is fire-and-forget: it returns immediately and its
/// effect is observed through events. Reads never block.
pub trait PlaybackEngine {
    /// Register the listener that receives every subsequent event.
    fn set_listener(&mut self, listener: EngineListener);

    /// Replace the media list, positioned at `start_index` / `start_offset_ms`.
    fn set_media_list(&mut self, items: Vec<MediaItem>, start_index: usize, start_offset_ms: u64);
    /// Start opening the current item.
    fn prepare(&mut self);
    /// Play as soon as the current item is ready.
    fn set_auto_start(&mut self, auto_start: bool);

    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to(&mut self, position_ms: u64);
    /// Move one entry forward in play order, wrapping at the end.
    fn skip_to_next(&mut self);
    /// Move one entry back in play order, wrapping at the start.
    fn skip_to_previous(&mut self);
    fn set_shuffle_enabled(&mut self, enabled: bool);
    fn set_repeat_mode(&mut self, mode: RepeatMode);

    fn duration_ms(&self) -> u64;
    fn position_ms(&self) -> u64;
    fn is_playing(&self) -> bool;

    /// Free the output device and stop emitting events. The handle is dead afterwards.
    fn release(&mut self);
}

/// Builds engines. Moved into the coordinator, which is the only caller.
pub trait EngineFactory {
    type Engine: PlaybackEngine;

    fn build(&self) -> Result<Self::Engine, EngineError>;
}
