//! Playback engine: the capability interface the coordinator drives, and
//! the `rodio` implementation that runs on a dedicated audio thread.

#[cfg(test)]
pub(crate) mod fake;
mod order;
mod player;
mod sink;
mod thread;
mod types;

pub use player::{RodioEngine, RodioEngineFactory};
pub use types::{
    EngineError, EngineEvent, EngineEventKind, EngineFactory, EngineListener, MediaItem,
    PlaybackEngine, PlaybackState, RepeatMode,
};

use player::{EngineCmd, SnapshotHandle};
