//! The playback coordinator and the state it publishes.
//!
//! One `PlaybackCoordinator` owns the engine handle, the active queue and the
//! session state. Every surface reads it through `Observable` cells and drives
//! it through its control operations; nothing else touches the engine.

mod events;
mod observable;
mod playback;
mod session;

pub use observable::{Observable, Subscription};
pub use playback::{CoordinatorError, HostSignal, PlaybackCoordinator};
pub use session::SessionPhase;
