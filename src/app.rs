//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the song list, the cursor
//! and the now-playing mirror of the playback coordinator.

mod model;

pub use model::*;
