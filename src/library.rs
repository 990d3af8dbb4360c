//! Track catalog reader.
//!
//! Walks a music directory, reads tags and yields immutable `Track` values
//! for the UI and the playback coordinator. Nothing here is persisted; a
//! fresh `scan` re-enumerates the directory.

mod display;
mod model;
mod scan;

pub use model::Track;
pub use scan::{CatalogError, scan};
