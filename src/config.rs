//! Configuration schema and loader.
//!
//! Settings come from environment variables, an optional TOML file and
//! struct defaults, in that order of precedence.

mod load;
mod schema;

pub use schema::*;
