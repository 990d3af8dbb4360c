use tracing::debug;

use crate::config::{self, RepeatSetting};
use crate::coordinator::PlaybackCoordinator;
use crate::engine::{EngineFactory, RepeatMode};

/// Map the configured repeat setting onto the engine's mode.
pub fn repeat_mode(setting: RepeatSetting) -> RepeatMode {
    match setting {
        RepeatSetting::Off => RepeatMode::Off,
        RepeatSetting::One => RepeatMode::One,
    }
}

/// Seed the coordinator with configured playback defaults. They reach the
/// engine when it is built.
pub fn apply_playback_defaults<F: EngineFactory>(
    coordinator: &mut PlaybackCoordinator<F>,
    settings: &config::Settings,
) {
    coordinator.set_shuffle(settings.playback.shuffle);
    coordinator.set_repeat(repeat_mode(settings.playback.repeat));
    debug!(
        shuffle = settings.playback.shuffle,
        repeat = ?settings.playback.repeat,
        "playback defaults applied"
    );
}
