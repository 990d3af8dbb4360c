//! Audio output for the engine thread.
//!
//! `AudioOutput` opens media locators into paused sinks. The `rodio`
//! implementation decodes a file and connects a `Sink` to the output mixer.

use std::fs::File;
use std::io::BufReader;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

/// Resolve a locator to a filesystem path (`file://` prefixes are accepted).
pub(super) fn locator_path(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}

/// Opens media items for the audio thread.
pub(super) trait AudioOutput {
    type Sink: OutputSink;

    /// Open `uri` paused at `start_at`, with the decoder's total duration when known.
    fn open(
        &self,
        uri: &str,
        start_at: Duration,
    ) -> Result<(Self::Sink, Option<Duration>), String>;
}

/// Playback controls of one opened item.
pub(super) trait OutputSink {
    fn play(&self);
    fn pause(&self);
    fn stop(&self);
    /// Everything appended has been played.
    fn empty(&self) -> bool;
}

impl AudioOutput for OutputStream {
    type Sink = Sink;

    fn open(
        &self,
        uri: &str,
        start_at: Duration,
    ) -> Result<(Self::Sink, Option<Duration>), String> {
        create_sink_at(self, uri, start_at)
    }
}

impl OutputSink for Sink {
    fn play(&self) {
        Sink::play(self);
    }

    fn pause(&self) {
        Sink::pause(self);
    }

    fn stop(&self) {
        Sink::stop(self);
    }

    fn empty(&self) -> bool {
        Sink::empty(self)
    }
}

/// Create a paused `Sink` for `uri` that starts playback at `start_at`.
///
/// Returns the sink and the decoder's total duration when it knows one.
fn create_sink_at(
    stream: &OutputStream,
    uri: &str,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), String> {
    let file = File::open(locator_path(uri)).map_err(|e| format!("open failed: {e}"))?;

    let decoder =
        Decoder::new(BufReader::new(file)).map_err(|e| format!("decode failed: {e}"))?;
    let total = decoder.total_duration();
    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    let source = decoder.skip_duration(start_at);

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    Ok((sink, total))
}
