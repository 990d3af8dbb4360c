use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::thread::spawn_audio_thread;
use super::types::{
    EngineError, EngineFactory, EngineListener, MediaItem, PlaybackEngine, RepeatMode,
};

/// Messages from the engine handle to the audio thread.
#[derive(Debug)]
pub(crate) enum EngineCmd {
    SetListener(EngineListener),
    SetMediaList {
        items: Vec<MediaItem>,
        start_index: usize,
        start_offset_ms: u64,
    },
    Prepare,
    SetAutoStart(bool),
    Play,
    Pause,
    SeekTo(u64),
    Next,
    Prev,
    SetShuffle(bool),
    SetRepeat(RepeatMode),
    /// Stop audio, drop the output stream and end the thread.
    Release,
}

/// Values the audio thread publishes for lock-and-read access.
#[derive(Debug, Default)]
pub(crate) struct EngineSnapshot {
    pub playing: bool,
    pub position_base: Duration,
    pub resumed_at: Option<Instant>,
    pub duration: Option<Duration>,
}

impl EngineSnapshot {
    fn position(&self) -> Duration {
        self.position_base + self.resumed_at.map_or(Duration::ZERO, |t| t.elapsed())
    }
}

pub(crate) type SnapshotHandle = Arc<Mutex<EngineSnapshot>>;

/// Handle to the audio thread. Dropping it releases the engine.
pub struct RodioEngine {
    tx: Sender<EngineCmd>,
    snapshot: SnapshotHandle,
    join: Option<JoinHandle<()>>,
}

impl RodioEngine {
    fn send(&self, cmd: EngineCmd) {
        if self.tx.send(cmd).is_err() {
            debug!("audio thread is gone; command dropped");
        }
    }

    fn read<T>(&self, f: impl FnOnce(&EngineSnapshot) -> T) -> Option<T> {
        self.snapshot.lock().ok().map(|s| f(&s))
    }
}

impl PlaybackEngine for RodioEngine {
    fn set_listener(&mut self, listener: EngineListener) {
        self.send(EngineCmd::SetListener(listener));
    }

    fn set_media_list(&mut self, items: Vec<MediaItem>, start_index: usize, start_offset_ms: u64) {
        self.send(EngineCmd::SetMediaList {
            items,
            start_index,
            start_offset_ms,
        });
    }

    fn prepare(&mut self) {
        self.send(EngineCmd::Prepare);
    }

    fn set_auto_start(&mut self, auto_start: bool) {
        self.send(EngineCmd::SetAutoStart(auto_start));
    }

    fn play(&mut self) {
        self.send(EngineCmd::Play);
    }

    fn pause(&mut self) {
        self.send(EngineCmd::Pause);
    }

    fn seek_to(&mut self, position_ms: u64) {
        self.send(EngineCmd::SeekTo(position_ms));
    }

    fn skip_to_next(&mut self) {
        self.send(EngineCmd::Next);
    }

    fn skip_to_previous(&mut self) {
        self.send(EngineCmd::Prev);
    }

    fn set_shuffle_enabled(&mut self, enabled: bool) {
        self.send(EngineCmd::SetShuffle(enabled));
    }

    fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.send(EngineCmd::SetRepeat(mode));
    }

    fn duration_ms(&self) -> u64 {
        self.read(|s| s.duration.map_or(0, |d| d.as_millis() as u64))
            .unwrap_or(0)
    }

    fn position_ms(&self) -> u64 {
        self.read(|s| s.position().as_millis() as u64).unwrap_or(0)
    }

    fn is_playing(&self) -> bool {
        self.read(|s| s.playing).unwrap_or(false)
    }

    fn release(&mut self) {
        let Some(handle) = self.join.take() else {
            return;
        };
        self.send(EngineCmd::Release);
        let _ = handle.join();
        info!("playback engine released");
    }
}

impl Drop for RodioEngine {
    fn drop(&mut self) {
        self.release();
    }
}

/// Builds `RodioEngine`s on the default output device.
#[derive(Debug, Default)]
pub struct RodioEngineFactory;

impl EngineFactory for RodioEngineFactory {
    type Engine = RodioEngine;

    fn build(&self) -> Result<RodioEngine, EngineError> {
        let (tx, rx) = mpsc::channel::<EngineCmd>();
        let snapshot: SnapshotHandle = Arc::new(Mutex::new(EngineSnapshot::default()));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        let join = spawn_audio_thread(rx, snapshot.clone(), ready_tx)?;

        // The output stream is opened on the audio thread; wait for its verdict.
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(RodioEngine {
                tx,
                snapshot,
                join: Some(join),
            }),
            Ok(Err(msg)) => {
                let _ = join.join();
                Err(EngineError::Device(msg))
            }
            Err(_) => {
                let _ = join.join();
                Err(EngineError::Startup)
            }
        }
    }
}
