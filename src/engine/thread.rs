use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rodio::OutputStreamBuilder;
use tracing::{debug, info, warn};

use super::order::{build_order, step_back, step_forward};
use super::sink::{AudioOutput, OutputSink};
use super::types::{
    EngineEvent, EngineEventKind, EngineListener, MediaItem, PlaybackState, RepeatMode,
};
use super::{EngineCmd, SnapshotHandle};

/// Audio-thread state. Only the thread itself touches it.
pub(super) struct AudioThread<O: AudioOutput> {
    output: O,
    snapshot: SnapshotHandle,
    listener: Option<EngineListener>,

    items: Vec<MediaItem>,
    order: Vec<usize>,
    order_pos: usize,
    generation: u64,

    sink: Option<O::Sink>,
    state: PlaybackState,
    prepared: bool,
    auto_start: bool,
    playing: bool,
    pending_offset: Duration,

    // Position bookkeeping: `accumulated` plus time since `started_at`.
    started_at: Option<Instant>,
    accumulated: Duration,
    duration: Option<Duration>,

    shuffle: bool,
    repeat: RepeatMode,
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<EngineCmd>,
    snapshot: SnapshotHandle,
    ready: SyncSender<Result<(), String>>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("refrain-audio".to_string())
        .spawn(move || {
            let mut stream = match OutputStreamBuilder::open_default_stream() {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready.send(Err(e.to_string()));
                    return;
                }
            };
            // rodio logs to stderr when OutputStream is dropped. That's useful in
            // debugging, but noisy for a TUI app.
            stream.log_on_drop(false);
            let _ = ready.send(Ok(()));

            let mut audio = AudioThread::new(stream, snapshot);
            audio.run(rx);
        })
}

impl<O: AudioOutput> AudioThread<O> {
    pub(super) fn new(output: O, snapshot: SnapshotHandle) -> Self {
        Self {
            output,
            snapshot,
            listener: None,
            items: Vec::new(),
            order: Vec::new(),
            order_pos: 0,
            generation: 0,
            sink: None,
            state: PlaybackState::Idle,
            prepared: false,
            auto_start: false,
            playing: false,
            pending_offset: Duration::ZERO,
            started_at: None,
            accumulated: Duration::ZERO,
            duration: None,
            shuffle: false,
            repeat: RepeatMode::Off,
        }
    }

    fn run(&mut self, rx: Receiver<EngineCmd>) {
        loop {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(cmd) => {
                    if !self.handle(cmd) {
                        self.publish();
                        info!("audio thread released");
                        break;
                    }
                }
                // Periodic check for the end of the current item.
                Err(RecvTimeoutError::Timeout) => self.check_finished(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.publish();
        }
    }

    /// Apply one command. Returns `false` once the engine has been released.
    pub(super) fn handle(&mut self, cmd: EngineCmd) -> bool {
        match cmd {
            EngineCmd::SetListener(listener) => {
                self.listener = Some(listener);
            }
            EngineCmd::SetMediaList {
                items,
                start_index,
                start_offset_ms,
            } => {
                self.stop_sink();
                self.generation += 1;
                self.items = items;
                let anchor = (start_index < self.items.len()).then_some(start_index);
                self.order = build_order(self.items.len(), self.shuffle, anchor, &mut rand::rng());
                self.order_pos = anchor
                    .and_then(|a| self.order.iter().position(|&i| i == a))
                    .unwrap_or(0);
                self.pending_offset = Duration::from_millis(start_offset_ms);
                self.prepared = false;
                self.duration = None;
                self.set_state(PlaybackState::Idle);
                debug!(
                    generation = self.generation,
                    items = self.items.len(),
                    "media list replaced"
                );
                if let Some(index) = self.current_index() {
                    self.emit(EngineEventKind::ActiveItemChanged { index });
                }
            }
            EngineCmd::Prepare => {
                self.prepared = true;
                let offset = std::mem::take(&mut self.pending_offset);
                self.load_current(offset);
            }
            EngineCmd::SetAutoStart(auto_start) => {
                self.auto_start = auto_start;
                if auto_start {
                    self.resume();
                } else {
                    self.suspend();
                }
            }
            EngineCmd::Play => {
                self.auto_start = true;
                if self.state == PlaybackState::Ended {
                    self.load_current(Duration::ZERO);
                } else {
                    self.resume();
                }
            }
            EngineCmd::Pause => {
                self.auto_start = false;
                self.suspend();
            }
            EngineCmd::SeekTo(ms) => {
                let target = Duration::from_millis(ms);
                if self.sink.is_some() {
                    // Rebuild the current sink and skip into the file.
                    self.load_current(target);
                } else {
                    self.pending_offset = target;
                }
            }
            EngineCmd::Next => self.skip(step_forward(self.order_pos, self.order.len())),
            EngineCmd::Prev => self.skip(step_back(self.order_pos, self.order.len())),
            EngineCmd::SetShuffle(shuffle) => {
                if shuffle != self.shuffle {
                    self.shuffle = shuffle;
                    let current = self.current_index();
                    self.order = build_order(self.items.len(), shuffle, current, &mut rand::rng());
                    self.order_pos = current
                        .and_then(|c| self.order.iter().position(|&i| i == c))
                        .unwrap_or(0);
                }
            }
            EngineCmd::SetRepeat(mode) => {
                self.repeat = mode;
            }
            EngineCmd::Release => {
                self.stop_sink();
                self.set_playing(false);
                self.listener = None;
                return false;
            }
        }
        true
    }

    fn current_index(&self) -> Option<usize> {
        self.order.get(self.order_pos).copied()
    }

    fn skip(&mut self, pos: usize) {
        if self.items.is_empty() {
            return;
        }
        self.order_pos = pos;
        if let Some(index) = self.current_index() {
            self.emit(EngineEventKind::ActiveItemChanged { index });
        }
        // Before `prepare` only the position moves; `prepare` opens the item.
        if self.prepared {
            self.load_current(Duration::ZERO);
        }
    }

    /// Open the current item at `offset`, replacing any existing sink.
    fn load_current(&mut self, offset: Duration) {
        self.stop_sink();
        let Some(index) = self.current_index() else {
            self.set_state(PlaybackState::Idle);
            return;
        };
        let uri = self.items[index].uri.clone();

        self.set_state(PlaybackState::Buffering);
        match self.output.open(&uri, offset) {
            Ok((sink, total)) => {
                self.sink = Some(sink);
                self.duration = total;
                self.accumulated = offset;
                self.started_at = None;
                self.set_state(PlaybackState::Ready);
                if self.auto_start {
                    self.resume();
                } else {
                    self.set_playing(false);
                }
            }
            Err(reason) => {
                warn!(%uri, %reason, "failed to load media item");
                self.set_playing(false);
                self.set_state(PlaybackState::Idle);
                self.emit(EngineEventKind::LoadFailed { uri, reason });
            }
        }
    }

    fn resume(&mut self) {
        let Some(ref s) = self.sink else {
            return;
        };
        if self.state != PlaybackState::Ready {
            return;
        }
        s.play();
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        self.set_playing(true);
    }

    fn suspend(&mut self) {
        if let Some(ref s) = self.sink {
            s.pause();
        }
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
        self.set_playing(false);
    }

    fn stop_sink(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }

    pub(super) fn check_finished(&mut self) {
        let finished = match self.sink {
            Some(ref s) => self.playing && self.state == PlaybackState::Ready && s.empty(),
            None => false,
        };
        if !finished {
            return;
        }

        match self.repeat {
            RepeatMode::One => self.load_current(Duration::ZERO),
            RepeatMode::Off => {
                // `playing` stays set: the engine still wants to play and the
                // next skip continues without an extra `play`.
                if let Some(st) = self.started_at.take() {
                    self.accumulated += st.elapsed();
                }
                self.set_state(PlaybackState::Ended);
            }
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.emit(EngineEventKind::IsPlayingChanged(playing));
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.emit(EngineEventKind::PlaybackStateChanged(state));
        }
    }

    fn emit(&mut self, kind: EngineEventKind) {
        let Some(ref tx) = self.listener else {
            return;
        };
        let event = EngineEvent {
            generation: self.generation,
            kind,
        };
        if tx.send(event).is_err() {
            // The coordinator dropped its receiver; nobody is listening anymore.
            self.listener = None;
        }
    }

    /// Copy what the handle may read without a round trip to this thread.
    fn publish(&self) {
        if let Ok(mut snap) = self.snapshot.lock() {
            snap.playing = self.playing;
            snap.position_base = self.accumulated;
            snap.resumed_at = self.started_at;
            snap.duration = self.duration;
        }
    }
}
