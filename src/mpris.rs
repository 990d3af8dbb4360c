use std::collections::HashMap;
use std::sync::mpsc::{self, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{debug, info, warn};
use zbus::object_server::InterfaceRef;
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::host::HostError;
use crate::library::Track;

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.refrain";

/// Transport requests arriving from the desktop's media controls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Relative seek in microseconds.
    Seek(i64),
    /// Absolute position in microseconds.
    SetPosition(i64),
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackStatus {
    fn as_str(self) -> &'static str {
        match self {
            PlaybackStatus::Stopped => "Stopped",
            PlaybackStatus::Playing => "Playing",
            PlaybackStatus::Paused => "Paused",
        }
    }
}

#[derive(Debug, Default)]
struct SharedState {
    playback: PlaybackStatus,
    title: Option<String>,
    artist: Vec<String>,
    album: Option<String>,
    url: Option<String>,
    length_micros: Option<i64>,
    track_id: Option<OwnedObjectPath>,
    position_micros: i64,
}

fn lock(state: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Writer side of the control surface. Updates are pushed to D-Bus by the
/// service thread; dropping the handle stops that thread.
pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

impl MprisHandle {
    /// Reflect `track` as title/subtitle. With no track the title is `fallback_title`.
    pub fn set_track_metadata(&self, track: Option<&Track>, fallback_title: &str) {
        let mut s = lock(&self.state);
        let title = Some(
            track
                .map(Track::display_title)
                .unwrap_or_else(|| fallback_title.to_string()),
        );
        let track_id = track.and_then(|t| {
            ObjectPath::try_from(format!("{OBJECT_PATH}/track/{}", t.id))
                .ok()
                .map(OwnedObjectPath::from)
        });
        if s.title == title && s.track_id == track_id {
            return;
        }

        s.title = title;
        s.track_id = track_id;
        s.artist = track
            .and_then(|t| t.artist.clone())
            .into_iter()
            .collect();
        s.album = track.and_then(|t| t.album.clone());
        s.url = track.map(|t| {
            if t.uri.contains("://") {
                t.uri.clone()
            } else {
                format!("file://{}", t.uri)
            }
        });
        s.length_micros = track
            .and_then(|t| t.duration)
            .map(|d| d.as_micros().min(i64::MAX as u128) as i64);
        drop(s);
        self.changed();
    }

    pub fn set_playback(&self, playback: PlaybackStatus) {
        let mut s = lock(&self.state);
        if s.playback == playback {
            return;
        }
        s.playback = playback;
        drop(s);
        self.changed();
    }

    /// `Position` never emits change signals; clients poll it.
    pub fn set_position(&self, position_ms: u64) {
        let micros = position_ms.saturating_mul(1_000).min(i64::MAX as u64) as i64;
        lock(&self.state).position_micros = micros;
    }

    fn changed(&self) {
        let _ = self.notify.send(());
    }

    /// A handle with no D-Bus service behind it.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::Receiver<()>) {
        let (notify, rx) = mpsc::channel();
        (
            Self {
                state: Arc::new(Mutex::new(SharedState::default())),
                notify,
            },
            rx,
        )
    }

    #[cfg(test)]
    pub(crate) fn title(&self) -> Option<String> {
        lock(&self.state).title.clone()
    }

    #[cfg(test)]
    pub(crate) fn artist(&self) -> Vec<String> {
        lock(&self.state).artist.clone()
    }

    #[cfg(test)]
    pub(crate) fn playback(&self) -> PlaybackStatus {
        lock(&self.state).playback
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
    identity: String,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No window to raise in a terminal.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> String {
        self.identity.clone()
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::Seek(offset));
    }

    fn set_position(&self, track_id: OwnedObjectPath, position: i64) {
        // Requests for a track that is no longer current are ignored.
        let current = lock(&self.state).track_id.clone();
        if current.as_ref() == Some(&track_id) {
            let _ = self.tx.send(ControlCmd::SetPosition(position));
        }
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        lock(&self.state).playback.as_str()
    }

    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> i64 {
        lock(&self.state).position_micros
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let s = lock(&self.state);
        let mut map = HashMap::new();
        let mut put = |key: &str, value: Value<'_>| {
            if let Ok(v) = OwnedValue::try_from(value) {
                map.insert(key.to_string(), v);
            }
        };

        if let Some(id) = &s.track_id {
            put("mpris:trackid", Value::from(ObjectPath::clone(id)));
        }
        put("xesam:title", Value::from(s.title.clone().unwrap_or_default()));
        if !s.artist.is_empty() {
            put("xesam:artist", Value::from(s.artist.clone()));
        }
        if let Some(album) = &s.album {
            put("xesam:album", Value::from(album.clone()));
        }
        if let Some(url) = &s.url {
            put("xesam:url", Value::from(url.clone()));
        }
        if let Some(len) = s.length_micros {
            put("mpris:length", Value::from(len));
        }
        map
    }
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    identity: String,
) -> zbus::Result<(Connection, InterfaceRef<PlayerIface>)> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let object_server = connection.object_server();
    object_server
        .at(
            OBJECT_PATH,
            RootIface {
                tx: tx.clone(),
                identity,
            },
        )
        .await?;
    object_server
        .at(OBJECT_PATH, PlayerIface { tx, state })
        .await?;
    let player = object_server
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;
    Ok((connection, player))
}

async fn emit_changes(player: &InterfaceRef<PlayerIface>) -> zbus::Result<()> {
    let emitter = player.signal_emitter();
    let iface = player.get().await;
    iface.playback_status_changed(emitter).await?;
    iface.metadata_changed(emitter).await?;
    Ok(())
}

/// Start the MPRIS service on its own thread.
///
/// Returns once the bus name is owned, or with the reason it could not be.
/// Commands from the desktop arrive on `tx`.
pub fn spawn_mpris(tx: Sender<ControlCmd>, identity: &str) -> Result<MprisHandle, HostError> {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<()>();
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

    let state_for_thread = state.clone();
    let identity = identity.to_string();
    std::thread::Builder::new()
        .name("refrain-mpris".to_string())
        .spawn(move || {
            block_on(async move {
                let (_connection, player) = match serve(tx, state_for_thread, identity).await {
                    Ok(served) => {
                        let _ = ready_tx.send(Ok(()));
                        served
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                info!(name = BUS_NAME, "MPRIS service up");

                loop {
                    match notify_rx.try_recv() {
                        Ok(()) => {
                            // Coalesce bursts into one round of signals.
                            while notify_rx.try_recv().is_ok() {}
                            if let Err(e) = emit_changes(&player).await {
                                warn!(error = %e, "MPRIS: failed to emit property changes");
                            }
                        }
                        Err(TryRecvError::Empty) => {
                            Timer::after(Duration::from_millis(100)).await;
                        }
                        Err(TryRecvError::Disconnected) => break,
                    }
                }
                debug!("MPRIS service stopped");
            });
        })?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(MprisHandle {
            state,
            notify: notify_tx,
        }),
        Ok(Err(msg)) => Err(HostError::Bus(msg)),
        Err(_) => Err(HostError::Startup),
    }
}
