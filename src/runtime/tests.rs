use std::path::PathBuf;
use std::sync::mpsc::Sender;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::event_loop::{EventLoopState, handle_key_event};
use super::scan_notice;
use super::startup::{apply_playback_defaults, repeat_mode};
use crate::app::App;
use crate::config::{RepeatSetting, Settings};
use crate::coordinator::{PlaybackCoordinator, SessionPhase};
use crate::engine::fake::{Call, FakeFactory, FakeProbe};
use crate::engine::RepeatMode;
use crate::host::{ControlSurfaceLauncher, HostError, HostStatus, SessionHost};
use crate::library::{CatalogError, Track};
use crate::mpris::{ControlCmd, MprisHandle};

struct NoSurface;

impl ControlSurfaceLauncher for NoSurface {
    fn launch(&self, _tx: Sender<ControlCmd>, _identity: &str) -> Result<MprisHandle, HostError> {
        Err(HostError::Startup)
    }
}

fn t(id: u64, title: &str) -> Track {
    Track {
        id,
        title: Some(title.into()),
        artist: None,
        album: None,
        uri: format!("/music/{title}.mp3"),
        album_id: None,
        duration: None,
        display: title.into(),
    }
}

struct Harness {
    settings: Settings,
    app: App,
    coordinator: PlaybackCoordinator<FakeFactory>,
    host: SessionHost<NoSurface>,
    state: EventLoopState,
    probe: FakeProbe,
}

impl Harness {
    fn new() -> Self {
        let (factory, probe) = FakeFactory::new();
        let mut coordinator = PlaybackCoordinator::new(factory);
        let host = SessionHost::attach(&mut coordinator, NoSurface, "refrain");
        let mut app = App::new(vec![t(0, "A"), t(1, "B"), t(2, "C")]);
        app.attach(&coordinator);
        Self {
            settings: Settings::default(),
            app,
            coordinator,
            host,
            state: EventLoopState::default(),
            probe,
        }
    }

    fn key(&mut self, c: char) -> bool {
        self.code(KeyCode::Char(c))
    }

    fn code(&mut self, code: KeyCode) -> bool {
        let quit = handle_key_event(
            KeyEvent::new(code, KeyModifiers::NONE),
            &self.settings,
            &mut self.app,
            &mut self.coordinator,
            &mut self.host,
            &mut self.state,
        )
        .unwrap();
        self.coordinator.process_engine_events().unwrap();
        self.host.pump(&mut self.coordinator).unwrap();
        self.app.sync();
        quit
    }
}

#[test]
fn enter_plays_the_selected_track_with_the_whole_list_as_queue() {
    let mut h = Harness::new();
    h.key('j');
    assert!(!h.code(KeyCode::Enter));

    assert!(h.probe.calls().contains(&Call::SetMediaList {
        len: 3,
        start: 1,
        offset_ms: 0
    }));
    assert_eq!(h.app.now_playing.track.as_ref().map(|t| t.id), Some(1));
    assert!(h.app.now_playing.playing);
    assert_eq!(h.host.status(), HostStatus::Running);
}

#[test]
fn enter_on_the_playing_track_does_not_restart_it() {
    let mut h = Harness::new();
    h.code(KeyCode::Enter);
    h.probe.clear_calls();
    h.code(KeyCode::Enter);
    assert!(h.probe.calls().is_empty());
}

#[test]
fn q_removes_the_task() {
    let mut h = Harness::new();
    h.code(KeyCode::Enter);
    h.probe.clear_calls();

    assert!(h.key('q'));
    assert_eq!(h.probe.calls(), vec![Call::Pause, Call::Release]);
    assert_eq!(h.host.status(), HostStatus::Stopped);
    assert_eq!(h.coordinator.phase(), SessionPhase::Released);
}

#[test]
fn gg_and_g_jump_to_the_ends() {
    let mut h = Harness::new();
    h.key('G');
    assert_eq!(h.app.selected, 2);
    h.key('g');
    assert_eq!(h.app.selected, 2);
    h.key('g');
    assert_eq!(h.app.selected, 0);
}

#[test]
fn zz_jumps_to_the_playing_track() {
    let mut h = Harness::new();
    h.key('j');
    h.code(KeyCode::Enter);
    h.key('G');
    h.key('z');
    h.key('z');
    assert_eq!(h.app.selected, 1);
}

#[test]
fn transport_keys_drive_the_coordinator() {
    let mut h = Harness::new();
    h.code(KeyCode::Enter);
    h.probe.set_times(10_000, 60_000);
    h.probe.clear_calls();

    h.key(' ');
    h.key('p');
    h.key('l');
    h.key('h');
    h.key('L');
    h.key('H');
    assert_eq!(
        h.probe.calls(),
        vec![
            Call::Pause,
            Call::Play,
            Call::Next,
            Call::Prev,
            Call::SeekTo(15_000),
            Call::SeekTo(10_000),
        ]
    );
}

#[test]
fn s_and_r_toggle_engine_configuration() {
    let mut h = Harness::new();
    h.key('s');
    h.key('r');
    assert!(h.app.now_playing.shuffle);
    assert_eq!(h.app.now_playing.repeat, RepeatMode::One);

    h.key('s');
    h.key('r');
    assert!(!h.coordinator.shuffle().get());
    assert_eq!(h.coordinator.repeat().get(), RepeatMode::Off);
}

#[test]
fn playback_defaults_reach_the_engine_when_built() {
    let (factory, probe) = FakeFactory::new();
    let mut coordinator = PlaybackCoordinator::new(factory);
    let mut settings = Settings::default();
    settings.playback.shuffle = true;
    settings.playback.repeat = RepeatSetting::One;

    apply_playback_defaults(&mut coordinator, &settings);
    coordinator.ensure_engine().unwrap();
    assert!(probe.calls().contains(&Call::Shuffle(true)));
    assert!(probe.calls().contains(&Call::Repeat(RepeatMode::One)));
}

#[test]
fn repeat_setting_maps_onto_engine_mode() {
    assert_eq!(repeat_mode(RepeatSetting::Off), RepeatMode::Off);
    assert_eq!(repeat_mode(RepeatSetting::One), RepeatMode::One);
}

#[test]
fn permission_errors_ask_for_access() {
    let denied = CatalogError::PermissionDenied(PathBuf::from("/music"));
    assert!(scan_notice(&denied).contains("grant read access"));

    let missing = CatalogError::NotFound(PathBuf::from("/nope"));
    assert_eq!(scan_notice(&missing), missing.to_string());
}
