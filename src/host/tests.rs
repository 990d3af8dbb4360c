use super::*;
use crate::engine::fake::{Call, FakeFactory, FakeProbe};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone, Default)]
struct FakeLauncher {
    fail: bool,
    launches: Rc<Cell<usize>>,
    tx: Rc<RefCell<Option<Sender<ControlCmd>>>>,
}

impl FakeLauncher {
    fn send(&self, cmd: ControlCmd) {
        if let Some(tx) = self.tx.borrow().as_ref() {
            tx.send(cmd).unwrap();
        }
    }
}

impl ControlSurfaceLauncher for FakeLauncher {
    fn launch(&self, tx: Sender<ControlCmd>, _identity: &str) -> Result<MprisHandle, HostError> {
        self.launches.set(self.launches.get() + 1);
        if self.fail {
            return Err(HostError::Bus("no session bus".to_string()));
        }
        *self.tx.borrow_mut() = Some(tx);
        Ok(MprisHandle::detached().0)
    }
}

fn track(id: u64, title: &str) -> Track {
    Track {
        id,
        title: Some(title.to_string()),
        artist: Some(format!("{title} Artist")),
        album: None,
        uri: format!("/music/{title}.mp3"),
        album_id: None,
        duration: None,
        display: title.to_string(),
    }
}

fn tracks() -> Vec<Track> {
    vec![track(0, "A"), track(1, "B"), track(2, "C")]
}

type Setup = (
    PlaybackCoordinator<FakeFactory>,
    FakeProbe,
    SessionHost<FakeLauncher>,
    FakeLauncher,
);

fn setup(fail: bool) -> Setup {
    let (factory, probe) = FakeFactory::new();
    let mut coordinator = PlaybackCoordinator::new(factory);
    let launcher = FakeLauncher {
        fail,
        ..FakeLauncher::default()
    };
    let host = SessionHost::attach(&mut coordinator, launcher.clone(), "refrain");
    (coordinator, probe, host, launcher)
}

fn step(c: &mut PlaybackCoordinator<FakeFactory>, host: &mut SessionHost<FakeLauncher>) -> HostStatus {
    c.process_engine_events().unwrap();
    let status = host.pump(c).unwrap();
    c.process_engine_events().unwrap();
    status
}

#[test]
fn host_stays_idle_until_a_queue_starts() {
    let (mut c, probe, mut host, launcher) = setup(false);
    assert_eq!(step(&mut c, &mut host), HostStatus::Idle);
    assert_eq!(launcher.launches.get(), 0);
    assert_eq!(probe.builds(), 0);
}

#[test]
fn activation_shares_the_coordinator_engine_and_mirrors_the_track() {
    let (mut c, probe, mut host, launcher) = setup(false);
    c.set_queue_and_play(tracks(), 1).unwrap();

    assert_eq!(step(&mut c, &mut host), HostStatus::Running);
    assert_eq!(probe.builds(), 1);
    assert_eq!(launcher.launches.get(), 1);

    step(&mut c, &mut host);
    let surface = host.surface().unwrap();
    assert_eq!(surface.title().as_deref(), Some("B"));
    assert_eq!(surface.artist(), vec!["B Artist".to_string()]);
    assert_eq!(surface.playback(), PlaybackStatus::Playing);

    // A second queue does not start a second surface.
    c.set_queue_and_play(tracks(), 2).unwrap();
    step(&mut c, &mut host);
    assert_eq!(launcher.launches.get(), 1);
    assert_eq!(host.surface().unwrap().title().as_deref(), Some("C"));
}

#[test]
fn launch_failure_is_ignored_and_playback_continues() {
    let (mut c, _probe, mut host, launcher) = setup(true);
    c.set_queue_and_play(tracks(), 0).unwrap();

    assert_eq!(step(&mut c, &mut host), HostStatus::Running);
    assert!(host.surface().is_none());
    assert!(c.is_playing().get());

    c.set_queue_and_play(tracks(), 1).unwrap();
    step(&mut c, &mut host);
    assert_eq!(launcher.launches.get(), 1);
}

#[test]
fn transport_commands_map_onto_the_coordinator() {
    let (mut c, probe, mut host, launcher) = setup(false);
    c.set_queue_and_play(tracks(), 0).unwrap();
    step(&mut c, &mut host);
    probe.clear_calls();

    launcher.send(ControlCmd::Pause);
    launcher.send(ControlCmd::Play);
    launcher.send(ControlCmd::Next);
    launcher.send(ControlCmd::Prev);
    step(&mut c, &mut host);

    assert_eq!(
        probe.calls(),
        vec![Call::Pause, Call::Play, Call::Next, Call::Prev]
    );
    assert_eq!(c.current_index().get(), 0);
}

#[test]
fn stop_pauses_and_rewinds() {
    let (mut c, probe, mut host, launcher) = setup(false);
    c.set_queue_and_play(tracks(), 0).unwrap();
    step(&mut c, &mut host);
    probe.clear_calls();

    launcher.send(ControlCmd::Stop);
    step(&mut c, &mut host);
    assert_eq!(probe.calls(), vec![Call::Pause, Call::SeekTo(0)]);
}

#[test]
fn seek_is_relative_and_clamped_at_zero() {
    let (mut c, probe, mut host, launcher) = setup(false);
    c.set_queue_and_play(tracks(), 0).unwrap();
    step(&mut c, &mut host);
    probe.set_times(10_000, 60_000);
    probe.clear_calls();

    launcher.send(ControlCmd::Seek(5_000_000));
    step(&mut c, &mut host);
    assert_eq!(probe.calls(), vec![Call::SeekTo(15_000)]);

    probe.set_times(2_000, 60_000);
    probe.clear_calls();
    launcher.send(ControlCmd::Seek(-5_000_000));
    step(&mut c, &mut host);
    assert_eq!(probe.calls(), vec![Call::SeekTo(0)]);

    probe.set_times(58_000, 60_000);
    probe.clear_calls();
    launcher.send(ControlCmd::Seek(5_000_000));
    step(&mut c, &mut host);
    assert_eq!(probe.calls(), vec![Call::Next]);
}

#[test]
fn set_position_ignores_targets_past_the_end() {
    let (mut c, probe, mut host, launcher) = setup(false);
    c.set_queue_and_play(tracks(), 0).unwrap();
    step(&mut c, &mut host);
    probe.set_times(0, 60_000);
    probe.clear_calls();

    launcher.send(ControlCmd::SetPosition(30_000_000));
    launcher.send(ControlCmd::SetPosition(90_000_000));
    launcher.send(ControlCmd::SetPosition(-1));
    step(&mut c, &mut host);
    assert_eq!(probe.calls(), vec![Call::SeekTo(30_000)]);
}

#[test]
fn quit_removes_the_task_in_pause_then_release_order() {
    let (mut c, probe, mut host, launcher) = setup(false);
    c.set_queue_and_play(tracks(), 0).unwrap();
    step(&mut c, &mut host);
    probe.clear_calls();

    launcher.send(ControlCmd::Quit);
    assert_eq!(step(&mut c, &mut host), HostStatus::Stopped);

    assert_eq!(probe.calls(), vec![Call::Pause, Call::Release]);
    assert!(!c.has_engine());
    assert_eq!(c.phase(), SessionPhase::Released);
    assert!(host.surface().is_none());
    assert_eq!(probe.builds(), 1);
}

#[test]
fn task_removal_without_engine_just_stops() {
    let (mut c, probe, mut host, _launcher) = setup(false);
    host.on_task_removed(&mut c);
    assert_eq!(host.status(), HostStatus::Stopped);
    assert_eq!(probe.builds(), 0);
    assert!(probe.calls().is_empty());
    assert_eq!(host.pump(&mut c).unwrap(), HostStatus::Stopped);
}

#[test]
fn engine_build_failure_on_activation_propagates() {
    let (mut c, probe, mut host, _launcher) = setup(false);
    c.set_queue_and_play(tracks(), 0).unwrap();
    c.release();
    probe.fail_next_build();

    assert!(matches!(
        host.pump(&mut c),
        Err(CoordinatorError::Engine(_))
    ));
    assert!(!c.has_engine());
}
