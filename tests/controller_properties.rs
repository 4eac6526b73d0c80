//! Controller transition properties, driven through the public API with
//! counting collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use perimeter_kernel::{
    AlertIntervals, Announcer, EventLog, HazardFlags, RobotInterface, RobotState,
    SafetyController, ZoneEvent, ZoneKind,
};

#[derive(Clone, Default)]
struct CommandCounter {
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl CommandCounter {
    fn count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == command)
            .count()
    }

    fn total(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

struct CountingRobot {
    counter: CommandCounter,
    fail_all: bool,
}

impl CountingRobot {
    fn new(counter: CommandCounter) -> Self {
        Self {
            counter,
            fail_all: false,
        }
    }

    fn failing(counter: CommandCounter) -> Self {
        Self {
            counter,
            fail_all: true,
        }
    }

    fn record(&mut self, command: &'static str) -> Result<()> {
        self.counter.calls.lock().unwrap().push(command);
        if self.fail_all {
            return Err(anyhow!("field bus unreachable"));
        }
        Ok(())
    }
}

impl RobotInterface for CountingRobot {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn start(&mut self) -> Result<()> {
        self.record("start")
    }

    fn slow(&mut self) -> Result<()> {
        self.record("slow")
    }

    fn stop(&mut self) -> Result<()> {
        self.record("stop")
    }

    fn fast(&mut self) -> Result<()> {
        self.record("fast")
    }

    fn servo_off(&mut self) -> Result<()> {
        self.record("servo_off")
    }
}

#[derive(Clone, Default)]
struct EventSink {
    events: Arc<Mutex<Vec<ZoneEvent>>>,
    failures_left: Arc<Mutex<u32>>,
}

impl EventSink {
    fn events(&self) -> Vec<ZoneEvent> {
        self.events.lock().unwrap().clone()
    }

    fn fail_next(&self, count: u32) {
        *self.failures_left.lock().unwrap() = count;
    }
}

struct RecordingLog {
    sink: EventSink,
}

impl EventLog for RecordingLog {
    fn record_event(&mut self, event: &ZoneEvent) -> Result<()> {
        let mut failures = self.sink.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(anyhow!("log store unavailable"));
        }
        drop(failures);
        self.sink.events.lock().unwrap().push(*event);
        Ok(())
    }
}

#[derive(Default)]
struct CountingAnnouncer {
    utterances: AtomicUsize,
}

impl Announcer for CountingAnnouncer {
    fn speak(&self, _text: &str) {
        self.utterances.fetch_add(1, Ordering::SeqCst);
    }
}

struct Rig {
    controller: SafetyController,
    commands: CommandCounter,
    events: EventSink,
    announcer: Arc<CountingAnnouncer>,
}

fn rig(alerts_enabled: bool) -> Rig {
    let commands = CommandCounter::default();
    let events = EventSink::default();
    let announcer = Arc::new(CountingAnnouncer::default());
    let controller = SafetyController::new(
        Box::new(CountingRobot::new(commands.clone())),
        Box::new(RecordingLog {
            sink: events.clone(),
        }),
        announcer.clone(),
        alerts_enabled,
        // Long intervals so each alert speaks exactly once in a test run.
        AlertIntervals {
            stop: Duration::from_secs(60),
            slow: Duration::from_secs(120),
        },
    );
    Rig {
        controller,
        commands,
        events,
        announcer,
    }
}

fn stop_frame() -> HazardFlags {
    HazardFlags {
        stop_detected: true,
        slow_detected: false,
    }
}

fn slow_frame() -> HazardFlags {
    HazardFlags {
        stop_detected: false,
        slow_detected: true,
    }
}

fn clear_frame() -> HazardFlags {
    HazardFlags::default()
}

fn wait_for_utterances(announcer: &CountingAnnouncer, at_least: usize) {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while announcer.utterances.load(Ordering::SeqCst) < at_least {
        assert!(
            std::time::Instant::now() < deadline,
            "expected {} utterance(s)",
            at_least
        );
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn commands_are_issued_only_on_state_change() {
    let mut rig = rig(false);
    rig.controller.enable();
    for _ in 0..50 {
        rig.controller.apply_frame(stop_frame());
    }
    assert_eq!(rig.commands.count("stop"), 1);
    assert_eq!(rig.commands.count("start"), 1);
    assert_eq!(rig.commands.total(), 2);

    for _ in 0..50 {
        rig.controller.apply_frame(clear_frame());
    }
    assert_eq!(rig.commands.count("start"), 2);
    assert_eq!(rig.commands.total(), 3);
}

#[test]
fn stop_wins_when_both_flags_are_raised() {
    let mut rig = rig(false);
    rig.controller.enable();
    rig.controller.apply_frame(HazardFlags {
        stop_detected: true,
        slow_detected: true,
    });
    assert_eq!(rig.controller.state(), RobotState::Stop);
    assert_eq!(rig.commands.count("slow"), 0);
}

#[test]
fn one_event_per_hazard_entry() {
    let mut rig = rig(false);
    rig.controller.enable();

    // normal -> stop -> stop -> normal -> stop records two stop events.
    rig.controller.apply_frame(stop_frame());
    rig.controller.apply_frame(stop_frame());
    rig.controller.apply_frame(clear_frame());
    rig.controller.apply_frame(stop_frame());

    let events = rig.events.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.zone == ZoneKind::Stop));
}

#[test]
fn slow_to_stop_records_the_stop_entry() {
    let mut rig = rig(false);
    rig.controller.enable();
    rig.controller.apply_frame(slow_frame());
    rig.controller.apply_frame(stop_frame());
    let events = rig.events.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].zone, ZoneKind::Slow);
    assert_eq!(events[1].zone, ZoneKind::Stop);
}

#[test]
fn hazard_entry_sequence_with_alerts() {
    let mut rig = rig(true);

    rig.controller.enable();
    assert_eq!(rig.controller.state(), RobotState::Normal);
    assert_eq!(rig.commands.count("start"), 1);

    // Frame 1: person in the stop zone.
    rig.controller.apply_frame(stop_frame());
    assert_eq!(rig.controller.state(), RobotState::Stop);
    assert_eq!(rig.commands.count("stop"), 1);
    assert_eq!(rig.events.events().len(), 1);
    wait_for_utterances(&rig.announcer, 1);

    // Frame 2: still there. No new command, event or alert restart.
    rig.controller.apply_frame(stop_frame());
    assert_eq!(rig.commands.count("stop"), 1);
    assert_eq!(rig.events.events().len(), 1);
    assert_eq!(rig.announcer.utterances.load(Ordering::SeqCst), 1);

    // Frame 3: floor is clear. Back to normal, alert cancelled.
    rig.controller.apply_frame(clear_frame());
    assert_eq!(rig.controller.state(), RobotState::Normal);
    assert_eq!(rig.commands.count("start"), 2);
    let settled = rig.announcer.utterances.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(rig.announcer.utterances.load(Ordering::SeqCst), settled);
}

#[test]
fn disable_cancels_alert_and_stops_robot() {
    let mut rig = rig(true);
    rig.controller.enable();
    rig.controller.apply_frame(slow_frame());
    wait_for_utterances(&rig.announcer, 1);

    rig.controller.disable();
    assert_eq!(rig.controller.state(), RobotState::Disabled);
    assert_eq!(rig.commands.count("stop"), 1);

    let settled = rig.announcer.utterances.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(rig.announcer.utterances.load(Ordering::SeqCst), settled);

    // Frames are ignored while disabled.
    rig.controller.apply_frame(stop_frame());
    assert_eq!(rig.controller.state(), RobotState::Disabled);
    assert_eq!(rig.events.events().len(), 1);
}

#[test]
fn failed_command_keeps_intended_state_and_flags_it() {
    let commands = CommandCounter::default();
    let events = EventSink::default();
    let mut controller = SafetyController::new(
        Box::new(CountingRobot::failing(commands.clone())),
        Box::new(RecordingLog {
            sink: events.clone(),
        }),
        Arc::new(CountingAnnouncer::default()),
        false,
        AlertIntervals::default(),
    );

    controller.enable();
    assert_eq!(controller.state(), RobotState::Normal);
    assert!(!controller.command_acknowledged());

    controller.apply_frame(stop_frame());
    assert_eq!(controller.state(), RobotState::Stop);
    assert!(!controller.command_acknowledged());
    // The audit trail is intact even though the bus is down.
    assert_eq!(events.events().len(), 1);
}

#[test]
fn event_write_is_retried_once_then_dropped() {
    let mut rig = rig(false);
    rig.controller.enable();

    // One failure: the retry lands the event.
    rig.events.fail_next(1);
    rig.controller.apply_frame(stop_frame());
    assert_eq!(rig.events.events().len(), 1);

    // Two failures: the event is dropped, the transition still happens.
    rig.controller.apply_frame(clear_frame());
    rig.events.fail_next(2);
    rig.controller.apply_frame(stop_frame());
    assert_eq!(rig.controller.state(), RobotState::Stop);
    assert_eq!(rig.events.events().len(), 1);
}
