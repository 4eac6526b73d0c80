//! Robot state machine and transition side effects.
//!
//! The controller is the single owner of the discrete robot state. Frame
//! verdicts and operator commands both funnel through it, one at a time, so
//! every transition is decided against one consistent view of the current
//! state.
//!
//! Transition contract:
//!
//! - A command goes out on the field-bus only when the target state differs
//!   from the current one. The bus is slow and lossy; redundant writes chat
//!   it up and can race.
//! - Entering `Stop` or `Slow` from any other state records exactly one
//!   zone event and starts the repeating alert for that state. The previous
//!   alert is cancelled and joined first, so alert loops never overlap.
//! - Entering `Disabled` cancels any alert and issues a stop.
//! - A failed command never rolls the state back: the state is the intent,
//!   and the `command_acknowledged` flag carries the discrepancy until the
//!   next command succeeds.

use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::HazardFlags;
use crate::alert::{speak_repeatedly, AlertHandle, Announcer};
use crate::event_log::EventLog;
use crate::robot::RobotInterface;
use crate::{now_s, RobotState, ZoneEvent, ZoneKind};

/// Repetition intervals for the hazard alerts. Stop repeats faster than
/// slow; `validate` in the config layer enforces that ordering.
#[derive(Clone, Copy, Debug)]
pub struct AlertIntervals {
    pub stop: Duration,
    pub slow: Duration,
}

impl Default for AlertIntervals {
    fn default() -> Self {
        Self {
            stop: Duration::from_secs(2),
            slow: Duration::from_secs(5),
        }
    }
}

fn alert_text(zone: ZoneKind) -> &'static str {
    match zone {
        ZoneKind::Stop => "Warning. Person in the stop zone. Robot halted.",
        ZoneKind::Slow => "Caution. Person in the slow zone. Robot speed reduced.",
    }
}

pub struct SafetyController {
    state: RobotState,
    robot: Box<dyn RobotInterface>,
    events: Box<dyn EventLog>,
    announcer: Arc<dyn Announcer>,
    alerts_enabled: bool,
    intervals: AlertIntervals,
    alert: Option<AlertHandle>,
    command_acknowledged: bool,
}

impl SafetyController {
    pub fn new(
        robot: Box<dyn RobotInterface>,
        events: Box<dyn EventLog>,
        announcer: Arc<dyn Announcer>,
        alerts_enabled: bool,
        intervals: AlertIntervals,
    ) -> Self {
        Self {
            state: RobotState::Disabled,
            robot,
            events,
            announcer,
            alerts_enabled,
            intervals,
            alert: None,
            command_acknowledged: true,
        }
    }

    pub fn state(&self) -> RobotState {
        self.state
    }

    /// False while the last issued command has not been confirmed by the
    /// transport. The state itself always reflects the intent.
    pub fn command_acknowledged(&self) -> bool {
        self.command_acknowledged
    }

    /// Operator command: leave `Disabled`. The robot starts at normal speed;
    /// the next frame verdict takes over from there.
    pub fn enable(&mut self) {
        if self.state == RobotState::Disabled {
            self.transition(RobotState::Normal);
        }
    }

    /// Operator command: force `Disabled` from any state. The robot is held
    /// stopped and frame verdicts are ignored until re-enabled.
    pub fn disable(&mut self) {
        if self.state != RobotState::Disabled {
            self.transition(RobotState::Disabled);
        }
    }

    /// Apply one frame's aggregated verdict. No-op while disabled.
    pub fn apply_frame(&mut self, flags: HazardFlags) {
        if self.state == RobotState::Disabled {
            return;
        }
        let target = if flags.stop_detected {
            RobotState::Stop
        } else if flags.slow_detected {
            RobotState::Slow
        } else {
            RobotState::Normal
        };
        if target != self.state {
            self.transition(target);
        }
    }

    fn transition(&mut self, target: RobotState) {
        // Cancel-and-join before anything else; no alert for the previous
        // state may still be running when a new one starts.
        if let Some(alert) = self.alert.take() {
            alert.cancel();
        }

        let command = match target {
            RobotState::Normal => self.robot.start(),
            RobotState::Slow => self.robot.slow(),
            RobotState::Stop | RobotState::Disabled => self.robot.stop(),
        };
        match command {
            Ok(()) => {
                self.command_acknowledged = true;
            }
            Err(err) => {
                // Intent stands; the discrepancy is observable via the flag.
                self.command_acknowledged = false;
                log::error!(
                    "robot command for state {} failed on {}: {}",
                    target,
                    self.robot.name(),
                    err
                );
            }
        }

        if let Some(zone) = target.hazard_zone() {
            self.record_entry(zone);
            if self.alerts_enabled {
                let interval = match zone {
                    ZoneKind::Stop => self.intervals.stop,
                    ZoneKind::Slow => self.intervals.slow,
                };
                self.alert = Some(speak_repeatedly(
                    self.announcer.clone(),
                    alert_text(zone).to_string(),
                    interval,
                ));
            }
        }

        log::info!("robot state {} -> {}", self.state, target);
        self.state = target;
    }

    /// Record the hazard-entry event; retried once, then dropped. Log
    /// failures never reach the control path.
    fn record_entry(&mut self, zone: ZoneKind) {
        let epoch_s = match now_s() {
            Ok(s) => s,
            Err(err) => {
                log::warn!("system clock unavailable for zone event: {}", err);
                0
            }
        };
        let event = ZoneEvent { zone, epoch_s };
        if let Err(first) = self.events.record_event(&event) {
            log::warn!("zone event write failed ({}), retrying once", first);
            if let Err(second) = self.events.record_event(&event) {
                log::warn!("zone event dropped after retry: {}", second);
            }
        }
    }
}

impl Drop for SafetyController {
    fn drop(&mut self) {
        if let Some(alert) = self.alert.take() {
            alert.cancel();
        }
    }
}
