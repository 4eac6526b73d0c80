//! Perimeter Kernel
//!
//! This crate implements the decision core of a human-safety perimeter for an
//! industrial robot cell. An external object detector reports per-frame person
//! bounding boxes; the kernel decides whether anyone is standing in an
//! operator-drawn "slow" or "stop" region and drives the robot accordingly.
//!
//! # Architecture
//!
//! Per-frame data flow:
//!
//! detector result -> foot points -> zone classification -> hazard flags ->
//! robot state transition -> {field-bus command, zone event, audible alert}
//!
//! The kernel guarantees:
//!
//! 1. **Stop precedence**: a person satisfying both zones counts as stop only.
//! 2. **Command idempotence**: the robot interface is written only on a state
//!    change, never once per frame.
//! 3. **Event on entry**: exactly one zone event per entry into a hazardous
//!    state, not one per frame spent in it.
//! 4. **Single mutation point**: frame verdicts and operator commands
//!    serialize through one owner of the robot state.
//! 5. **No overlapping alerts**: a hazard alert loop is cancelled and joined
//!    before any alert for a different state can start.
//!
//! # Module Structure
//!
//! - `geometry`: signed line-side primitive
//! - `zone`: quadrilateral zone model and zone collections
//! - `detect`: detector-facing types and backend contract
//! - `locator`: bounding box to foot-point reduction
//! - `classifier`: zone membership test
//! - `aggregate`: per-frame hazard flag aggregation
//! - `controller`: robot state machine and transition side effects
//! - `robot`, `alert`, `event_log`, `zone_store`: collaborator contracts
//! - `pipeline`: frame evaluation wiring and the latest-wins detection slot

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod aggregate;
pub mod alert;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod detect;
pub mod event_log;
pub mod geometry;
pub mod locator;
pub mod pipeline;
pub mod robot;
pub mod zone;
pub mod zone_store;

pub use aggregate::{HazardFlags, SilencePolicy, StateAggregator, ZoneVerdict};
pub use alert::{AlertHandle, Announcer, LogAnnouncer};
pub use classifier::{ZoneBias, ZoneClassifier};
pub use controller::{AlertIntervals, SafetyController};
pub use detect::{BoundingBox, Detection, DetectionResult, DetectorBackend, ScriptedBackend};
pub use event_log::{EventLog, InMemoryEventLog, SqliteEventLog};
pub use geometry::line_side;
pub use locator::{foot_points, FootOffsets, FootPoints};
pub use pipeline::{FpsEstimator, FrameEvaluator, LatestSlot};
pub use robot::{RetryingRobot, RobotInterface, SimulatedRobot};
pub use zone::{Zone, ZoneSet};
pub use zone_store::{InMemoryZoneStore, SqliteZoneStore, ZoneStore};

// -------------------- Core Types --------------------

/// A 2D coordinate in image pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Recognized zone types. At most one zone of each kind is active per session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Slow,
    Stop,
}

impl ZoneKind {
    pub const ALL: [ZoneKind; 2] = [ZoneKind::Stop, ZoneKind::Slow];

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Slow => "slow_zone",
            ZoneKind::Stop => "stop_zone",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "slow_zone" => Some(ZoneKind::Slow),
            "stop_zone" => Some(ZoneKind::Stop),
            _ => None,
        }
    }
}

impl std::fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete robot operating state, owned by the `SafetyController`.
///
/// `Disabled` is entered and left only by operator command; the per-frame
/// verdict is ignored while disabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RobotState {
    #[default]
    Disabled,
    Normal,
    Slow,
    Stop,
}

impl RobotState {
    /// The zone kind whose entry this state represents, if hazardous.
    pub fn hazard_zone(&self) -> Option<ZoneKind> {
        match self {
            RobotState::Stop => Some(ZoneKind::Stop),
            RobotState::Slow => Some(ZoneKind::Slow),
            RobotState::Normal | RobotState::Disabled => None,
        }
    }

    pub fn is_hazardous(&self) -> bool {
        self.hazard_zone().is_some()
    }
}

impl std::fmt::Display for RobotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RobotState::Disabled => "disabled",
            RobotState::Normal => "normal",
            RobotState::Slow => "slow",
            RobotState::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Audit record emitted once per entry into a hazardous state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEvent {
    pub zone: ZoneKind,
    /// Entry time in seconds since the Unix epoch.
    pub epoch_s: u64,
}

pub fn now_s() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}
