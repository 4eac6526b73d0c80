//! Per-frame hazard aggregation.
//!
//! Collapses the per-person, per-zone verdicts of one frame into a single
//! pair of hazard flags, with stop taking precedence over slow. Frames with
//! no person detections are governed by the silence policy: the production
//! default treats an empty floor as all clear, the alternative escalates to
//! stop after a run of silent frames for deployments that prefer caution
//! over availability when the detector goes quiet.

use serde::{Deserialize, Serialize};

use crate::ZoneKind;

/// One membership verdict for a (detection, zone) pair. Ephemeral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneVerdict {
    pub zone: ZoneKind,
    pub inside: bool,
}

/// Raw hazard flags for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HazardFlags {
    pub stop_detected: bool,
    pub slow_detected: bool,
}

/// What to do with a frame that contains no person detections at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilencePolicy {
    /// An empty frame clears both flags immediately.
    #[default]
    ClearImmediately,
    /// An empty frame clears the flags, but once this many consecutive
    /// frames stay empty the stop flag is forced on until a detection
    /// arrives.
    EscalateAfterFrames(u32),
}

/// Aggregates verdicts frame by frame. Stateful only for the silence
/// counter; everything else is recomputed per frame.
#[derive(Clone, Debug)]
pub struct StateAggregator {
    policy: SilencePolicy,
    silent_frames: u32,
}

impl StateAggregator {
    pub fn new(policy: SilencePolicy) -> Self {
        Self {
            policy,
            silent_frames: 0,
        }
    }

    pub fn policy(&self) -> SilencePolicy {
        self.policy
    }

    /// Collapse one frame's verdicts. An empty slice means no person was
    /// detected in the frame.
    pub fn aggregate(&mut self, verdicts: &[ZoneVerdict]) -> HazardFlags {
        if verdicts.is_empty() {
            self.silent_frames = self.silent_frames.saturating_add(1);
            return match self.policy {
                SilencePolicy::ClearImmediately => HazardFlags::default(),
                SilencePolicy::EscalateAfterFrames(limit) => HazardFlags {
                    stop_detected: self.silent_frames >= limit,
                    slow_detected: false,
                },
            };
        }
        self.silent_frames = 0;

        let stop_detected = verdicts
            .iter()
            .any(|v| v.zone == ZoneKind::Stop && v.inside);
        let slow_detected = !stop_detected
            && verdicts
                .iter()
                .any(|v| v.zone == ZoneKind::Slow && v.inside);
        HazardFlags {
            stop_detected,
            slow_detected,
        }
    }
}

impl Default for StateAggregator {
    fn default() -> Self {
        Self::new(SilencePolicy::default())
    }
}
