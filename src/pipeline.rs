//! Frame evaluation wiring.
//!
//! The evaluation itself is synchronous and single-threaded: one detection
//! result runs locator -> classifier -> aggregator to completion before the
//! next is accepted, which is what keeps the command-on-change invariant
//! sound against a single view of the current state. The detector runs on
//! its own cadence and hands results over through `LatestSlot`: a single
//! slot where a newer result overwrites an unconsumed older one, because
//! detection is a latest-wins workload, not a job queue.

use std::sync::Mutex;
use std::time::Instant;

use crate::aggregate::{HazardFlags, StateAggregator, ZoneVerdict};
use crate::classifier::ZoneClassifier;
use crate::detect::DetectionResult;
use crate::locator::{foot_points, FootOffsets};
use crate::zone::ZoneSet;
use crate::ZoneKind;

// -------------------- Frame Evaluator --------------------

/// Runs one frame's detections through the zone decision chain.
pub struct FrameEvaluator {
    zones: ZoneSet,
    offsets: FootOffsets,
    classifier: ZoneClassifier,
    aggregator: StateAggregator,
    degenerate_warned: [bool; 2],
}

impl FrameEvaluator {
    pub fn new(
        zones: ZoneSet,
        offsets: FootOffsets,
        classifier: ZoneClassifier,
        aggregator: StateAggregator,
    ) -> Self {
        Self {
            zones,
            offsets,
            classifier,
            aggregator,
            degenerate_warned: [false; 2],
        }
    }

    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    /// Evaluate one frame: every person detection against every active
    /// zone, collapsed into the frame's hazard flags.
    pub fn evaluate(&mut self, result: &DetectionResult) -> HazardFlags {
        let mut verdicts = Vec::new();
        for detection in result.persons() {
            let feet = foot_points(&detection.bounding_box, self.offsets);
            for (index, kind) in ZoneKind::ALL.into_iter().enumerate() {
                let Some(zone) = self.zones.get(kind) else {
                    continue;
                };
                if zone.is_degenerate() && !self.degenerate_warned[index] {
                    self.degenerate_warned[index] = true;
                    log::warn!(
                        "{} has collinear corners and will match nothing; recalibrate it",
                        kind
                    );
                }
                verdicts.push(ZoneVerdict {
                    zone: kind,
                    inside: self.classifier.classify(zone, feet),
                });
            }
        }
        self.aggregator.aggregate(&verdicts)
    }
}

// -------------------- Latest-Wins Slot --------------------

struct SlotState<T> {
    value: Option<T>,
    dropped: u64,
}

/// Single-slot handoff between the detector thread and the evaluation loop.
/// Publishing over an unconsumed value replaces it; the replaced value is
/// counted, not queued.
pub struct LatestSlot<T> {
    inner: Mutex<SlotState<T>>,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SlotState {
                value: None,
                dropped: 0,
            }),
        }
    }

    pub fn publish(&self, value: T) {
        let mut slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if slot.value.replace(value).is_some() {
            slot.dropped += 1;
        }
    }

    pub fn take(&self) -> Option<T> {
        let mut slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        slot.value.take()
    }

    /// Results overwritten before anyone consumed them.
    pub fn dropped(&self) -> u64 {
        let slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        slot.dropped
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------- Frame Rate Estimator --------------------

/// Windowed frame-rate estimate for diagnostics output.
pub struct FpsEstimator {
    window: u32,
    count: u32,
    window_start: Instant,
    fps: f64,
}

impl FpsEstimator {
    pub fn new(window: u32) -> Self {
        Self {
            window: window.max(1),
            count: 0,
            window_start: Instant::now(),
            fps: 0.0,
        }
    }

    /// Count one frame. Returns a fresh estimate when a window completes.
    pub fn tick(&mut self) -> Option<f64> {
        self.count += 1;
        if self.count < self.window {
            return None;
        }
        let elapsed = self.window_start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.fps = f64::from(self.count) / elapsed;
        }
        self.count = 0;
        self.window_start = Instant::now();
        Some(self.fps)
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}
