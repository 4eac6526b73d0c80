//! Bounding box to foot-point reduction.
//!
//! Zone membership is decided from where a person's feet meet the floor, not
//! from the raw box corners. Using the full box drags arm and hand overhang
//! into the test; the feet sit inset from the box edges by camera-dependent
//! amounts. The production offsets are asymmetric because the camera looks
//! across the floor from one side of the robot, which is why they are
//! configuration rather than constants: a different camera placement needs a
//! fresh calibration.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::detect::BoundingBox;
use crate::Point;

/// Fractional positions of the two foot reference points within a bounding
/// box, measured from the box origin as a share of width/height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FootOffsets {
    pub left_x: f64,
    pub left_y: f64,
    pub right_x: f64,
    pub right_y: f64,
}

impl Default for FootOffsets {
    fn default() -> Self {
        // Calibrated against a camera mounted to one side of the cell:
        // the right foot is the literal bottom-right corner, the left foot
        // sits a sixth of the box in from the left and up from the bottom.
        Self {
            left_x: 1.0 / 6.0,
            left_y: 5.0 / 6.0,
            right_x: 1.0,
            right_y: 1.0,
        }
    }
}

impl FootOffsets {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("left_x", self.left_x),
            ("left_y", self.left_y),
            ("right_x", self.right_x),
            ("right_y", self.right_y),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!(
                    "foot offset {} must be within 0.0..=1.0, got {}",
                    name,
                    value
                ));
            }
        }
        Ok(())
    }
}

/// Ground-contact reference points derived from one detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FootPoints {
    pub left: Point,
    pub right: Point,
}

/// Project a detection's bounding box onto its two foot reference points.
pub fn foot_points(bbox: &BoundingBox, offsets: FootOffsets) -> FootPoints {
    FootPoints {
        left: Point::new(
            bbox.origin_x + bbox.width * offsets.left_x,
            bbox.origin_y + bbox.height * offsets.left_y,
        ),
        right: Point::new(
            bbox.origin_x + bbox.width * offsets.right_x,
            bbox.origin_y + bbox.height * offsets.right_y,
        ),
    }
}
