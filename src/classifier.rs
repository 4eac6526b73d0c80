//! Zone membership test.
//!
//! The "4-line confirmation" rule: a detection is inside a zone when its
//! right foot has crossed the near (front) boundary, its left foot has not
//! crossed the far (back) boundary, the right foot is inside the lateral
//! boundary, and a confirmation pair does not place the detection beyond the
//! quadrilateral outright. The confirmation guards the asymmetric per-zone
//! biases: a lenient back bias alone would admit people standing past the
//! zone entirely.
//!
//! Every numeric constant here is a calibration parameter. The biases are
//! curve-fit against real footage for one camera placement and the slow and
//! stop zones sit at different depths, so each zone carries its own pair.
//! Redeploying the camera means recalibrating, not editing code.

use serde::{Deserialize, Serialize};

use crate::geometry::line_side;
use crate::locator::FootPoints;
use crate::zone::Zone;
use crate::ZoneKind;

/// Per-zone calibration offsets applied to the front and back edge tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneBias {
    pub front: f64,
    pub back: f64,
}

/// Membership tester holding the calibration biases for both zone kinds.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZoneClassifier {
    slow: ZoneBias,
    stop: ZoneBias,
}

impl ZoneClassifier {
    pub fn new(slow: ZoneBias, stop: ZoneBias) -> Self {
        Self { slow, stop }
    }

    pub fn bias_for(&self, kind: ZoneKind) -> ZoneBias {
        match kind {
            ZoneKind::Slow => self.slow,
            ZoneKind::Stop => self.stop,
        }
    }

    /// Decide whether a detection's foot points place it inside the zone.
    ///
    /// A degenerate zone has no defined interior and classifies everything
    /// as outside; callers surface the operator warning.
    pub fn classify(&self, zone: &Zone, feet: FootPoints) -> bool {
        if zone.is_degenerate() {
            return false;
        }
        classify_with_bias(zone, feet, self.bias_for(zone.kind))
    }
}

/// The membership rule itself, with an explicit bias pair.
pub fn classify_with_bias(zone: &Zone, feet: FootPoints, bias: ZoneBias) -> bool {
    let (front_a, front_b) = zone.front_edge();
    let (back_a, back_b) = zone.back_edge();
    let (right_a, right_b) = zone.right_edge();

    // Right foot has crossed the near boundary.
    let past_front = line_side(front_a, front_b, feet.right) > bias.front;
    // Left foot has not crossed the far boundary.
    let before_back = line_side(back_a, back_b, feet.left) < bias.back;
    // Right foot is inside the lateral boundary, i.e. not past the
    // vanishing edge in image space.
    let inside_lateral = line_side(right_a, right_b, feet.right) > 0.0;

    // Confirmation pair: right foot beyond the back edge while the left
    // foot sits below the front edge means the detection is past the
    // quadrilateral even if the biased tests above admit it.
    let confirm_outside = line_side(back_a, back_b, feet.right) > 0.0
        && line_side(front_a, front_b, feet.left) > 0.0;

    past_front && before_back && inside_lateral && !confirm_outside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::locator::{foot_points, FootOffsets};
    use crate::Point;

    fn stop_square() -> Zone {
        Zone::new(
            ZoneKind::Stop,
            Point::new(100.0, 100.0),
            Point::new(300.0, 100.0),
            Point::new(100.0, 300.0),
            Point::new(300.0, 300.0),
        )
    }

    #[test]
    fn person_inside_square_is_inside() {
        let feet = foot_points(
            &BoundingBox::new(150.0, 150.0, 40.0, 100.0),
            FootOffsets::default(),
        );
        let classifier = ZoneClassifier::default();
        assert!(classifier.classify(&stop_square(), feet));
    }

    #[test]
    fn person_far_outside_square_is_outside() {
        let feet = foot_points(
            &BoundingBox::new(500.0, 500.0, 40.0, 40.0),
            FootOffsets::default(),
        );
        let classifier = ZoneClassifier::default();
        assert!(!classifier.classify(&stop_square(), feet));
    }

    #[test]
    fn person_above_front_edge_is_outside() {
        // Both feet land above the near boundary.
        let feet = foot_points(
            &BoundingBox::new(150.0, 0.0, 40.0, 60.0),
            FootOffsets::default(),
        );
        let classifier = ZoneClassifier::default();
        assert!(!classifier.classify(&stop_square(), feet));
    }

    #[test]
    fn confirmation_excludes_detection_beyond_back_edge() {
        // A lenient back bias would admit this detection on the biased
        // tests alone; the confirmation pair rejects it.
        let zone = stop_square();
        let feet = foot_points(
            &BoundingBox::new(150.0, 280.0, 40.0, 100.0),
            FootOffsets::default(),
        );
        let lenient = ZoneBias {
            front: 0.0,
            back: 20_000.0,
        };
        assert!(!classify_with_bias(&zone, feet, lenient));
    }

    #[test]
    fn degenerate_zone_classifies_everything_outside() {
        let zone = Zone::new(
            ZoneKind::Stop,
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(300.0, 0.0),
        );
        let feet = foot_points(
            &BoundingBox::new(150.0, 150.0, 40.0, 100.0),
            FootOffsets::default(),
        );
        assert!(!ZoneClassifier::default().classify(&zone, feet));
    }

    #[test]
    fn per_zone_biases_are_kept_apart() {
        let classifier = ZoneClassifier::new(
            ZoneBias {
                front: 1.0,
                back: 2.0,
            },
            ZoneBias {
                front: 3.0,
                back: 4.0,
            },
        );
        assert_eq!(classifier.bias_for(ZoneKind::Slow).front, 1.0);
        assert_eq!(classifier.bias_for(ZoneKind::Stop).back, 4.0);
    }
}
