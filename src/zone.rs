//! Operator-drawn quadrilateral zones.
//!
//! A zone is four ordered corners. The corners come from a calibration UI
//! and need not form a convex or even simple quadrilateral, but the corner
//! order is fixed so every derived edge has a stable direction and the
//! membership test's sign conventions stay meaningful.

use serde::{Deserialize, Serialize};

use crate::geometry::line_side;
use crate::{Point, ZoneKind};

/// A quadrilateral region with a fixed corner winding.
///
/// Derived edges, all directed:
/// - front: `top_left -> top_right`
/// - left: `top_left -> bottom_left`
/// - right: `top_right -> bottom_right`
/// - back: `bottom_left -> bottom_right`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Zone {
    pub fn new(
        kind: ZoneKind,
        top_left: Point,
        top_right: Point,
        bottom_left: Point,
        bottom_right: Point,
    ) -> Self {
        Self {
            kind,
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    pub fn front_edge(&self) -> (Point, Point) {
        (self.top_left, self.top_right)
    }

    pub fn left_edge(&self) -> (Point, Point) {
        (self.top_left, self.bottom_left)
    }

    pub fn right_edge(&self) -> (Point, Point) {
        (self.top_right, self.bottom_right)
    }

    pub fn back_edge(&self) -> (Point, Point) {
        (self.bottom_left, self.bottom_right)
    }

    /// True when all four corners are collinear (or coincide), in which case
    /// inside/outside is undefined and the membership test treats the zone
    /// as absent.
    pub fn is_degenerate(&self) -> bool {
        let (a, b) = self.front_edge();
        if a == b {
            // Front edge has no direction; degenerate unless the remaining
            // corners give one, which still leaves no enclosed area.
            return true;
        }
        line_side(a, b, self.bottom_left) == 0.0 && line_side(a, b, self.bottom_right) == 0.0
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }
}

/// The active zones for a session, keyed by kind.
///
/// At most one zone of each kind is honored; when duplicates are inserted
/// the first one wins and the rest are ignored by lookups.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ZoneSet {
    zones: Vec<Zone>,
}

impl ZoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_zones(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    pub fn insert(&mut self, zone: Zone) {
        self.zones.push(zone);
    }

    /// First zone of the given kind, if any.
    pub fn get(&self, kind: ZoneKind) -> Option<&Zone> {
        self.zones.iter().find(|z| z.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(kind: ZoneKind) -> Zone {
        Zone::new(
            kind,
            Point::new(100.0, 100.0),
            Point::new(300.0, 100.0),
            Point::new(100.0, 300.0),
            Point::new(300.0, 300.0),
        )
    }

    #[test]
    fn edges_follow_corner_winding() {
        let z = square(ZoneKind::Stop);
        assert_eq!(z.front_edge(), (z.top_left, z.top_right));
        assert_eq!(z.back_edge(), (z.bottom_left, z.bottom_right));
        assert_eq!(z.left_edge(), (z.top_left, z.bottom_left));
        assert_eq!(z.right_edge(), (z.top_right, z.bottom_right));
    }

    #[test]
    fn collinear_corners_are_degenerate() {
        let z = Zone::new(
            ZoneKind::Slow,
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(300.0, 0.0),
        );
        assert!(z.is_degenerate());
    }

    #[test]
    fn coincident_corners_are_degenerate() {
        let p = Point::new(50.0, 50.0);
        let z = Zone::new(ZoneKind::Stop, p, p, p, p);
        assert!(z.is_degenerate());
    }

    #[test]
    fn proper_quadrilateral_is_not_degenerate() {
        assert!(!square(ZoneKind::Stop).is_degenerate());
    }

    #[test]
    fn duplicate_kinds_resolve_to_first_inserted() {
        let mut set = ZoneSet::new();
        let first = square(ZoneKind::Stop);
        let mut second = square(ZoneKind::Stop);
        second.top_left = Point::new(999.0, 999.0);
        set.insert(first);
        set.insert(second);
        assert_eq!(set.get(ZoneKind::Stop), Some(&first));
        assert!(set.get(ZoneKind::Slow).is_none());
    }
}
