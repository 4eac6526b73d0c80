use serde::{Deserialize, Serialize};

/// Category label the kernel reacts to. Every other label is ignored.
pub const PERSON_CATEGORY: &str = "person";

/// Result of running detection on a frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn persons(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter().filter(|d| d.is_person())
    }
}

/// One detector hit: class label, confidence, axis-aligned box.
///
/// Confidence thresholding happens upstream in the detector; the kernel
/// treats every delivered detection as significant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    pub category_name: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

impl Detection {
    pub fn person(confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            category_name: PERSON_CATEGORY.to_string(),
            confidence,
            bounding_box,
        }
    }

    pub fn is_person(&self) -> bool {
        self.category_name.eq_ignore_ascii_case(PERSON_CATEGORY)
    }
}

/// Axis-aligned bounding box with its origin at the top-left corner,
/// in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }
}
