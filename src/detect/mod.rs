mod backend;
mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::ScriptedBackend;
pub use result::{BoundingBox, Detection, DetectionResult, PERSON_CATEGORY};
