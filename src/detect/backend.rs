use anyhow::Result;

use crate::detect::result::DetectionResult;

/// Detector backend trait.
///
/// The detection model itself lives outside the kernel; this trait is the
/// seam it plugs into. Implementations must treat the pixel slice as
/// read-only and ephemeral, and must apply their own confidence threshold
/// before returning detections.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult>;
}
