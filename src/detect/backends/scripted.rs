use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::DetectionResult;

/// Scripted backend for tests and bench runs. Replays a queued sequence of
/// detection results, then keeps returning empty frames.
pub struct ScriptedBackend {
    script: VecDeque<DetectionResult>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
        }
    }

    pub fn with_script(script: Vec<DetectionResult>) -> Self {
        Self {
            script: script.into(),
        }
    }

    pub fn push(&mut self, result: DetectionResult) {
        self.script.push_back(result);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<DetectionResult> {
        Ok(self.script.pop_front().unwrap_or_default())
    }
}
