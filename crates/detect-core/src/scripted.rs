use frame_ingest::Frame;

use crate::types::{DetectError, Detection, Detector};

/// Deterministic detector emitting a box that orbits the frame center.
///
/// Backs the `--synthetic` demo mode and lets the pipeline be exercised
/// end-to-end without a model artifact.
pub struct ScriptedDetector {
    tick: u64,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self { tick: 0 }
    }
}

impl Default for ScriptedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        let w = frame.width as f32;
        let h = frame.height as f32;
        let phase = (self.tick % 120) as f32 / 120.0 * std::f32::consts::TAU;
        self.tick = self.tick.wrapping_add(1);
        Ok(vec![Detection {
            class_id: 1,
            center: (
                w / 2.0 + phase.cos() * w / 4.0,
                h / 2.0 + phase.sin() * h / 4.0,
            ),
            width: w / 5.0,
            height: h / 5.0,
            confidence: 0.90,
        }])
    }
}

#[cfg(test)]
mod tests {
    use frame_ingest::{FrameSource, TestPatternSource};

    use super::*;

    #[test]
    fn scripted_detections_are_deterministic() {
        let mut source = TestPatternSource::new(64, 48);
        let frame = source.capture().expect("frame");
        let a = ScriptedDetector::new().detect(&frame).expect("detections");
        let b = ScriptedDetector::new().detect(&frame).expect("detections");
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert!(a[0].confidence >= 0.0 && a[0].confidence <= 1.0);
    }
}
