use chrono::Utc;

use crate::types::{CaptureError, Frame, FrameFormat, FrameSource};

/// Synthetic capture source producing a scrolling gradient.
///
/// Used when no camera or model artifacts are available and by tests that
/// need deterministic pixel data.
pub struct TestPatternSource {
    width: i32,
    height: i32,
    tick: u64,
}

impl TestPatternSource {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }
}

impl FrameSource for TestPatternSource {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let w = self.width as usize;
        let h = self.height as usize;
        let shift = (self.tick % 256) as u8;
        let mut data = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                data.push(((x & 0xff) as u8).wrapping_add(shift));
                data.push(((y & 0xff) as u8).wrapping_add(shift));
                data.push(shift);
            }
        }
        self.tick = self.tick.wrapping_add(1);
        Ok(Frame {
            data,
            width: self.width,
            height: self.height,
            timestamp_ms: Utc::now().timestamp_millis(),
            format: FrameFormat::Bgr8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_frames_have_expected_shape() {
        let mut source = TestPatternSource::new(32, 16);
        let frame = source.capture().expect("frame");
        assert_eq!(frame.width, 32);
        assert_eq!(frame.height, 16);
        assert_eq!(frame.data.len(), 32 * 16 * 3);
        assert!(matches!(frame.format, FrameFormat::Bgr8));
    }

    #[test]
    fn pattern_advances_between_frames() {
        let mut source = TestPatternSource::new(8, 8);
        let first = source.capture().expect("frame");
        let second = source.capture().expect("frame");
        assert_ne!(first.data, second.data);
    }
}
