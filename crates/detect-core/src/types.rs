use anyhow::Error;
use frame_ingest::Frame;
use thiserror::Error;

/// Single detection for one frame, in frame pixel coordinates.
///
/// Boxes are center-form: `center` is the box midpoint, `width`/`height` its
/// full extents. `confidence` is in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: i64,
    pub center: (f32, f32),
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("detector rejected frame: {0}")]
    BadFrame(String),
    #[error(transparent)]
    Inference(#[from] Error),
}

/// Runs inference on a frame.
///
/// Given the same frame, implementations return the same detections in the
/// same order; no cross-call state affects correctness. Calls may take
/// arbitrarily long — the pipeline imposes no timeout.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectError>;
}
