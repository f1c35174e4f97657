use anyhow::Error;
use thiserror::Error;

/// Raw frame captured from a video source.
pub struct Frame {
    pub data: Vec<u8>,
    pub width: i32,
    pub height: i32,
    pub timestamp_ms: i64,
    pub format: FrameFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameFormat {
    Bgr8,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open video source {uri:?}")]
    Open { uri: String },
    /// No frame arrived within the poll window. Transient; callers are
    /// expected to back off and retry.
    #[error("no frame available from the capture source")]
    NoFrame,
    #[error("capture source closed")]
    Closed,
    #[error(transparent)]
    Other(#[from] Error),
}

/// Pulls frames from some source (camera device, stream URI, test generator).
///
/// One call hands over exactly one frame. Implementations own their device
/// state; the pipeline never shares a source between threads.
pub trait FrameSource {
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}
