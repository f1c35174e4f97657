use serde::Serialize;

/// Encoded frame as published to the shared buffer.
#[derive(Clone)]
pub struct FramePacket {
    pub jpeg: Vec<u8>,
    pub frame_number: u64,
    pub timestamp_ms: i64,
    pub fps: f32,
    pub detections: Vec<DetectionSummary>,
}

/// Detection metadata carried alongside the encoded frame for the JSON view.
#[derive(Clone, Serialize)]
pub struct DetectionSummary {
    pub class_id: i64,
    pub label: String,
    pub confidence: f32,
    pub center: [f32; 2],
    pub width: f32,
    pub height: f32,
}

#[derive(Serialize)]
pub(crate) struct DetectionsResponse<'a> {
    pub(crate) frame_number: u64,
    pub(crate) timestamp_ms: i64,
    pub(crate) fps: f32,
    pub(crate) detections: &'a [DetectionSummary],
}
