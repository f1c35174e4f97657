//! TorchScript detector backend (feature `with-tch`).

use std::{convert::TryFrom, path::Path};

use anyhow::{Context, Result};
use frame_ingest::{Frame, FrameFormat};
use tch::{self, Device, Kind, Tensor};

use crate::types::{DetectError, Detection, Detector};

const MAX_DETECTIONS: usize = 512;

/// TorchScript-backed detector.
///
/// Loads a compiled module whose output is `[1, C, N]` with channels
/// `(cx, cy, w, h, conf[, class])` in detector input coordinates; boxes are
/// rescaled to the frame the caller supplied.
pub struct TorchDetector {
    module: tch::CModule,
    device: Device,
    input_size: (i64, i64),
    confidence_threshold: f32,
}

impl TorchDetector {
    /// Load a TorchScript module. Fails before the pipeline starts when the
    /// artifact is missing or unloadable.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        device: Device,
        input_size: (i64, i64),
        confidence_threshold: f32,
    ) -> Result<Self> {
        let module = tch::CModule::load_on_device(&model_path, device).with_context(|| {
            format!(
                "failed to load detection model from {}",
                model_path.as_ref().display()
            )
        })?;
        Ok(Self {
            module,
            device,
            input_size,
            confidence_threshold,
        })
    }

    fn bgr_to_tensor(&self, frame: &Frame) -> Result<Tensor, DetectError> {
        if !matches!(frame.format, FrameFormat::Bgr8) {
            return Err(DetectError::BadFrame("unsupported frame format".into()));
        }
        let expected = (frame.width as usize) * (frame.height as usize) * 3;
        if frame.data.len() != expected {
            return Err(DetectError::BadFrame(format!(
                "frame buffer is {} bytes, expected {expected}",
                frame.data.len()
            )));
        }

        let tensor = Tensor::from_slice(&frame.data)
            .to_device(self.device)
            .to_kind(Kind::Float)
            .view([1, frame.height as i64, frame.width as i64, 3])
            .flip([3])
            .permute([0, 3, 1, 2])
            / 255.0;

        let (in_w, in_h) = self.input_size;
        let resized = tensor.upsample_bilinear2d([in_h, in_w], false, None, None);
        Ok(resized)
    }
}

impl Detector for TorchDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        let input = self.bgr_to_tensor(frame)?;
        let output = self
            .module
            .forward_ts(&[input])
            .context("detector forward pass failed")
            .map_err(DetectError::Inference)?;

        let shape = output.size();
        if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
            return Err(DetectError::BadFrame(format!(
                "unexpected detector output shape: {shape:?}"
            )));
        }

        let preds = output
            .to_device(Device::Cpu)
            .squeeze_dim(0)
            .permute([1, 0])
            .contiguous();
        let rows: Vec<Vec<f32>> = Vec::<Vec<f32>>::try_from(&preds)
            .context("failed to read detector output")
            .map_err(DetectError::Inference)?;

        let (in_w, in_h) = self.input_size;
        let scale_x = frame.width as f32 / in_w as f32;
        let scale_y = frame.height as f32 / in_h as f32;

        let mut detections = Vec::new();
        for row in rows {
            if row.len() < 5 {
                continue;
            }
            let confidence = row[4];
            if confidence < self.confidence_threshold {
                continue;
            }
            let class_id = if row.len() > 5 { row[5] as i64 } else { 0 };
            detections.push(Detection {
                class_id,
                center: (row[0] * scale_x, row[1] * scale_y),
                width: row[2] * scale_x,
                height: row[3] * scale_y,
                confidence,
            });
            if detections.len() >= MAX_DETECTIONS {
                break;
            }
        }

        Ok(detections)
    }
}
