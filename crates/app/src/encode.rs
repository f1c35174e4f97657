//! JPEG encoding and MJPEG chunk framing.

use frame_ingest::{Frame, FrameFormat};
use image::{RgbImage, codecs::jpeg::JpegEncoder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode frame: {0}")]
    BadFrame(String),
    #[error("JPEG encode failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// Convert a raw BGR8 frame into an RGB image buffer.
pub fn to_rgb_image(frame: &Frame) -> Result<RgbImage, EncodeError> {
    if !matches!(frame.format, FrameFormat::Bgr8) {
        return Err(EncodeError::BadFrame("unsupported frame format".into()));
    }
    let width = frame.width.max(0) as u32;
    let height = frame.height.max(0) as u32;
    let expected = (width as usize) * (height as usize) * 3;
    if frame.data.len() != expected {
        return Err(EncodeError::BadFrame(format!(
            "frame buffer is {} bytes, expected {expected}",
            frame.data.len()
        )));
    }

    let mut rgb = Vec::with_capacity(frame.data.len());
    for pixel in frame.data.chunks_exact(3) {
        rgb.push(pixel[2]);
        rgb.push(pixel[1]);
        rgb.push(pixel[0]);
    }
    RgbImage::from_vec(width, height, rgb)
        .ok_or_else(|| EncodeError::BadFrame("frame dimensions do not match buffer".into()))
}

/// Encode an RGB image as JPEG at the given quality (1–100).
pub fn to_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(image)?;
    Ok(buffer)
}

/// Frame a JPEG as one self-delimited part of the `multipart/x-mixed-replace`
/// stream: `--frame\r\nContent-Type: image/jpeg\r\n\r\n<bytes>\r\n\r\n`.
pub fn mjpeg_chunk(jpeg: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(jpeg.len() + 64);
    chunk.extend_from_slice(b"--frame\r\n");
    chunk.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    chunk.extend_from_slice(jpeg);
    chunk.extend_from_slice(b"\r\n\r\n");
    chunk
}
