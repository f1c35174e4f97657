//! Frame acquisition for the visionfeed pipeline.
//!
//! The crate defines the raw [`Frame`] type, the [`FrameSource`] capability
//! the pipeline pulls frames through, and two concrete sources:
//! - [`FfmpegSource`]: decodes a V4L2 device or stream URI to raw BGR24 via a
//!   spawned `ffmpeg` process.
//! - [`TestPatternSource`]: synthetic frames for model-free runs and tests.

pub use ffmpeg::FfmpegSource;
pub use pattern::TestPatternSource;
pub use types::{CaptureError, Frame, FrameFormat, FrameSource};

mod ffmpeg;
mod pattern;
mod types;
