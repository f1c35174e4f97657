//! Detection types and detector backends for the visionfeed pipeline.
//!
//! The pipeline only depends on the [`Detector`] capability; concrete
//! backends live behind it so the pipeline can run against fakes without
//! hardware or model artifacts. The TorchScript backend is gated behind the
//! `with-tch` feature.

pub use labels::load_labels;
pub use scripted::ScriptedDetector;
pub use types::{DetectError, Detection, Detector};

mod labels;
mod scripted;
mod types;

#[cfg(feature = "with-tch")]
pub mod torch;
