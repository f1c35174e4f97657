//! Live object-detection MJPEG streaming server.
//!
//! A single worker drives capture → detect → annotate → encode and publishes
//! each encoded frame into a latest-wins buffer; any number of HTTP clients
//! read independent snapshots from it. The module split:
//! - `config`: CLI configuration parsing.
//! - `buffer`: single-slot shared frame buffer (the only multi-context state).
//! - `pipeline`: the capture → detect → annotate → encode → publish loop.
//! - `annotate`: bounding box and label drawing.
//! - `encode`: JPEG encode and multipart chunk framing.
//! - `server`: Actix Web endpoints, including the MJPEG feed.
//! - `telemetry`: tracing and Prometheus metrics setup.
//! - `data`: shared structs passed between stages.

pub use buffer::FrameBuffer;
pub use config::Config;
pub use data::FramePacket;
pub use pipeline::{Pipeline, PipelineSettings};
pub use server::{PreviewServer, ServerOptions, spawn_server};

pub mod annotate;
mod buffer;
mod config;
mod data;
pub mod encode;
mod pipeline;
mod server;
pub mod telemetry;
