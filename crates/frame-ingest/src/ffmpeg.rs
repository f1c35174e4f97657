//! FFmpeg-backed capture source.
//!
//! Spawns an `ffmpeg` child that decodes the source to raw BGR24 frames on
//! stdout. A background thread reads fixed-size frames and forwards them over
//! a small bounded channel so a stalled consumer backpressures the decoder
//! instead of buffering stale frames.

use std::{
    io::Read,
    process::{Child, Command, Stdio},
    thread,
    time::Duration,
};

use anyhow::anyhow;
use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use tracing::debug;

use crate::types::{CaptureError, Frame, FrameFormat, FrameSource};

const FRAME_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Capture source decoding frames through a spawned `ffmpeg` process.
pub struct FfmpegSource {
    rx: Receiver<Result<Frame, CaptureError>>,
    child: Child,
}

impl FfmpegSource {
    /// Open `uri` (device index, `/dev/videoN`, file path, or network URI)
    /// and start decoding at `target_size` (width, height).
    pub fn open(uri: &str, target_size: (i32, i32)) -> Result<Self, CaptureError> {
        let (is_v4l, ffmpeg_uri) = if let Some(index) = parse_device_index(uri) {
            (true, format!("/dev/video{index}"))
        } else if uri.starts_with("/dev/video") {
            (true, uri.to_string())
        } else {
            (false, uri.to_string())
        };

        let scale_arg = format!("scale={}:{}", target_size.0, target_size.1);
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .stderr(Stdio::inherit());

        if is_v4l {
            cmd.arg("-f").arg("video4linux2");
        }

        cmd.arg("-i")
            .arg(&ffmpeg_uri)
            .arg("-vf")
            .arg(&scale_arg)
            .arg("-pix_fmt")
            .arg("bgr24")
            .arg("-f")
            .arg("rawvideo")
            .arg("-")
            .stdout(Stdio::piped());

        let mut child = cmd.spawn().map_err(|_| CaptureError::Open {
            uri: uri.to_string(),
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Other(anyhow!("failed to capture ffmpeg stdout")))?;

        debug!("ffmpeg capture started for {ffmpeg_uri} at {}x{}", target_size.0, target_size.1);

        let (tx, rx) = bounded(2);
        thread::Builder::new()
            .name("frame-ingest-ffmpeg".into())
            .spawn(move || read_loop(stdout, target_size, tx))
            .map_err(|err| CaptureError::Other(err.into()))?;

        Ok(Self { rx, child })
    }
}

impl FrameSource for FfmpegSource {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        match self.rx.recv_timeout(FRAME_POLL_TIMEOUT) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(CaptureError::NoFrame),
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::Closed),
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn read_loop(
    mut stdout: impl Read,
    target_size: (i32, i32),
    tx: Sender<Result<Frame, CaptureError>>,
) {
    let frame_bytes = (target_size.0 as usize) * (target_size.1 as usize) * 3;
    let mut buffer = vec![0u8; frame_bytes];

    loop {
        match stdout.read_exact(&mut buffer) {
            Ok(()) => {
                let frame = Frame {
                    data: buffer.clone(),
                    width: target_size.0,
                    height: target_size.1,
                    timestamp_ms: Utc::now().timestamp_millis(),
                    format: FrameFormat::Bgr8,
                };
                if tx.send(Ok(frame)).is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(CaptureError::Other(err.into())));
                break;
            }
        }
    }
}

fn parse_device_index(uri: &str) -> Option<i32> {
    if let Ok(index) = uri.parse::<i32>() {
        return Some(index);
    }
    if let Some(stripped) = uri.strip_prefix("/dev/video") {
        if stripped.chars().all(|c| c.is_ascii_digit()) {
            return stripped.parse::<i32>().ok();
        }
    }
    None
}
