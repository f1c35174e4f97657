//! The capture → detect → annotate → encode → publish loop.
//!
//! One dedicated worker owns the capture source and the detector for the
//! lifetime of the run; the shared frame buffer is the only state it touches
//! that anyone else can see. A stalled `capture` or `detect` call blocks the
//! whole pipeline — accepted, and visible through the published frame age.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, bail};
use detect_core::{Detection, Detector};
use frame_ingest::{Frame, FrameSource};
use tracing::{debug, error, info, warn};

use crate::{
    annotate,
    buffer::FrameBuffer,
    data::{DetectionSummary, FramePacket},
    encode, telemetry,
};

const CAPTURE_BACKOFF_CEILING: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct PipelineSettings {
    pub target_fps: f32,
    pub jpeg_quality: u8,
    pub labels: Vec<String>,
    /// Initial sleep after a transient capture failure; doubles per failure
    /// up to a 1 s ceiling.
    pub capture_backoff: Duration,
    /// Consecutive capture failures tolerated before the worker gives up and
    /// records a fault. One success resets the count.
    pub capture_retry_budget: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_fps: 30.0,
            jpeg_quality: 85,
            labels: Vec::new(),
            capture_backoff: Duration::from_millis(10),
            capture_retry_budget: 25,
        }
    }
}

/// Pipeline object with an explicit start/stop lifecycle.
///
/// Constructed with its dependencies, started once; the serving layer only
/// ever sees the [`FrameBuffer`] handle.
pub struct Pipeline {
    buffer: Arc<FrameBuffer>,
    running: Arc<AtomicBool>,
    fault: Arc<Mutex<Option<String>>>,
    worker: Option<thread::JoinHandle<()>>,
    source: Option<Box<dyn FrameSource + Send>>,
    detector: Option<Box<dyn Detector + Send>>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn FrameSource + Send>,
        detector: Box<dyn Detector + Send>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            buffer: Arc::new(FrameBuffer::new()),
            running: Arc::new(AtomicBool::new(false)),
            fault: Arc::new(Mutex::new(None)),
            worker: None,
            source: Some(source),
            detector: Some(detector),
            settings,
        }
    }

    /// Handle handed to the serving layer.
    pub fn buffer(&self) -> Arc<FrameBuffer> {
        self.buffer.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Why the worker exited, if it exited on its own.
    pub fn fault(&self) -> Option<String> {
        self.fault.lock().ok().and_then(|guard| guard.clone())
    }

    /// Spawn the worker thread. Errors if already started or started twice.
    pub fn start(&mut self) -> Result<()> {
        let (Some(source), Some(detector)) = (self.source.take(), self.detector.take()) else {
            bail!("pipeline already started");
        };
        if self.settings.target_fps <= 0.0 {
            bail!("target fps must be positive");
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let buffer = self.buffer.clone();
        let fault = self.fault.clone();
        let settings = self.settings.clone();

        let handle = telemetry::spawn_thread("visionfeed-pipeline", move || {
            if let Err(err) = run_loop(source, detector, buffer, running.clone(), settings) {
                error!("Pipeline worker exited: {err:#}");
                if let Ok(mut guard) = fault.lock() {
                    *guard = Some(format!("{err:#}"));
                }
            }
            running.store(false, Ordering::SeqCst);
        })?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Signal the worker to finish its current iteration and join it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    mut source: Box<dyn FrameSource + Send>,
    mut detector: Box<dyn Detector + Send>,
    buffer: Arc<FrameBuffer>,
    running: Arc<AtomicBool>,
    settings: PipelineSettings,
) -> Result<()> {
    let interval = Duration::from_secs_f32(1.0 / settings.target_fps);
    info!(
        "Pipeline running at {:.1} fps target ({} ms interval)",
        settings.target_fps,
        interval.as_millis()
    );

    let mut frame_number: u64 = 0;
    let mut smoothed_fps: f32 = 0.0;
    let mut last_instant = Instant::now();
    let mut consecutive_failures: u32 = 0;
    let mut backoff = settings.capture_backoff;

    while running.load(Ordering::Relaxed) {
        let iteration_start = Instant::now();

        let capture_start = Instant::now();
        let frame = match source.capture() {
            Ok(frame) => {
                consecutive_failures = 0;
                backoff = settings.capture_backoff;
                frame
            }
            Err(err) => {
                consecutive_failures += 1;
                metrics::counter!("visionfeed_capture_retries_total").increment(1);
                if consecutive_failures >= settings.capture_retry_budget {
                    bail!(
                        "capture failed {consecutive_failures} times in a row (last: {err}); giving up"
                    );
                }
                warn!(
                    "Capture failed ({err}); retry #{consecutive_failures} in {} ms",
                    backoff.as_millis()
                );
                thread::sleep(backoff);
                backoff = (backoff * 2).min(CAPTURE_BACKOFF_CEILING);
                continue;
            }
        };
        metrics::histogram!("visionfeed_stage_latency_seconds", "stage" => "capture")
            .record(capture_start.elapsed().as_secs_f64());

        frame_number = frame_number.wrapping_add(1);
        let now = Instant::now();
        let elapsed = now.duration_since(last_instant).as_secs_f32();
        last_instant = now;
        if elapsed > 0.0 {
            let instant = 1.0 / elapsed;
            smoothed_fps = if smoothed_fps == 0.0 {
                instant
            } else {
                0.9 * smoothed_fps + 0.1 * instant
            };
        }
        metrics::gauge!("visionfeed_pipeline_fps").set(smoothed_fps as f64);
        if frame_number % 30 == 0 {
            debug!(
                "Capture heartbeat: frame #{frame_number}, {smoothed_fps:.1} fps, ts={}",
                frame.timestamp_ms
            );
        }

        let detect_start = Instant::now();
        let detections = match detector.detect(&frame) {
            Ok(detections) => Some(detections),
            Err(err) => {
                // The frame still goes out this cycle, just without overlays.
                warn!("Detection failed for frame #{frame_number}: {err}; publishing unannotated");
                metrics::counter!("visionfeed_detect_errors_total").increment(1);
                None
            }
        };
        metrics::histogram!("visionfeed_stage_latency_seconds", "stage" => "detect")
            .record(detect_start.elapsed().as_secs_f64());

        let encode_start = Instant::now();
        match encode_packet(
            &frame,
            detections.as_deref(),
            frame_number,
            smoothed_fps,
            &settings,
        ) {
            Ok(packet) => {
                metrics::gauge!("visionfeed_detections").set(packet.detections.len() as f64);
                buffer.publish(packet);
            }
            Err(err) => {
                error!("Encode failed for frame #{frame_number}: {err}; keeping previous frame");
                metrics::counter!("visionfeed_encode_errors_total").increment(1);
            }
        }
        metrics::histogram!("visionfeed_stage_latency_seconds", "stage" => "encode")
            .record(encode_start.elapsed().as_secs_f64());

        let sleep = pace(interval, iteration_start.elapsed());
        if !sleep.is_zero() {
            thread::sleep(sleep);
        }
    }

    info!("Pipeline worker stopped after {frame_number} frame(s)");
    Ok(())
}

/// Annotate (when detections are present) and JPEG-encode one frame.
fn encode_packet(
    frame: &Frame,
    detections: Option<&[Detection]>,
    frame_number: u64,
    fps: f32,
    settings: &PipelineSettings,
) -> Result<FramePacket, encode::EncodeError> {
    let mut image = encode::to_rgb_image(frame)?;
    if let Some(detections) = detections {
        annotate::draw_detections(&mut image, detections);
    }
    let jpeg = encode::to_jpeg(&image, settings.jpeg_quality)?;

    let summaries = detections
        .unwrap_or(&[])
        .iter()
        .map(|det| DetectionSummary {
            class_id: det.class_id,
            label: usize::try_from(det.class_id)
                .ok()
                .and_then(|idx| settings.labels.get(idx))
                .cloned()
                .unwrap_or_else(|| det.class_id.to_string()),
            confidence: det.confidence,
            center: [det.center.0, det.center.1],
            width: det.width,
            height: det.height,
        })
        .collect();

    Ok(FramePacket {
        jpeg,
        frame_number,
        timestamp_ms: frame.timestamp_ms,
        fps,
        detections: summaries,
    })
}

/// Remaining sleep for this iteration: `max(0, interval − elapsed)`. The
/// loop never tries to catch up on missed intervals.
fn pace(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pace_sleeps_the_remainder_of_the_interval() {
        let interval = Duration::from_secs_f32(1.0 / 30.0);
        let sleep = pace(interval, Duration::from_millis(10));
        assert!(sleep > Duration::from_millis(22) && sleep < Duration::from_millis(24));
    }

    #[test]
    fn pace_never_goes_negative() {
        let interval = Duration::from_secs_f32(1.0 / 30.0);
        assert_eq!(pace(interval, Duration::from_millis(40)), Duration::ZERO);
        assert_eq!(pace(interval, interval), Duration::ZERO);
    }
}
