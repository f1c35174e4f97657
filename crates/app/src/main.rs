use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use detect_core::{Detector, ScriptedDetector, load_labels};
use frame_ingest::{FfmpegSource, FrameSource, TestPatternSource};
use tracing::{info, warn};
use visionfeed::{Config, Pipeline, PipelineSettings, ServerOptions, spawn_server, telemetry};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = Config::from_args(&args)?;

    telemetry::init_tracing(config.verbose);
    let _ = telemetry::init_metrics_recorder();

    let (source, detector, labels) = build_stages(&config)?;

    let mut pipeline = Pipeline::new(
        source,
        detector,
        PipelineSettings {
            target_fps: config.target_fps,
            jpeg_quality: config.jpeg_quality,
            labels,
            ..PipelineSettings::default()
        },
    );
    pipeline.start().context("Failed to start pipeline")?;

    let server = spawn_server(
        pipeline.buffer(),
        ServerOptions {
            port: config.port,
            max_clients: config.max_clients,
            frame_interval: Duration::from_secs_f32(1.0 / config.target_fps),
        },
    )
    .context("Failed to start HTTP server")?;
    info!(
        "Live feed at http://0.0.0.0:{}/video_feed — press Ctrl+C to stop",
        config.port
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_shutdown = shutdown.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        handler_shutdown.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to install Ctrl+C handler: {err}");
    }

    while pipeline.is_running() && !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    let fault = pipeline.fault();
    pipeline.stop();
    server.stop();

    if let Some(fault) = fault {
        bail!("pipeline stopped on its own: {fault}");
    }
    Ok(())
}

/// Wire the capture source and detector the configuration asks for.
fn build_stages(
    config: &Config,
) -> Result<(
    Box<dyn FrameSource + Send>,
    Box<dyn Detector + Send>,
    Vec<String>,
)> {
    if config.synthetic {
        let labels = match config.labels_path.as_ref() {
            Some(path) => load_labels(path)?,
            None => vec!["background".to_string(), "object".to_string()],
        };
        info!("Synthetic mode: test pattern source and scripted detector");
        return Ok((
            Box::new(TestPatternSource::new(config.width, config.height)),
            Box::new(ScriptedDetector::new()),
            labels,
        ));
    }

    let labels_path = config
        .labels_path
        .as_ref()
        .context("labels path required outside synthetic mode")?;
    let labels = load_labels(labels_path)?;

    let source = FfmpegSource::open(&config.source, (config.width, config.height))
        .with_context(|| format!("Failed to open capture source {}", config.source))?;

    let detector = build_detector(config)?;
    Ok((Box::new(source), detector, labels))
}

#[cfg(feature = "with-tch")]
fn build_detector(config: &Config) -> Result<Box<dyn Detector + Send>> {
    use detect_core::torch::TorchDetector;

    let model_path = config
        .model_path
        .as_ref()
        .context("model path required outside synthetic mode")?;
    let detector = TorchDetector::new(
        model_path,
        tch::Device::cuda_if_available(),
        (config.width as i64, config.height as i64),
        config.confidence_threshold,
    )?;
    info!("Detection model loaded from {}", model_path.display());
    Ok(Box::new(detector))
}

#[cfg(not(feature = "with-tch"))]
fn build_detector(_config: &Config) -> Result<Box<dyn Detector + Send>> {
    bail!(
        "this build has no detection backend; rebuild with --features with-tch \
         or run with --synthetic"
    )
}
