//! Actix Web server exposing the MJPEG feed and detection APIs.
//!
//! The server runs on a dedicated thread to keep the pipeline hot path free
//! from Actix runtime concerns. Every `/video_feed` client gets its own
//! session task reading snapshots from the shared frame buffer; a slow
//! client only ever blocks itself.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use actix_web::{
    App, HttpResponse, HttpServer,
    web::{self, Bytes},
};
use anyhow::{Context, Result};
use async_stream::stream;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::{buffer::FrameBuffer, data::DetectionsResponse, encode, telemetry};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>visionfeed</title></head>
<body style="margin:0;background:#111;display:flex;justify-content:center">
<img src="/video_feed" alt="live feed" style="max-width:100%;height:auto">
</body>
</html>
"#;

#[derive(Clone, Copy)]
pub struct ServerOptions {
    pub port: u16,
    pub max_clients: usize,
    /// Poll period for stream sessions; also the wait before re-checking an
    /// empty or unchanged buffer.
    pub frame_interval: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: 8080,
            max_clients: 64,
            frame_interval: Duration::from_millis(33),
        }
    }
}

/// Shared state backing HTTP handlers.
struct ServerState {
    buffer: Arc<FrameBuffer>,
    sessions: Arc<SessionGate>,
    frame_interval: Duration,
}

/// Counter enforcing the concurrent stream session cap.
struct SessionGate {
    active: AtomicUsize,
    limit: usize,
}

impl SessionGate {
    fn new(limit: usize) -> Self {
        Self {
            active: AtomicUsize::new(0),
            limit,
        }
    }

    fn try_acquire(gate: &Arc<Self>) -> Option<SessionPermit> {
        let acquired = gate
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                (active < gate.limit).then_some(active + 1)
            })
            .is_ok();
        if acquired {
            metrics::gauge!("visionfeed_stream_sessions")
                .set(gate.active.load(Ordering::Relaxed) as f64);
            Some(SessionPermit { gate: gate.clone() })
        } else {
            metrics::counter!("visionfeed_stream_rejections_total").increment(1);
            None
        }
    }
}

/// Releases the session slot when the client disconnects.
struct SessionPermit {
    gate: Arc<SessionGate>,
}

impl Drop for SessionPermit {
    fn drop(&mut self) {
        let remaining = self.gate.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::gauge!("visionfeed_stream_sessions").set(remaining as f64);
    }
}

#[derive(Default)]
/// Handle for the server thread.
pub struct PreviewServer {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl PreviewServer {
    /// Signal the server to stop and block until the thread exits.
    pub fn stop(self) {
        if let Some(tx) = self.shutdown {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle {
            let _ = handle.join();
        }
    }
}

/// Spawn the HTTP server thread and return a handle that can stop it.
pub fn spawn_server(buffer: Arc<FrameBuffer>, options: ServerOptions) -> Result<PreviewServer> {
    let sessions = Arc::new(SessionGate::new(options.max_clients));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = std::thread::Builder::new()
        .name("visionfeed-server".into())
        .spawn(move || {
            if let Err(err) = actix_web::rt::System::new().block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(web::Data::new(ServerState {
                            buffer: buffer.clone(),
                            sessions: sessions.clone(),
                            frame_interval: options.frame_interval,
                        }))
                        .route("/", web::get().to(index_route))
                        .route("/video_feed", web::get().to(video_feed_handler))
                        .route("/frame.jpg", web::get().to(frame_handler))
                        .route("/detections", web::get().to(detections_handler))
                        .route("/metrics", web::get().to(metrics_handler))
                })
                .bind(("0.0.0.0", options.port))?
                .run();

                let srv_handle = server.handle();
                actix_web::rt::spawn(async move {
                    let _ = shutdown_rx.await;
                    srv_handle.stop(true).await;
                });

                server.await
            }) {
                error!("HTTP server error: {err}");
            }
        })
        .context("Failed to spawn server thread")?;
    info!("HTTP server listening on port {}", options.port);
    Ok(PreviewServer {
        shutdown: Some(shutdown_tx),
        handle: Some(handle),
    })
}

/// Serve the page embedding the stream.
async fn index_route() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// Stream the MJPEG feed over a multipart response until the client
/// disconnects. Each part is one encoded frame; an unchanged or still-empty
/// buffer just waits out another poll period.
async fn video_feed_handler(state: web::Data<ServerState>) -> HttpResponse {
    let Some(permit) = SessionGate::try_acquire(&state.sessions) else {
        return HttpResponse::ServiceUnavailable().body("stream session limit reached\n");
    };

    let state = state.clone();
    let stream = stream! {
        let _permit = permit;
        let mut last_served: Option<u64> = None;
        let mut interval = actix_web::rt::time::interval(state.frame_interval);
        loop {
            interval.tick().await;
            let Some(packet) = state.buffer.snapshot() else {
                continue;
            };
            if last_served == Some(packet.frame_number) {
                continue;
            }
            last_served = Some(packet.frame_number);
            yield Ok::<Bytes, actix_web::Error>(Bytes::from(encode::mjpeg_chunk(&packet.jpeg)));
        }
    };

    HttpResponse::Ok()
        .append_header(("Cache-Control", "no-cache"))
        .append_header(("Content-Type", "multipart/x-mixed-replace; boundary=frame"))
        .streaming(stream)
}

/// Return the latest frame as a single JPEG.
async fn frame_handler(state: web::Data<ServerState>) -> HttpResponse {
    match state.buffer.snapshot() {
        Some(packet) => HttpResponse::Ok()
            .content_type("image/jpeg")
            .body(packet.jpeg.clone()),
        None => HttpResponse::NoContent().finish(),
    }
}

/// Return the most recent detection snapshot as JSON.
async fn detections_handler(state: web::Data<ServerState>) -> HttpResponse {
    match state.buffer.snapshot() {
        Some(packet) => HttpResponse::Ok().json(DetectionsResponse {
            frame_number: packet.frame_number,
            timestamp_ms: packet.timestamp_ms,
            fps: packet.fps,
            detections: &packet.detections,
        }),
        None => HttpResponse::NoContent().finish(),
    }
}

/// Prometheus exposition.
async fn metrics_handler() -> HttpResponse {
    match telemetry::prometheus_handle() {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::NoContent().finish(),
    }
}
