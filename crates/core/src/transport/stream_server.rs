use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::sync::watch;

use crate::detection::domain::landmark_extractor::LandmarkExtractor;
use crate::pipeline::pause_gate::PauseGate;
use crate::pipeline::pipeline_logger::LogPipelineLogger;
use crate::pipeline::production_supervisor::{
    ProductionLauncher, ProductionSupervisor, SupervisorEvent, SupervisorReport,
};
use crate::pipeline::stream_landmarks_use_case::{ProductionSettings, StreamLandmarksUseCase};
use crate::publish::connection_tracker::ConnectionTracker;
use crate::publish::domain::session_registry::SessionRegistry;
use crate::publish::realtime_publisher::RealtimePublisher;
use crate::shared::cancellation::CancellationToken;
use crate::shared::config::StreamConfig;
use crate::shared::frame_buffer::FrameBuffer;
use crate::transport::socket_server::{router, SocketServerState};
use crate::video::infrastructure::reader_factory::create_reader;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Everything behind the network endpoint, wired together.
///
/// Owns the tokio runtime serving Socket.IO, the supervisor thread and
/// (once the first client subscribes) the production thread. The display
/// side only sees the frame buffer and the cancellation token.
pub struct StreamServer {
    runtime: Runtime,
    local_addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    events: Sender<SupervisorEvent>,
    cancel: CancellationToken,
    server_task: tokio::task::JoinHandle<std::io::Result<()>>,
    supervisor: JoinHandle<SupervisorReport>,
}

impl StreamServer {
    /// Binds the endpoint and starts serving. Production does not start
    /// until a client subscribes.
    pub fn start(
        config: &StreamConfig,
        extractor: Box<dyn LandmarkExtractor>,
        buffer: Arc<FrameBuffer>,
        cancel: CancellationToken,
    ) -> Result<Self, ServerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("socket-io")
            .build()
            .map_err(ServerError::Runtime)?;

        let listener = runtime
            .block_on(tokio::net::TcpListener::bind(&config.bind))
            .map_err(|source| ServerError::Bind {
                addr: config.bind.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: config.bind.clone(),
            source,
        })?;

        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let registry = Arc::new(SessionRegistry::new(config.emit_interval()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let app = router(SocketServerState {
            tracker: ConnectionTracker::new(registry.clone(), events_tx.clone()),
            ping_interval: config.ping_interval(),
            ping_timeout: config.ping_timeout(),
            shutdown: shutdown_rx.clone(),
        });
        let mut server_shutdown = shutdown_rx;
        let server_task = runtime.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = server_shutdown.wait_for(|stopping| *stopping).await;
                })
                .await
        });

        runtime.spawn(watch_cancellation(
            cancel.clone(),
            shutdown_tx,
            events_tx.clone(),
        ));
        let interrupt_cancel = cancel.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupt received, shutting down");
                interrupt_cancel.cancel();
            }
        });

        let launcher = production_launcher(config, extractor, registry.clone(), buffer, &cancel);
        let supervisor = ProductionSupervisor::new(events_rx, registry.clone(), launcher);
        let supervisor = thread::Builder::new()
            .name("supervisor".to_string())
            .spawn(move || supervisor.run())
            .map_err(|source| ServerError::Spawn {
                name: "supervisor",
                source,
            })?;

        log::info!("Listening on http://{local_addr}/socket.io/");
        Ok(Self {
            runtime,
            local_addr,
            registry,
            events: events_tx,
            cancel,
            server_task,
            supervisor,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Blocks until the cancellation token fires, then shuts down.
    pub fn wait(self) -> SupervisorReport {
        while !self.cancel.is_cancelled() {
            thread::sleep(CANCEL_POLL_INTERVAL);
        }
        self.shutdown()
    }

    /// Cancels everything, stops accepting connections, disconnects every
    /// session and joins the supervisor and production threads.
    pub fn shutdown(self) -> SupervisorReport {
        self.cancel.cancel();
        log::info!("Shutting down with {} connected clients", self.registry.len());
        let _ = self.events.send(SupervisorEvent::Shutdown);

        let report = self.supervisor.join().unwrap_or_else(|_| {
            log::error!("Supervisor thread panicked");
            SupervisorReport {
                starts: 0,
                outcome: None,
            }
        });

        match self.runtime.block_on(self.server_task) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Server stopped with error: {e}"),
            Err(e) => log::error!("Server task failed: {e}"),
        }
        self.runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
        log::info!("Server stopped");
        report
    }
}

/// Bridges the synchronous cancellation token into the async world: tells
/// sessions and axum to stop, and wakes the supervisor.
async fn watch_cancellation(
    cancel: CancellationToken,
    shutdown: watch::Sender<bool>,
    events: Sender<SupervisorEvent>,
) {
    let mut tick = tokio::time::interval(CANCEL_POLL_INTERVAL);
    loop {
        tick.tick().await;
        if cancel.is_cancelled() {
            break;
        }
    }
    let _ = shutdown.send(true);
    let _ = events.send(SupervisorEvent::Shutdown);
}

fn production_launcher(
    config: &StreamConfig,
    extractor: Box<dyn LandmarkExtractor>,
    registry: Arc<SessionRegistry>,
    buffer: Arc<FrameBuffer>,
    cancel: &CancellationToken,
) -> ProductionLauncher {
    let source = config.source.clone();
    let layout = config.payload_layout;
    let settings = ProductionSettings {
        mirror: config.mirror,
        frame_delay: config.frame_delay(),
        ..Default::default()
    };
    let cancel = cancel.clone();

    Box::new(move |gate: Arc<PauseGate>| {
        thread::Builder::new()
            .name("production".to_string())
            .spawn(move || {
                let use_case = StreamLandmarksUseCase::new(
                    create_reader(&source),
                    extractor,
                    RealtimePublisher::new(registry, layout),
                    buffer,
                    Box::new(LogPipelineLogger::default()),
                    settings,
                );
                use_case.execute(&source, &gate, &cancel)
            })
    })
}
