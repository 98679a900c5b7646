use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;

use crate::pipeline::pause_gate::PauseGate;
use crate::pipeline::stream_landmarks_use_case::ProductionStats;
use crate::publish::domain::session_registry::SessionRegistry;
use crate::video::domain::video_reader::VideoError;

/// Subscriber transitions and shutdown, as seen by the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// The subscriber count went from zero to one.
    SubscriberJoined,
    /// The subscriber count went back to zero.
    AllSubscribersLeft,
    Shutdown,
}

/// Where production stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductionState {
    NotStarted,
    Running,
    Paused,
    /// The production thread returned; it is never restarted.
    Stopped,
}

pub type ProductionHandle = JoinHandle<Result<ProductionStats, VideoError>>;

/// Spawns the production thread once, with the gate it must honor.
pub type ProductionLauncher =
    Box<dyn FnOnce(Arc<PauseGate>) -> std::io::Result<ProductionHandle> + Send>;

/// Single owner of the production lifecycle.
///
/// Consumes [`SupervisorEvent`]s: the first subscriber starts production,
/// a later 0->1 transition resumes it and 1->0 pauses it. Production is
/// started at most once; a production thread that has ended (source
/// unavailable, decode failure) is not restarted.
///
/// Events are hints: the registry's live count decides. A join seen while
/// nobody is registered, or a leave seen while someone is, is ignored.
pub struct ProductionSupervisor {
    events: Receiver<SupervisorEvent>,
    registry: Arc<SessionRegistry>,
    gate: Arc<PauseGate>,
    launcher: Option<ProductionLauncher>,
    handle: Option<ProductionHandle>,
    starts: usize,
}

/// What the supervisor saw by the time it stopped.
#[derive(Debug)]
pub struct SupervisorReport {
    pub starts: usize,
    /// `None` when production never started or its thread panicked.
    pub outcome: Option<Result<ProductionStats, VideoError>>,
}

impl ProductionSupervisor {
    pub fn new(
        events: Receiver<SupervisorEvent>,
        registry: Arc<SessionRegistry>,
        launcher: ProductionLauncher,
    ) -> Self {
        Self {
            events,
            registry,
            gate: Arc::new(PauseGate::new()),
            launcher: Some(launcher),
            handle: None,
            starts: 0,
        }
    }

    pub fn pause_gate(&self) -> Arc<PauseGate> {
        self.gate.clone()
    }

    pub fn starts(&self) -> usize {
        self.starts
    }

    pub fn state(&self) -> ProductionState {
        match &self.handle {
            None => ProductionState::NotStarted,
            Some(h) if h.is_finished() => ProductionState::Stopped,
            Some(_) if self.gate.is_paused() => ProductionState::Paused,
            Some(_) => ProductionState::Running,
        }
    }

    /// Processes events until `Shutdown` or until every sender is gone,
    /// then waits for the production thread.
    ///
    /// The production thread must be stopped through the shared
    /// cancellation token before or alongside `Shutdown`.
    pub fn run(mut self) -> SupervisorReport {
        while let Ok(event) = self.events.recv() {
            if !self.handle_event(event) {
                break;
            }
        }
        self.finish()
    }

    /// Applies one event. Returns false once the supervisor should stop.
    pub fn handle_event(&mut self, event: SupervisorEvent) -> bool {
        match event {
            SupervisorEvent::SubscriberJoined => {
                if self.registry.is_empty() {
                    log::debug!("Ignoring stale join, no sessions registered");
                } else {
                    self.on_first_subscriber();
                }
            }
            SupervisorEvent::AllSubscribersLeft => {
                if !self.registry.is_empty() {
                    log::debug!("Ignoring stale leave, sessions still registered");
                } else if self.state() == ProductionState::Running {
                    log::info!("No subscribers left, pausing production");
                    self.gate.pause();
                }
            }
            SupervisorEvent::Shutdown => return false,
        }
        true
    }

    fn on_first_subscriber(&mut self) {
        match self.state() {
            ProductionState::NotStarted => {
                let Some(launch) = self.launcher.take() else {
                    return;
                };
                self.gate.resume();
                match launch(self.gate.clone()) {
                    Ok(handle) => {
                        log::info!("Starting production");
                        self.handle = Some(handle);
                        self.starts += 1;
                    }
                    Err(e) => log::error!("Failed to spawn production thread: {e}"),
                }
            }
            ProductionState::Paused => {
                log::info!("Subscriber joined, resuming production");
                self.gate.resume();
            }
            ProductionState::Running => {}
            ProductionState::Stopped => {
                log::warn!("Production has stopped and will not be restarted");
            }
        }
    }

    fn finish(mut self) -> SupervisorReport {
        // Let a parked producer observe cancellation without waiting out
        // its poll interval.
        self.gate.resume();
        let outcome = self.handle.take().and_then(|handle| {
            handle
                .join()
                .map_err(|_| log::error!("Production thread panicked"))
                .ok()
        });
        SupervisorReport {
            starts: self.starts,
            outcome,
        }
    }
}
