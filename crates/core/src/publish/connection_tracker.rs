use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::pipeline::production_supervisor::SupervisorEvent;
use crate::publish::domain::landmark_sink::LandmarkSink;
use crate::publish::domain::session_registry::{SessionId, SessionRegistry};

/// Network-facing side of the session registry.
///
/// Registers and removes sessions, and tells the production supervisor
/// when the subscriber count goes from zero to one or back to zero.
#[derive(Clone)]
pub struct ConnectionTracker {
    registry: Arc<SessionRegistry>,
    events: Sender<SupervisorEvent>,
}

impl ConnectionTracker {
    pub fn new(registry: Arc<SessionRegistry>, events: Sender<SupervisorEvent>) -> Self {
        Self { registry, events }
    }

    /// Transition events are sent under the registry lock, so they reach
    /// the supervisor in the order the transitions happened.
    pub fn on_connect(&self, id: SessionId, sink: Box<dyn LandmarkSink>) {
        log::info!("Client connected: {id}");
        self.registry.connect_with(id, sink, || {
            self.notify(SupervisorEvent::SubscriberJoined)
        });
    }

    pub fn on_disconnect(&self, id: &SessionId) {
        let removed = self.registry.disconnect_with(id, || {
            self.notify(SupervisorEvent::AllSubscribersLeft)
        });
        if removed {
            log::info!("Client disconnected: {id}");
        }
    }

    fn notify(&self, event: SupervisorEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Production supervisor has stopped; dropped {event:?}");
        }
    }
}
