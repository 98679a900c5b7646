use std::sync::Arc;
use std::time::Instant;

use crate::publish::domain::payload::{encode_payload, PayloadLayout};
use crate::publish::domain::session_registry::SessionRegistry;
use crate::shared::constants::LANDMARK_EVENT;
use crate::shared::landmark::FaceLandmarks;

/// Outcome of publishing one frame's landmarks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub sent: usize,
    pub throttled: usize,
    pub dropped: usize,
}

/// Fans each frame's landmarks out to every registered session.
///
/// The payload is serialized once per frame. Each session's gate decides
/// independently whether it receives this frame; a sink that refuses the
/// message costs that session the frame and nothing else.
pub struct RealtimePublisher {
    registry: Arc<SessionRegistry>,
    layout: PayloadLayout,
}

impl RealtimePublisher {
    pub fn new(registry: Arc<SessionRegistry>, layout: PayloadLayout) -> Self {
        Self { registry, layout }
    }

    pub fn layout(&self) -> PayloadLayout {
        self.layout
    }

    pub fn publish(&self, faces: &[FaceLandmarks]) -> PublishReport {
        self.publish_at(faces, Instant::now())
    }

    pub fn publish_at(&self, faces: &[FaceLandmarks], now: Instant) -> PublishReport {
        if self.registry.is_empty() {
            return PublishReport::default();
        }

        let payload = match encode_payload(faces, self.layout) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Failed to serialize landmarks: {e}");
                return PublishReport {
                    dropped: self.registry.len(),
                    ..Default::default()
                };
            }
        };

        let mut sent = 0;
        let mut dropped = 0;
        let throttled = self.registry.for_each_due(now, |id, sink| {
            match sink.send(LANDMARK_EVENT, &payload) {
                Ok(()) => sent += 1,
                Err(e) => {
                    log::warn!("Dropped landmark frame for {id}: {e}");
                    dropped += 1;
                }
            }
        });

        PublishReport {
            sent,
            throttled,
            dropped,
        }
    }
}
