use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;

use crate::publish::domain::landmark_sink::{LandmarkSink, TransportError};
use crate::transport::engine_io;

/// Queues Socket.IO event frames for one WebSocket connection.
///
/// The connection task drains the queue; a full queue means the client is
/// not keeping up and the frame is dropped.
pub struct WebSocketSink {
    outbound: Sender<String>,
}

impl WebSocketSink {
    pub fn new(outbound: Sender<String>) -> Self {
        Self { outbound }
    }
}

impl LandmarkSink for WebSocketSink {
    fn send(&self, event: &str, payload: &str) -> Result<(), TransportError> {
        self.outbound
            .try_send(engine_io::event_packet(event, payload))
            .map_err(|e| match e {
                TrySendError::Full(_) => TransportError::ChannelFull,
                TrySendError::Closed(_) => TransportError::ChannelClosed,
            })
    }
}
