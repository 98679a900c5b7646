use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("outbound queue full")]
    ChannelFull,
    #[error("session channel closed")]
    ChannelClosed,
}

/// Outbound channel to one connected session.
///
/// `send` must not block: the production thread calls it inline and a slow
/// client may only cost its own frames.
pub trait LandmarkSink: Send + Sync {
    /// Queues `event` with an already-serialized JSON `payload`.
    fn send(&self, event: &str, payload: &str) -> Result<(), TransportError>;
}
