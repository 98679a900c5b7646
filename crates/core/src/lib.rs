//! Face landmark extraction and real-time streaming.
//!
//! Frames flow `reader → extractor → {publisher, annotator → buffer}` on a
//! production thread; the buffer is drained by a display loop and the
//! publisher fans landmark lists out to Socket.IO WebSocket sessions.

pub mod annotation;
pub mod detection;
pub mod display;
pub mod pipeline;
pub mod publish;
pub mod shared;
pub mod transport;
pub mod video;
