use crate::shared::frame::Frame;
use crate::shared::landmark::FaceLandmarks;

/// Extracts per-face landmark lists from a frame.
///
/// Zero faces is a normal result, not an error. Points are normalized to
/// the frame size and keep the model's fixed ordering.
pub trait LandmarkExtractor: Send {
    fn extract(&mut self, frame: &Frame)
        -> Result<Vec<FaceLandmarks>, Box<dyn std::error::Error>>;
}
