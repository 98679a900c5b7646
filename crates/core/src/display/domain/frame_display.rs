use crate::shared::frame::Frame;

/// A surface that shows annotated frames to the local user.
pub trait FrameDisplay: Send {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Polled once per loop iteration; true once the user asked to quit.
    fn quit_requested(&mut self) -> bool;

    /// Releases the surface. Called exactly once when the loop ends.
    fn close(&mut self);
}
