use std::thread;
use std::time::Duration;

use crate::display::domain::frame_display::FrameDisplay;
use crate::shared::cancellation::CancellationToken;
use crate::shared::frame_buffer::FrameBuffer;

/// Sleep between buffer polls when no frame is waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Why a [`DisplayLoop`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayExit {
    QuitRequested,
    Cancelled,
}

/// Drains the frame buffer into a display until the user quits or the
/// process is cancelled.
///
/// Runs independently of production: it never waits for a frame and never
/// slows the producer down.
pub struct DisplayLoop {
    poll_interval: Duration,
    shown: usize,
}

impl DisplayLoop {
    pub fn new() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            shown: 0,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Frames rendered so far.
    pub fn shown(&self) -> usize {
        self.shown
    }

    /// A quit request cancels `cancel`, which stops every other loop too.
    /// The display is closed on every exit path.
    pub fn run(
        &mut self,
        buffer: &FrameBuffer,
        display: &mut dyn FrameDisplay,
        cancel: &CancellationToken,
    ) -> DisplayExit {
        let exit = loop {
            if cancel.is_cancelled() {
                break DisplayExit::Cancelled;
            }
            if display.quit_requested() {
                log::info!("Quit requested from display");
                cancel.cancel();
                break DisplayExit::QuitRequested;
            }
            match buffer.pop() {
                Some(frame) => {
                    if let Err(e) = display.show(&frame) {
                        log::warn!("Failed to show frame {}: {e}", frame.index());
                    }
                    self.shown += 1;
                }
                None => thread::sleep(self.poll_interval),
            }
        };
        display.close();
        exit
    }
}

impl Default for DisplayLoop {
    fn default() -> Self {
        Self::new()
    }
}
