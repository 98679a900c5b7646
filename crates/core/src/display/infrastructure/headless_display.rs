use std::path::{Path, PathBuf};

use crate::display::domain::frame_display::FrameDisplay;
use crate::shared::constants::DEFAULT_SNAPSHOT_EVERY;
use crate::shared::frame::Frame;

const SNAPSHOT_FILE: &str = "latest.png";

/// Display for machines without a window system.
///
/// Frames are counted and, when a directory is configured, every Nth frame
/// is written to `latest.png` there so the annotated view can still be
/// inspected. Never requests a quit; the process stops on Ctrl-C.
pub struct HeadlessDisplay {
    snapshot_dir: Option<PathBuf>,
    every: usize,
    frames: usize,
}

impl HeadlessDisplay {
    pub fn new(snapshot_dir: Option<PathBuf>) -> Self {
        Self {
            snapshot_dir,
            every: DEFAULT_SNAPSHOT_EVERY,
            frames: 0,
        }
    }

    pub fn with_interval(mut self, every: usize) -> Self {
        self.every = every.max(1);
        self
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.snapshot_dir.as_ref().map(|d| d.join(SNAPSHOT_FILE))
    }
}

impl FrameDisplay for HeadlessDisplay {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.frames += 1;
        if (self.frames - 1) % self.every != 0 {
            return Ok(());
        }
        log::debug!(
            "Displayed {} frames (latest #{} {}x{})",
            self.frames,
            frame.index(),
            frame.width(),
            frame.height()
        );
        if let Some(path) = self.snapshot_path() {
            write_snapshot(frame, &path)?;
        }
        Ok(())
    }

    fn quit_requested(&mut self) -> bool {
        false
    }

    fn close(&mut self) {
        log::info!("Display closed after {} frames", self.frames);
    }
}

fn write_snapshot(frame: &Frame, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let img = image::RgbaImage::from_raw(frame.width(), frame.height(), frame.to_rgba())
        .ok_or("frame buffer size does not match its dimensions")?;
    img.save(path)?;
    Ok(())
}
