use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::video_source::VideoSource;
use crate::video::domain::video_reader::{VideoError, VideoReader};

/// Decorator that turns a finite reader into an endless one.
///
/// At end-of-stream the inner reader is rewound and read again, so the
/// frame following the last one is always frame 0. A source that yields
/// nothing right after a rewind is reported as empty rather than looping
/// forever.
pub struct LoopingReader {
    inner: Box<dyn VideoReader>,
    source: Option<VideoSource>,
    restarts: usize,
}

impl LoopingReader {
    pub fn new(inner: Box<dyn VideoReader>) -> Self {
        Self {
            inner,
            source: None,
            restarts: 0,
        }
    }

    pub fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, VideoError> {
        let metadata = self.inner.open(source)?;
        self.source = Some(source.clone());
        self.restarts = 0;
        Ok(metadata)
    }

    /// Returns the next frame, restarting playback at end-of-stream.
    pub fn produce_next_frame(&mut self) -> Result<Frame, VideoError> {
        if let Some(frame) = self.inner.next_frame()? {
            return Ok(frame);
        }

        log::info!("End of video. Restarting...");
        self.inner.rewind()?;
        self.restarts += 1;

        self.inner.next_frame()?.ok_or_else(|| {
            VideoError::EmptySource(
                self.source
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            )
        })
    }

    /// How many times playback has wrapped around.
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    pub fn close(&mut self) {
        self.inner.close();
    }
}
