use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::video_source::VideoSource;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("unable to open video source {source_desc}: {reason}")]
    SourceUnavailable { source_desc: String, reason: String },
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("video source {0} produced no frames")]
    EmptySource(String),
    #[error("reader used before open")]
    NotOpened,
}

impl VideoError {
    pub fn unavailable(source: &VideoSource, reason: impl ToString) -> Self {
        VideoError::SourceUnavailable {
            source_desc: source.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Reads frames sequentially from a video file, still image or device.
///
/// Implementations handle I/O details (codec, container format, capture
/// API) while the pipeline works with the abstract `Frame` and
/// `VideoMetadata` types.
pub trait VideoReader: Send {
    fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, VideoError>;

    /// Decodes the next frame; `Ok(None)` signals end-of-stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError>;

    /// Repositions at the first frame so the next frame has index 0.
    fn rewind(&mut self) -> Result<(), VideoError>;

    /// Releases any resources held by the reader. Idempotent.
    fn close(&mut self);
}
