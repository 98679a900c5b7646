use crate::shared::frame::{Frame, PixelOrder};
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::video_source::VideoSource;
use crate::video::domain::video_reader::{VideoError, VideoReader};

/// Serves a still image as a one-frame video.
///
/// Wrapped in a `LoopingReader`, the same image is produced on every
/// iteration, which keeps the rest of the pipeline unaware of the
/// difference between a picture and a clip.
pub struct StillImageReader {
    pixels: Option<Vec<u8>>,
    width: u32,
    height: u32,
    consumed: bool,
}

impl StillImageReader {
    pub fn new() -> Self {
        Self {
            pixels: None,
            width: 0,
            height: 0,
            consumed: false,
        }
    }
}

impl Default for StillImageReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for StillImageReader {
    fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, VideoError> {
        let VideoSource::File(path) = source else {
            return Err(VideoError::unavailable(source, "not an image file"));
        };

        let img = image::open(path)
            .map_err(|e| VideoError::unavailable(source, e))?
            .to_rgb8();
        let (width, height) = img.dimensions();

        self.pixels = Some(img.into_raw());
        self.width = width;
        self.height = height;
        self.consumed = false;

        Ok(VideoMetadata {
            width,
            height,
            fps: 0.0,
            total_frames: 1,
            codec: String::new(),
            source: source.clone(),
        })
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        let Some(pixels) = self.pixels.as_ref() else {
            return Err(VideoError::NotOpened);
        };
        if self.consumed {
            return Ok(None);
        }
        self.consumed = true;
        let frame =
            Frame::new(pixels.clone(), self.width, self.height, 3, 0).with_order(PixelOrder::Rgb);
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<(), VideoError> {
        if self.pixels.is_none() {
            return Err(VideoError::NotOpened);
        }
        self.consumed = false;
        Ok(())
    }

    fn close(&mut self) {
        self.pixels = None;
        self.consumed = false;
    }
}
