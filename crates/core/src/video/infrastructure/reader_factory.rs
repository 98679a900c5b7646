use crate::shared::video_source::VideoSource;
use crate::video::domain::video_reader::VideoReader;

use super::ffmpeg_reader::FfmpegReader;
use super::still_image_reader::StillImageReader;

/// Picks the reader able to decode `source`: still images get the image
/// decoder, everything else (clips and capture devices) goes to ffmpeg.
pub fn create_reader(source: &VideoSource) -> Box<dyn VideoReader> {
    if source.is_image() {
        log::debug!("Reading {source} as a still image");
        Box::new(StillImageReader::new())
    } else {
        Box::new(FfmpegReader::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_reader::VideoError;
    use std::path::PathBuf;

    #[test]
    fn test_image_source_uses_still_image_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        image::RgbImage::new(3, 2).save(&path).unwrap();

        let source = VideoSource::File(path);
        let mut reader = create_reader(&source);
        let meta = reader.open(&source).unwrap();
        assert_eq!(meta.total_frames, 1);
        assert_eq!((meta.width, meta.height), (3, 2));
    }

    #[test]
    fn test_missing_clip_is_source_unavailable() {
        let source = VideoSource::File(PathBuf::from("/nonexistent/clip.mp4"));
        let mut reader = create_reader(&source);
        assert!(matches!(
            reader.open(&source),
            Err(VideoError::SourceUnavailable { .. })
        ));
    }
}
