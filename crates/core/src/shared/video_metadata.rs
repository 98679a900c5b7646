use crate::shared::video_source::VideoSource;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// 0.0 when the container does not report a rate (live devices, stills).
    pub fps: f64,
    /// 0 when unknown, which is normal for capture devices.
    pub total_frames: usize,
    pub codec: String,
    pub source: VideoSource,
}

impl VideoMetadata {
    pub fn is_live(&self) -> bool {
        matches!(self.source, VideoSource::Device(_))
    }
}
