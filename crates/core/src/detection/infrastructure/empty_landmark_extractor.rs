use crate::detection::domain::landmark_extractor::LandmarkExtractor;
use crate::shared::frame::Frame;
use crate::shared::landmark::FaceLandmarks;

/// Extractor that never finds a face.
///
/// Used when model loading is disabled, so the stream and the display can
/// run without any model files.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyLandmarkExtractor;

impl LandmarkExtractor for EmptyLandmarkExtractor {
    fn extract(
        &mut self,
        _frame: &Frame,
    ) -> Result<Vec<FaceLandmarks>, Box<dyn std::error::Error>> {
        Ok(Vec::new())
    }
}
