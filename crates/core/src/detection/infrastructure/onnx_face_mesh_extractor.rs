use std::path::Path;

use thiserror::Error;

use crate::detection::domain::face_detector::{FaceBox, FaceDetector};
use crate::detection::domain::landmark_extractor::LandmarkExtractor;
use crate::detection::infrastructure::onnx_blazeface_detector::sigmoid;
use crate::detection::infrastructure::onnx_session::load_session;
use crate::shared::constants::MESH_LANDMARK_COUNT;
use crate::shared::frame::Frame;
use crate::shared::landmark::{FaceLandmarks, LandmarkPoint};

/// Face-mesh model input resolution.
const INPUT_SIZE: u32 = 192;

/// Detector boxes are tight around the face; the mesh model expects some
/// forehead and chin margin.
const CROP_SCALE: f64 = 1.5;

/// Minimum face-presence probability for a crop to yield landmarks.
const PRESENCE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("{model} model produced {actual} outputs, expected at least {expected}")]
    MissingOutput {
        model: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("face-mesh output has {actual} values, expected at least {expected}")]
    LandmarkShape { expected: usize, actual: usize },
    #[error("model output tensor is not contiguous")]
    NonContiguous,
}

/// Square region of the frame fed to the mesh model, in frame pixels.
///
/// May extend past the frame edges; samples outside the frame are black.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CropRect {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// 468-point face mesh: detector boxes are enlarged into square crops and
/// each crop is run through the mesh model.
pub struct OnnxFaceMeshExtractor {
    detector: Box<dyn FaceDetector>,
    session: ort::session::Session,
    max_faces: usize,
}

impl OnnxFaceMeshExtractor {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        mesh_model_path: &Path,
        max_faces: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(mesh_model_path)?;
        Ok(Self {
            detector,
            session,
            max_faces: max_faces.max(1),
        })
    }

    fn run_mesh(
        &mut self,
        frame: &Frame,
        crop: CropRect,
    ) -> Result<Option<FaceLandmarks>, Box<dyn std::error::Error>> {
        let tensor = crop_to_tensor(frame, crop, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() < 1 {
            return Err(ExtractorError::MissingOutput {
                model: "face-mesh",
                expected: 1,
                actual: 0,
            }
            .into());
        }

        // Second output, when present, is the face-presence logit.
        if outputs.len() >= 2 {
            let presence = outputs[1].try_extract_array::<f32>()?;
            let logit = presence.iter().next().copied().unwrap_or(0.0);
            if sigmoid(logit) < PRESENCE_THRESHOLD {
                return Ok(None);
            }
        }

        let raw = outputs[0].try_extract_array::<f32>()?;
        let raw = raw.as_slice().ok_or(ExtractorError::NonContiguous)?;
        let landmarks = map_to_frame(raw, crop, INPUT_SIZE, frame.width(), frame.height())?;
        Ok(Some(landmarks))
    }
}

impl LandmarkExtractor for OnnxFaceMeshExtractor {
    fn extract(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<FaceLandmarks>, Box<dyn std::error::Error>> {
        let boxes = self.detector.detect(frame)?;
        let mut faces = Vec::with_capacity(boxes.len().min(self.max_faces));
        for face in boxes.iter().take(self.max_faces) {
            let crop = square_crop(face, CROP_SCALE);
            if let Some(landmarks) = self.run_mesh(frame, crop)? {
                faces.push(landmarks);
            }
        }
        Ok(faces)
    }
}

/// Square crop centered on the box, side = longest edge x `scale`.
pub(crate) fn square_crop(face: &FaceBox, scale: f64) -> CropRect {
    let (cx, cy) = face.center();
    let size = face.width().max(face.height()) * scale;
    CropRect {
        x: cx - size / 2.0,
        y: cy - size / 2.0,
        size,
    }
}

/// Samples `crop` into a `size x size` RGB tensor in [0,1], NCHW.
fn crop_to_tensor(frame: &Frame, crop: CropRect, size: u32) -> ndarray::Array4<f32> {
    let s = size as usize;
    let step = crop.size / size as f64;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (crop.y + (y as f64 + 0.5) * step).floor();
        for x in 0..s {
            let src_x = (crop.x + (x as f64 + 0.5) * step).floor();
            if src_x < 0.0 || src_y < 0.0 {
                continue;
            }
            let Some(rgb) = frame.rgb_at(src_x as u32, src_y as u32) else {
                continue;
            };
            for c in 0..3 {
                tensor[[0, c, y, x]] = rgb[c] as f32 / 255.0;
            }
        }
    }
    tensor
}

/// Converts model-space `(x, y, z)` triples into frame-normalized points.
///
/// `z` is scaled like `x`, so depth shares the horizontal unit.
fn map_to_frame(
    raw: &[f32],
    crop: CropRect,
    input_size: u32,
    frame_width: u32,
    frame_height: u32,
) -> Result<FaceLandmarks, ExtractorError> {
    let expected = MESH_LANDMARK_COUNT * 3;
    if raw.len() < expected {
        return Err(ExtractorError::LandmarkShape {
            expected,
            actual: raw.len(),
        });
    }

    let scale = crop.size / input_size as f64;
    let fw = frame_width as f64;
    let fh = frame_height as f64;
    let points = raw[..expected]
        .chunks_exact(3)
        .map(|p| {
            let x = (crop.x + p[0] as f64 * scale) / fw;
            let y = (crop.y + p[1] as f64 * scale) / fh;
            let z = p[2] as f64 * scale / fw;
            LandmarkPoint::new(x as f32, y as f32, z as f32)
        })
        .collect::<Vec<_>>();
    Ok(FaceLandmarks::new(points))
}
