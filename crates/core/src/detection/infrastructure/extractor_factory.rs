use crate::detection::domain::landmark_extractor::LandmarkExtractor;
use crate::shared::config::ModelConfig;
use crate::shared::constants::{DETECTOR_MODEL_NAME, MESH_MODEL_NAME};
use crate::shared::model_resolver::{self, ModelLocation, ProgressFn};

use super::empty_landmark_extractor::EmptyLandmarkExtractor;
use super::onnx_blazeface_detector::OnnxBlazefaceDetector;
use super::onnx_face_mesh_extractor::OnnxFaceMeshExtractor;

/// Builds the landmark extractor described by `config`.
///
/// With models disabled this is an [`EmptyLandmarkExtractor`]; otherwise
/// both model files are resolved (downloading only when a URL is
/// configured) and loaded into ONNX sessions.
pub fn create_extractor(
    config: &ModelConfig,
) -> Result<Box<dyn LandmarkExtractor>, Box<dyn std::error::Error>> {
    if config.disabled {
        log::info!("Landmark models disabled, streaming empty landmark lists");
        return Ok(Box::new(EmptyLandmarkExtractor));
    }

    let detector_path = model_resolver::resolve(
        &ModelLocation {
            name: DETECTOR_MODEL_NAME,
            explicit_path: config.detector_path.as_deref(),
            bundled_dir: config.models_dir.as_deref(),
            url: config.detector_url.as_deref(),
        },
        Some(download_progress(DETECTOR_MODEL_NAME)),
    )?;
    let mesh_path = model_resolver::resolve(
        &ModelLocation {
            name: MESH_MODEL_NAME,
            explicit_path: config.mesh_path.as_deref(),
            bundled_dir: config.models_dir.as_deref(),
            url: config.mesh_url.as_deref(),
        },
        Some(download_progress(MESH_MODEL_NAME)),
    )?;

    log::info!(
        "Loading face detector {} and face mesh {}",
        detector_path.display(),
        mesh_path.display()
    );
    let detector = OnnxBlazefaceDetector::new(&detector_path, config.confidence)?;
    let extractor = OnnxFaceMeshExtractor::new(Box::new(detector), &mesh_path, config.max_faces)?;
    Ok(Box::new(extractor))
}

fn download_progress(name: &'static str) -> ProgressFn {
    Box::new(move |downloaded, total| {
        if total > 0 {
            log::debug!("Downloading {name}: {downloaded}/{total} bytes");
        } else {
            log::debug!("Downloading {name}: {downloaded} bytes");
        }
    })
}
