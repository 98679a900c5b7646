pub mod face_detector;
pub mod landmark_extractor;
