pub mod empty_landmark_extractor;
pub mod extractor_factory;
pub mod onnx_blazeface_detector;
pub mod onnx_face_mesh_extractor;
pub mod onnx_session;
