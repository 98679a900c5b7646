pub mod landmark_annotator;
