pub mod pause_gate;
pub mod pipeline_logger;
pub mod production_supervisor;
pub mod stream_landmarks_use_case;
