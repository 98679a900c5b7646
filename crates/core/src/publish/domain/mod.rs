pub mod emission_gate;
pub mod landmark_sink;
pub mod payload;
pub mod session_registry;
