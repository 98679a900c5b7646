pub mod cancellation;
pub mod config;
pub mod constants;
pub mod frame;
pub mod frame_buffer;
pub mod landmark;
pub mod model_resolver;
pub mod video_metadata;
pub mod video_source;
