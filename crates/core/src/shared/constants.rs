use std::time::Duration;

pub const DETECTOR_MODEL_NAME: &str = "blazeface_128.onnx";
pub const MESH_MODEL_NAME: &str = "face_mesh_192.onnx";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Annotated frames kept for the local display before the oldest is dropped.
pub const FRAME_BUFFER_CAPACITY: usize = 5;

/// Upper bound on landmark messages per second, per session.
pub const DEFAULT_EMIT_RATE_HZ: f64 = 30.0;

/// Slowest accepted emit rate: one message every ~17 minutes.
pub const MIN_EMIT_RATE_HZ: f64 = 0.001;

/// Pause between production iterations.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(10);

/// Socket.IO event carrying landmark lists.
pub const LANDMARK_EVENT: &str = "mediapipe_data";

pub const WINDOW_TITLE: &str = "FaceMesh Detection";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Points produced per face by the face-mesh model.
pub const MESH_LANDMARK_COUNT: usize = 468;

/// Headless display: frames between log lines and snapshot writes.
pub const DEFAULT_SNAPSHOT_EVERY: usize = 30;

/// Queued outbound messages per session before frames are dropped.
pub const SESSION_CHANNEL_CAPACITY: usize = 16;
