use std::path::PathBuf;

use clap::Args;

use facemesh_stream_core::publish::domain::payload::PayloadLayout;
use facemesh_stream_core::shared::config::{ConfigError, StreamConfig};
use facemesh_stream_core::shared::video_source::VideoSource;

/// Flags accepted by every binary. Each one overrides the matching field
/// of the loaded config file.
#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Camera index or video/image file.
    #[arg(long)]
    pub source: Option<VideoSource>,

    /// JSON config file (defaults to the per-user config if present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    pub bind: Option<String>,

    /// Maximum landmark messages per second per client.
    #[arg(long)]
    pub emit_rate: Option<f64>,

    /// Annotated frames kept for the display.
    #[arg(long)]
    pub buffer_capacity: Option<usize>,

    /// Do not mirror frames horizontally.
    #[arg(long)]
    pub no_mirror: bool,

    /// Landmark payload shape: merged or per-face.
    #[arg(long)]
    pub payload_layout: Option<PayloadLayout>,

    /// BlazeFace detector ONNX model.
    #[arg(long)]
    pub detector_model: Option<PathBuf>,

    /// Face-mesh ONNX model.
    #[arg(long)]
    pub mesh_model: Option<PathBuf>,

    /// Directory searched for model files.
    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Maximum number of faces to extract landmarks for.
    #[arg(long)]
    pub max_faces: Option<usize>,

    /// Stream empty landmark lists without loading any model.
    #[arg(long)]
    pub no_model: bool,

    /// Write the latest annotated frame to this directory (headless only).
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Frames between snapshot writes (headless only).
    #[arg(long)]
    pub snapshot_every: Option<usize>,
}

impl StreamArgs {
    /// Loads the config file, applies the flags on top and validates.
    pub fn into_config(self) -> Result<StreamConfig, ConfigError> {
        let mut config = StreamConfig::load(self.config.as_deref())?;
        apply_overrides(&mut config, self);
        config.validate()?;
        Ok(config)
    }
}

pub fn apply_overrides(config: &mut StreamConfig, args: StreamArgs) {
    if let Some(source) = args.source {
        config.source = source;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(rate) = args.emit_rate {
        config.emit_rate_hz = rate;
    }
    if let Some(capacity) = args.buffer_capacity {
        config.buffer_capacity = capacity;
    }
    if args.no_mirror {
        config.mirror = false;
    }
    if let Some(layout) = args.payload_layout {
        config.payload_layout = layout;
    }
    if let Some(dir) = args.snapshot_dir {
        config.snapshot_dir = Some(dir);
    }
    if let Some(every) = args.snapshot_every {
        config.snapshot_every = every;
    }

    let models = &mut config.models;
    if args.detector_model.is_some() {
        models.detector_path = args.detector_model;
    }
    if args.mesh_model.is_some() {
        models.mesh_path = args.mesh_model;
    }
    if args.models_dir.is_some() {
        models.models_dir = args.models_dir;
    }
    if let Some(confidence) = args.confidence {
        models.confidence = confidence;
    }
    if let Some(max_faces) = args.max_faces {
        models.max_faces = max_faces;
    }
    if args.no_model {
        models.disabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        stream: StreamArgs,
    }

    fn parse(args: &[&str]) -> StreamArgs {
        let mut argv = vec!["facemesh-stream"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().stream
    }

    #[test]
    fn test_no_flags_keep_config_values() {
        let mut config = StreamConfig {
            bind: "0.0.0.0:9000".to_string(),
            ..Default::default()
        };
        apply_overrides(&mut config, parse(&[]));
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert!(config.mirror);
        assert!(!config.models.disabled);
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = StreamConfig::default();
        apply_overrides(
            &mut config,
            parse(&[
                "--source",
                "clip.mp4",
                "--emit-rate",
                "10",
                "--no-mirror",
                "--payload-layout",
                "per-face",
                "--max-faces",
                "2",
                "--no-model",
                "--snapshot-every",
                "5",
            ]),
        );
        assert_eq!(config.source, VideoSource::File(PathBuf::from("clip.mp4")));
        assert_eq!(config.emit_rate_hz, 10.0);
        assert!(!config.mirror);
        assert_eq!(config.payload_layout, PayloadLayout::PerFace);
        assert_eq!(config.models.max_faces, 2);
        assert!(config.models.disabled);
        assert_eq!(config.snapshot_every, 5);
    }

    #[test]
    fn test_device_index_source() {
        let mut config = StreamConfig::default();
        apply_overrides(&mut config, parse(&["--source", "1"]));
        assert_eq!(config.source, VideoSource::Device(1));
    }

    #[test]
    fn test_unknown_payload_layout_is_rejected() {
        let result = TestCli::try_parse_from(["facemesh-stream", "--payload-layout", "nested"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_config_reads_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"bind": "0.0.0.0:7000", "emit_rate_hz": 15.0}"#).unwrap();

        let config = parse(&["--config", path.to_str().unwrap(), "--emit-rate", "5"])
            .into_config()
            .unwrap();
        assert_eq!(config.bind, "0.0.0.0:7000");
        assert_eq!(config.emit_rate_hz, 5.0);
    }

    #[test]
    fn test_into_config_rejects_invalid_flag_values() {
        let result = parse(&["--emit-rate", "0"]).into_config();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
