use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::publish::domain::payload::PayloadLayout;
use crate::shared::constants::{
    DEFAULT_BIND_ADDR, DEFAULT_EMIT_RATE_HZ, DEFAULT_FRAME_DELAY, DEFAULT_SNAPSHOT_EVERY,
    FRAME_BUFFER_CAPACITY, MIN_EMIT_RATE_HZ,
};
use crate::shared::video_source::VideoSource;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Model files and detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Explicit BlazeFace model path; otherwise resolved by name.
    pub detector_path: Option<PathBuf>,
    pub detector_url: Option<String>,
    /// Explicit face-mesh model path; otherwise resolved by name.
    pub mesh_path: Option<PathBuf>,
    pub mesh_url: Option<String>,
    /// Extra directory searched after the user cache.
    pub models_dir: Option<PathBuf>,
    pub confidence: f64,
    pub max_faces: usize,
    /// Skip model loading entirely and stream empty landmark lists.
    pub disabled: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            detector_path: None,
            detector_url: None,
            mesh_path: None,
            mesh_url: None,
            models_dir: None,
            confidence: 0.5,
            max_faces: 1,
            disabled: false,
        }
    }
}

/// Runtime settings for the streaming server.
///
/// Loaded from JSON; every field is optional in the file and falls back to
/// its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub source: VideoSource,
    pub bind: String,
    pub emit_rate_hz: f64,
    pub buffer_capacity: usize,
    pub frame_delay_ms: u64,
    /// Mirror frames horizontally before extraction (selfie view).
    pub mirror: bool,
    pub payload_layout: PayloadLayout,
    pub ping_interval_ms: u64,
    pub ping_timeout_ms: u64,
    /// Headless display: write the latest annotated frame here.
    pub snapshot_dir: Option<PathBuf>,
    /// Headless display: frames between snapshot writes.
    pub snapshot_every: usize,
    pub models: ModelConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            source: VideoSource::default(),
            bind: DEFAULT_BIND_ADDR.to_string(),
            emit_rate_hz: DEFAULT_EMIT_RATE_HZ,
            buffer_capacity: FRAME_BUFFER_CAPACITY,
            frame_delay_ms: DEFAULT_FRAME_DELAY.as_millis() as u64,
            mirror: true,
            payload_layout: PayloadLayout::default(),
            ping_interval_ms: 25_000,
            ping_timeout_ms: 20_000,
            snapshot_dir: None,
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
            models: ModelConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Per-user config file location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceMeshStream").join("config.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `explicit` if given, else the per-user file if it exists, else
    /// defaults. An explicit path that cannot be read is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                log::info!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.emit_rate_hz.is_finite() && self.emit_rate_hz >= MIN_EMIT_RATE_HZ) {
            return Err(ConfigError::Invalid(format!(
                "emit rate must be at least {MIN_EMIT_RATE_HZ} Hz, got {}",
                self.emit_rate_hz
            )));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "buffer capacity must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.models.confidence) {
            return Err(ConfigError::Invalid(format!(
                "confidence must be between 0.0 and 1.0, got {}",
                self.models.confidence
            )));
        }
        if self.models.max_faces == 0 {
            return Err(ConfigError::Invalid(
                "max faces must be at least 1".to_string(),
            ));
        }
        if self.ping_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "ping interval must be positive".to_string(),
            ));
        }
        if self.ping_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "ping timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Minimum spacing between messages to one session. Rates below
    /// [`MIN_EMIT_RATE_HZ`] are clamped, so this never panics.
    pub fn emit_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.emit_rate_hz.max(MIN_EMIT_RATE_HZ))
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = StreamConfig::default();
        assert_eq!(config.source, VideoSource::Device(0));
        assert_eq!(config.bind, "127.0.0.1:5000");
        assert_eq!(config.buffer_capacity, 5);
        assert!(config.mirror);
        assert_eq!(config.payload_layout, PayloadLayout::Merged);
        assert_relative_eq!(config.emit_interval().as_secs_f64(), 1.0 / 30.0, epsilon = 1e-9);
        assert_eq!(config.frame_delay(), Duration::from_millis(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(
            &path,
            r#"{"source": "clip.mp4", "emit_rate_hz": 15, "models": {"max_faces": 2}}"#,
        )
        .unwrap();

        let config = StreamConfig::load(Some(&path)).unwrap();
        assert_eq!(config.source, VideoSource::File(PathBuf::from("clip.mp4")));
        assert_relative_eq!(config.emit_rate_hz, 15.0);
        assert_eq!(config.models.max_faces, 2);
        assert_relative_eq!(config.models.confidence, 0.5);
        assert_eq!(config.buffer_capacity, 5);
    }

    #[test]
    fn test_payload_layout_parses_kebab_case() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{"payload_layout": "per-face"}"#).unwrap();
        let config = StreamConfig::from_file(&path).unwrap();
        assert_eq!(config.payload_layout, PayloadLayout::PerFace);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = StreamConfig::load(Some(&tmp.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = StreamConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = StreamConfig {
            emit_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config = StreamConfig {
            buffer_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config = StreamConfig::default();
        config.models.confidence = 1.5;
        assert!(config.validate().is_err());

        config = StreamConfig::default();
        config.models.max_faces = 0;
        assert!(config.validate().is_err());

        config = StreamConfig {
            ping_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case(1e-30)]
    #[case(-5.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_unusable_emit_rate_is_rejected_and_interval_stays_finite(#[case] rate: f64) {
        let config = StreamConfig {
            emit_rate_hz: rate,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(config.emit_interval() <= Duration::from_secs_f64(1.0 / MIN_EMIT_RATE_HZ));
    }

    #[test]
    fn test_slowest_emit_rate_is_accepted() {
        let config = StreamConfig {
            emit_rate_hz: MIN_EMIT_RATE_HZ,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.emit_interval().as_secs_f64(), 1000.0, epsilon = 1e-6);
    }
}
