use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::constants::IMAGE_EXTENSIONS;

/// Where frames come from: a file on disk or a capture device index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VideoSource {
    File(PathBuf),
    Device(u32),
}

impl VideoSource {
    /// True for files whose extension names a still image format.
    pub fn is_image(&self) -> bool {
        match self {
            VideoSource::File(path) => is_image_path(path),
            VideoSource::Device(_) => false,
        }
    }
}

impl Default for VideoSource {
    fn default() -> Self {
        VideoSource::Device(0)
    }
}

impl FromStr for VideoSource {
    type Err = String;

    /// A string made only of ASCII digits is a device index; anything else
    /// is a path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("video source must not be empty".to_string());
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return trimmed
                .parse::<u32>()
                .map(VideoSource::Device)
                .map_err(|e| format!("invalid device index '{trimmed}': {e}"));
        }
        Ok(VideoSource::File(PathBuf::from(trimmed)))
    }
}

impl TryFrom<String> for VideoSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VideoSource> for String {
    fn from(value: VideoSource) -> Self {
        value.to_string()
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoSource::File(path) => write!(f, "{}", path.display()),
            VideoSource::Device(index) => write!(f, "{index}"),
        }
    }
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
