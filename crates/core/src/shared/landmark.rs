use serde::{Deserialize, Serialize};

/// One tracked facial point, normalized to the frame.
///
/// `x` and `y` are fractions of frame width and height; `z` is depth on
/// roughly the same scale as `x` (smaller is closer to the camera).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Projects the point into pixel space, truncating toward zero.
    pub fn to_pixel(&self, width: u32, height: u32) -> (i64, i64) {
        (
            (self.x * width as f32) as i64,
            (self.y * height as f32) as i64,
        )
    }
}

/// The ordered landmark set of one detected face.
///
/// The order is the model's fixed indexing of facial regions and must be
/// preserved all the way to the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    points: Vec<LandmarkPoint>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<Vec<LandmarkPoint>> for FaceLandmarks {
    fn from(points: Vec<LandmarkPoint>) -> Self {
        Self::new(points)
    }
}
