use serde::{Deserialize, Serialize};

use crate::shared::landmark::{FaceLandmarks, LandmarkPoint};

/// How multiple faces are laid out in one landmark message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadLayout {
    /// One flat list: every face's points concatenated in detection order.
    #[default]
    Merged,
    /// A list of point lists, one per face.
    PerFace,
}

impl std::str::FromStr for PayloadLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merged" => Ok(PayloadLayout::Merged),
            "per-face" => Ok(PayloadLayout::PerFace),
            other => Err(format!("unknown payload layout: {other}")),
        }
    }
}

/// Serializes the landmark sets of one frame as a JSON array.
///
/// No faces gives `[]` in either layout.
pub fn encode_payload(
    faces: &[FaceLandmarks],
    layout: PayloadLayout,
) -> Result<String, serde_json::Error> {
    match layout {
        PayloadLayout::Merged => {
            let points: Vec<&LandmarkPoint> = faces.iter().flat_map(|f| f.points()).collect();
            serde_json::to_string(&points)
        }
        PayloadLayout::PerFace => serde_json::to_string(faces),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn faces() -> Vec<FaceLandmarks> {
        vec![
            FaceLandmarks::new(vec![
                LandmarkPoint::new(0.5, 0.25, 0.0),
                LandmarkPoint::new(0.75, 0.5, -0.125),
            ]),
            FaceLandmarks::new(vec![LandmarkPoint::new(0.125, 1.0, 0.5)]),
        ]
    }

    #[rstest]
    #[case(PayloadLayout::Merged)]
    #[case(PayloadLayout::PerFace)]
    fn test_no_faces_is_empty_list(#[case] layout: PayloadLayout) {
        assert_eq!(encode_payload(&[], layout).unwrap(), "[]");
    }

    #[test]
    fn test_merged_concatenates_in_detection_order() {
        let json = encode_payload(&faces(), PayloadLayout::Merged).unwrap();
        assert_eq!(
            json,
            r#"[{"x":0.5,"y":0.25,"z":0.0},{"x":0.75,"y":0.5,"z":-0.125},{"x":0.125,"y":1.0,"z":0.5}]"#
        );
    }

    #[test]
    fn test_per_face_nests_lists() {
        let json = encode_payload(&faces(), PayloadLayout::PerFace).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let outer = value.as_array().unwrap();
        assert_eq!(outer.len(), 2);
        assert_eq!(outer[0].as_array().unwrap().len(), 2);
        assert_eq!(outer[1][0]["y"], 1.0);
    }

    #[rstest]
    #[case("merged", PayloadLayout::Merged)]
    #[case("per-face", PayloadLayout::PerFace)]
    fn test_layout_from_str(#[case] input: &str, #[case] expected: PayloadLayout) {
        assert_eq!(input.parse::<PayloadLayout>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_layout_is_rejected() {
        assert!("stacked".parse::<PayloadLayout>().is_err());
    }
}
