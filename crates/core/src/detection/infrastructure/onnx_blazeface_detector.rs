//! BlazeFace short-range face detector on ONNX Runtime.
//!
//! Only used to locate faces for the face-mesh model; no tracking and no
//! keypoints are kept.
use std::path::Path;

use crate::detection::domain::face_detector::{FaceBox, FaceDetector};
use crate::detection::infrastructure::onnx_face_mesh_extractor::ExtractorError;
use crate::detection::infrastructure::onnx_session::load_session;
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.3;

/// Anchors of the short-range model: 16x16x2 + 8x8x6.
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let input_tensor = preprocess(frame, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors [1, 896, 16], classificators [1, 896, 1]
        if outputs.len() < 2 {
            return Err(ExtractorError::MissingOutput {
                model: "BlazeFace",
                expected: 2,
                actual: outputs.len(),
            }
            .into());
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or(ExtractorError::NonContiguous)?;
        let score_data = scores.as_slice().ok_or(ExtractorError::NonContiguous)?;

        let mut raw = decode_boxes(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence as f32,
            frame.width(),
            frame.height(),
        );
        Ok(nms(&mut raw, NMS_IOU_THRESH))
    }
}

/// Resize to `size x size` RGB, normalized to [0,1], NCHW.
///
/// Sampling goes through `rgb_at` so BGR frames are fed in RGB order.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src_w = frame.width();
    let src_h = frame.height();
    let s = size as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as u32).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as u32).min(src_w - 1);
            let rgb = frame.rgb_at(src_x, src_y).unwrap_or([0, 0, 0]);
            for c in 0..3 {
                tensor[[0, c, y, x]] = rgb[c] as f32 / 255.0;
            }
        }
    }
    tensor
}

fn decode_boxes(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    fw: u32,
    fh: u32,
) -> Vec<FaceBox> {
    let mut boxes = Vec::new();
    let num_anchors = anchors.len().min(NUM_ANCHORS);

    for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }
        let offset = i * REGRESSOR_STRIDE;
        if offset + 4 > reg_data.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = anchor[0] + reg_data[offset] / INPUT_SIZE as f32;
        let cy = anchor[1] + reg_data[offset + 1] / INPUT_SIZE as f32;
        let w = reg_data[offset + 2] / INPUT_SIZE as f32;
        let h = reg_data[offset + 3] / INPUT_SIZE as f32;

        boxes.push(FaceBox {
            x1: ((cx - w / 2.0) * fw as f32).max(0.0) as f64,
            y1: ((cy - h / 2.0) * fh as f32).max(0.0) as f64,
            x2: ((cx + w / 2.0) * fw as f32).min(fw as f32) as f64,
            y2: ((cy + h / 2.0) * fh as f32).min(fh as f32) as f64,
            score: score as f64,
        });
    }
    boxes
}

/// Anchor centers for the short-range model: two feature maps (16x16 with
/// 2 anchors per cell, 8x8 with 6).
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, per_cell) in &strides {
        let grid = INPUT_SIZE as usize / stride;
        for y in 0..grid {
            for x in 0..grid {
                let cx = (x as f32 + 0.5) / grid as f32;
                let cy = (y as f32 + 0.5) / grid as f32;
                for _ in 0..per_cell {
                    anchors.push([cx, cy]);
                }
            }
        }
    }
    anchors
}

/// Greedy non-maximum suppression; the result is sorted by score.
fn nms(boxes: &mut [FaceBox], iou_thresh: f64) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; boxes.len()];
    for i in 0..boxes.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(boxes[i]);
        for j in (i + 1)..boxes.len() {
            if !suppressed[j] && iou(&boxes[i], &boxes[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn iou(a: &FaceBox, b: &FaceBox) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = a.width() * a.height();
    let area_b = b.width() * b.height();
    inter / (area_a + area_b - inter)
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::PixelOrder;
    use approx::assert_relative_eq;

    fn face(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> FaceBox {
        FaceBox {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    #[test]
    fn test_preprocess_shape() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let tensor = preprocess(&frame, 128);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_normalized() {
        let frame = Frame::new(vec![255u8; 50 * 50 * 3], 50, 50, 3, 0);
        let tensor = preprocess(&frame, 128);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 1.0, epsilon = 0.01);
    }

    #[test]
    fn test_preprocess_reads_bgr_as_rgb() {
        // Stored as BGR: blue byte first.
        let data = [10u8, 20, 30].repeat(4);
        let frame = Frame::new(data, 2, 2, 3, 0).with_order(PixelOrder::Bgr);
        let tensor = preprocess(&frame, 4);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 30.0 / 255.0);
        assert_relative_eq!(tensor[[0, 2, 0, 0]], 10.0 / 255.0);
    }

    #[test]
    fn test_generate_anchors_count() {
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_sigmoid() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_decode_boxes_filters_by_confidence() {
        let anchors = vec![[0.5, 0.5], [0.25, 0.25]];
        let mut reg = vec![0.0f32; 2 * REGRESSOR_STRIDE];
        // Anchor 0: 64x64 box (in model pixels) centered on the anchor.
        reg[2] = 64.0;
        reg[3] = 64.0;
        let scores = vec![5.0, -5.0];

        let boxes = decode_boxes(&reg, &scores, &anchors, 0.5, 256, 256);
        assert_eq!(boxes.len(), 1);
        assert_relative_eq!(boxes[0].x1, 64.0, epsilon = 1e-3);
        assert_relative_eq!(boxes[0].x2, 192.0, epsilon = 1e-3);
        assert!(boxes[0].score > 0.99);
    }

    #[test]
    fn test_decode_boxes_clamps_to_frame() {
        let anchors = vec![[0.0, 0.0]];
        let mut reg = vec![0.0f32; REGRESSOR_STRIDE];
        reg[2] = 64.0;
        reg[3] = 64.0;
        let boxes = decode_boxes(&reg, &[5.0], &anchors, 0.5, 100, 100);
        assert_eq!(boxes[0].x1, 0.0);
        assert_eq!(boxes[0].y1, 0.0);
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let mut boxes = vec![
            face(0.0, 0.0, 100.0, 100.0, 0.7),
            face(5.0, 5.0, 105.0, 105.0, 0.9),
        ];
        let kept = nms(&mut boxes, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_separate_sorted_by_score() {
        let mut boxes = vec![
            face(0.0, 0.0, 50.0, 50.0, 0.6),
            face(200.0, 200.0, 250.0, 250.0, 0.8),
        ];
        let kept = nms(&mut boxes, 0.3);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].score, 0.8);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = face(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = face(5.0, 5.0, 15.0, 15.0, 1.0);
        assert_relative_eq!(iou(&a, &b), 25.0 / 175.0, epsilon = 1e-9);
    }
}
