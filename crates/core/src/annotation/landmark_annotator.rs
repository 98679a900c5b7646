//! Draws landmark markers onto frames for the local debug view.
use crate::shared::frame::Frame;
use crate::shared::landmark::FaceLandmarks;

/// Marker appearance. Colors are `[r, g, b]`; the frame's pixel order is
/// applied when writing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerStyle {
    pub radius: u32,
    pub color: [u8; 3],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 2,
            color: [0, 255, 0],
        }
    }
}

/// Draws a filled circle for every landmark of every face.
///
/// Positions are `x * width`, `y * height` truncated to integers. Circles
/// are clipped at the frame edges. Returns how many markers had their
/// center inside the frame.
pub fn annotate(frame: &mut Frame, faces: &[FaceLandmarks], style: &MarkerStyle) -> usize {
    let (w, h) = (frame.width(), frame.height());
    let mut drawn = 0;
    for face in faces {
        for point in face.points() {
            let (cx, cy) = point.to_pixel(w, h);
            if (0..w as i64).contains(&cx) && (0..h as i64).contains(&cy) {
                drawn += 1;
            }
            fill_circle(frame, cx, cy, style.radius as i64, style.color);
        }
    }
    drawn
}

fn fill_circle(frame: &mut Frame, cx: i64, cy: i64, radius: i64, color: [u8; 3]) {
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    let r2 = radius * radius;
    for dy in -radius..=radius {
        let y = cy + dy;
        if y < 0 || y >= h {
            continue;
        }
        for dx in -radius..=radius {
            let x = cx + dx;
            if x < 0 || x >= w || dx * dx + dy * dy > r2 {
                continue;
            }
            frame.put_rgb(x as u32, y as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::MESH_LANDMARK_COUNT;
    use crate::shared::frame::PixelOrder;
    use crate::shared::landmark::LandmarkPoint;
    use rstest::rstest;

    const GREEN: [u8; 3] = [0, 255, 0];

    fn blank(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 3, 0)
    }

    /// Points on a grid spaced far enough apart that markers never overlap.
    fn grid_points(n: usize, cols: usize, spacing: u32, width: u32, height: u32) -> FaceLandmarks {
        let points = (0..n)
            .map(|i| {
                let px = 5 + (i % cols) as u32 * spacing;
                let py = 5 + (i / cols) as u32 * spacing;
                LandmarkPoint::new(
                    (px as f32 + 0.5) / width as f32,
                    (py as f32 + 0.5) / height as f32,
                    0.0,
                )
            })
            .collect::<Vec<_>>();
        FaceLandmarks::new(points)
    }

    fn green_pixels(frame: &Frame) -> usize {
        let mut count = 0;
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                if frame.rgb_at(x, y) == Some(GREEN) {
                    count += 1;
                }
            }
        }
        count
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(MESH_LANDMARK_COUNT)]
    fn test_draws_exactly_n_markers(#[case] n: usize) {
        let (w, h) = (240, 240);
        let mut frame = blank(w, h);
        let face = grid_points(n, 22, 10, w, h);

        let drawn = annotate(&mut frame, &[face.clone()], &MarkerStyle::default());
        assert_eq!(drawn, n);

        // A radius-2 disc covers 13 pixels; markers are disjoint.
        assert_eq!(green_pixels(&frame), n * 13);
        for point in face.points() {
            let (x, y) = point.to_pixel(w, h);
            assert_eq!(frame.rgb_at(x as u32, y as u32), Some(GREEN));
        }
    }

    #[test]
    fn test_pixel_position_is_truncated() {
        let mut frame = blank(100, 50);
        let face = FaceLandmarks::new(vec![LandmarkPoint::new(0.259, 0.499, 0.0)]);
        annotate(&mut frame, &[face], &MarkerStyle::default());
        // 25.9 -> 25, 24.95 -> 24
        assert_eq!(frame.rgb_at(25, 24), Some(GREEN));
        assert_eq!(frame.rgb_at(27, 24), Some(GREEN));
        assert_eq!(frame.rgb_at(28, 24), Some([0, 0, 0]));
        assert_eq!(frame.rgb_at(24, 27), Some([0, 0, 0]));
    }

    #[test]
    fn test_markers_across_faces_are_counted() {
        let mut frame = blank(100, 100);
        let a = FaceLandmarks::new(vec![LandmarkPoint::new(0.1, 0.1, 0.0)]);
        let b = FaceLandmarks::new(vec![
            LandmarkPoint::new(0.5, 0.5, 0.0),
            LandmarkPoint::new(0.9, 0.9, 0.0),
        ]);
        assert_eq!(annotate(&mut frame, &[a, b], &MarkerStyle::default()), 3);
    }

    #[test]
    fn test_edge_marker_is_clipped() {
        let mut frame = blank(10, 10);
        let face = FaceLandmarks::new(vec![LandmarkPoint::new(0.0, 0.0, 0.0)]);
        assert_eq!(annotate(&mut frame, &[face], &MarkerStyle::default()), 1);
        // Quarter disc: (0,0),(1,0),(2,0),(0,1),(1,1),(0,2)
        assert_eq!(green_pixels(&frame), 6);
    }

    #[test]
    fn test_off_frame_point_is_not_counted() {
        let mut frame = blank(10, 10);
        let face = FaceLandmarks::new(vec![
            LandmarkPoint::new(1.5, 0.5, 0.0),
            LandmarkPoint::new(-0.5, 0.5, 0.0),
        ]);
        assert_eq!(annotate(&mut frame, &[face], &MarkerStyle::default()), 0);
        assert_eq!(green_pixels(&frame), 0);
    }

    #[test]
    fn test_respects_bgr_order() {
        let mut frame = blank(10, 10).with_order(PixelOrder::Bgr);
        let style = MarkerStyle {
            radius: 0,
            color: [255, 0, 0],
        };
        let face = FaceLandmarks::new(vec![LandmarkPoint::new(0.55, 0.55, 0.0)]);
        annotate(&mut frame, &[face], &style);
        let offset = (5 * 10 + 5) * 3;
        assert_eq!(&frame.data()[offset..offset + 3], &[0, 0, 255]);
        assert_eq!(frame.rgb_at(5, 5), Some([255, 0, 0]));
    }
}
