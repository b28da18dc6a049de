//! Per-frame inputs and decoding of the detector's raw float buffers.

use crate::display::DisplayTransform;
use crate::geometry::{LineSegment, PixelPoint, Point};

/// Number of line slots in the detector's fixed-size output buffer.
pub const MAX_DETECTED_LINES: usize = 32;

/// Dimensions of the sensor image the detections were made on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageSize {
    /// Create a new `ImageSize`.
    ///
    /// # Errors
    /// Returns an error if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, String> {
        if width == 0 || height == 0 {
            return Err(format!("Image size must be non-zero (got {width}x{height})"));
        }
        Ok(Self { width, height })
    }
}

/// Everything the pipeline consumes for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput<'a> {
    /// Sensor image dimensions.
    pub image_size: ImageSize,
    /// Display transform for this frame, if the platform provided one.
    pub transform: Option<DisplayTransform>,
    /// Detected corners in pixel space, in any order.
    pub corners: Option<[PixelPoint; 4]>,
    /// Detected line segments in pixel space.
    pub lines: &'a [LineSegment<PixelPoint>],
}

impl<'a> FrameInput<'a> {
    /// A frame with no transform and no detections.
    #[must_use]
    pub fn new(image_size: ImageSize) -> Self {
        Self {
            image_size,
            transform: None,
            corners: None,
            lines: &[],
        }
    }

    /// Attach the frame's display transform.
    #[must_use]
    pub fn with_transform(mut self, transform: DisplayTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attach detected corners.
    #[must_use]
    pub fn with_corners(mut self, corners: [PixelPoint; 4]) -> Self {
        self.corners = Some(corners);
        self
    }

    /// Attach detected line segments.
    #[must_use]
    pub fn with_lines(mut self, lines: &'a [LineSegment<PixelPoint>]) -> Self {
        self.lines = lines;
        self
    }
}

fn finite_point(x: f32, y: f32) -> Option<PixelPoint> {
    (x.is_finite() && y.is_finite()).then(|| Point::new(f64::from(x), f64::from(y)))
}

/// Decode the detector's corner buffer: `[x0, y0, x1, y1, x2, y2, x3, y3]`.
///
/// # Errors
/// Returns an error if the buffer does not hold exactly 8 values or any
/// coordinate is not finite.
pub fn corners_from_raw(buf: &[f32]) -> Result<[PixelPoint; 4], String> {
    if buf.len() != 8 {
        return Err(format!(
            "Corner buffer must hold 8 values, got {}",
            buf.len()
        ));
    }
    let mut corners = [Point::default(); 4];
    for (i, (corner, xy)) in corners.iter_mut().zip(buf.chunks_exact(2)).enumerate() {
        *corner = finite_point(xy[0], xy[1])
            .ok_or_else(|| format!("Corner {i} is not finite: ({}, {})", xy[0], xy[1]))?;
    }
    Ok(corners)
}

/// Decode the first `count` segments of the detector's line buffer,
/// laid out as `[x1, y1, x2, y2]` per line.
///
/// # Errors
/// Returns an error if the buffer is shorter than `4 * count` or any
/// endpoint is not finite.
pub fn lines_from_raw(buf: &[f32], count: usize) -> Result<Vec<LineSegment<PixelPoint>>, String> {
    let required = count
        .checked_mul(4)
        .ok_or_else(|| format!("Line count {count} overflows the buffer size"))?;
    if buf.len() < required {
        return Err(format!(
            "Line buffer ({} values) is too small for {count} lines (required: {required})",
            buf.len()
        ));
    }
    buf[..required]
        .chunks_exact(4)
        .enumerate()
        .map(|(i, v)| {
            match (finite_point(v[0], v[1]), finite_point(v[2], v[3])) {
                (Some(a), Some(b)) => Ok(LineSegment::new(a, b)),
                _ => Err(format!("Line {i} has a non-finite endpoint")),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_size_validation() {
        assert!(ImageSize::new(640, 480).is_ok());
        assert!(ImageSize::new(0, 480).is_err());
        assert!(ImageSize::new(640, 0).is_err());
    }

    #[test]
    fn test_corners_from_raw() {
        let buf = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let corners = corners_from_raw(&buf).unwrap();
        assert_eq!(corners[0], Point::new(1.0, 2.0));
        assert_eq!(corners[3], Point::new(7.0, 8.0));
    }

    #[test]
    fn test_corners_from_raw_rejects_bad_buffers() {
        assert!(corners_from_raw(&[0.0; 6]).is_err());
        assert!(corners_from_raw(&[0.0; 9]).is_err());
        let mut buf = [0.0; 8];
        buf[5] = f32::NAN;
        let err = corners_from_raw(&buf).unwrap_err();
        assert!(err.contains("Corner 2"));
    }

    #[test]
    fn test_lines_from_raw() {
        let mut buf = [0.0f32; MAX_DETECTED_LINES * 4];
        buf[..8].copy_from_slice(&[0.0, 0.0, 10.0, 0.0, 5.0, 5.0, 5.0, 15.0]);
        let lines = lines_from_raw(&buf, 2).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].b, Point::new(5.0, 15.0));
        assert!(lines_from_raw(&buf, 0).unwrap().is_empty());
    }

    #[test]
    fn test_lines_from_raw_rejects_bad_buffers() {
        let buf = [0.0f32; 8];
        assert!(lines_from_raw(&buf, 3).is_err());
        assert!(lines_from_raw(&buf, usize::MAX).is_err());
        let buf = [0.0, 0.0, f32::INFINITY, 1.0];
        assert!(lines_from_raw(&buf, 1).is_err());
    }

    #[test]
    fn test_frame_input_builder() {
        let lines = [LineSegment::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0))];
        let input = FrameInput::new(ImageSize::new(4, 4).unwrap())
            .with_transform(DisplayTransform::identity())
            .with_lines(&lines);
        assert!(input.transform.is_some());
        assert!(input.corners.is_none());
        assert_eq!(input.lines.len(), 1);
    }
}
