//! Sensor-pixel to viewport normalization through the per-frame display transform.
//!
//! The platform hands over a 4×4 matrix each frame that maps normalized sensor
//! UV to normalized display UV. It is applied with the row-vector convention
//! (`uvᵀ · M`) regardless of how the platform stores it, so callers only need
//! to pick the constructor matching their storage order.
//!
//! Some camera pipelines bake a top crop into the matrix (row 2, column 1).
//! That crop is removed once per point after the multiplication.

use crate::frame::ImageSize;
use crate::geometry::{GEOMETRY_EPS, LineSegment, PixelPoint, Point, Quad, ViewportPoint};
use nalgebra::{Matrix4, RowVector4};

/// Per-frame sensor-UV to viewport-UV transform.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayTransform {
    matrix: Matrix4<f64>,
}

impl DisplayTransform {
    /// Wrap a matrix whose `(row, col)` entries match the platform's notation.
    #[must_use]
    pub fn new(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// The identity transform: sensor UV equals viewport UV.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(Matrix4::identity())
    }

    /// Build from 16 values listed row by row.
    #[must_use]
    pub fn from_row_major(values: &[f64; 16]) -> Self {
        Self::new(Matrix4::from_row_slice(values))
    }

    /// Build from 16 values listed column by column (the in-memory layout of
    /// most engine matrix types).
    #[must_use]
    pub fn from_column_major(values: &[f64; 16]) -> Self {
        Self::new(Matrix4::from_column_slice(values))
    }

    /// The wrapped matrix.
    #[must_use]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Fraction of the display cropped from the top, if the transform encodes one.
    ///
    /// Derived from the row 2, column 1 entry as `1 - m[2][1]`. Only crops in
    /// `(0, 0.5)` are reported; anything else would flip or blow up the
    /// rescale.
    #[must_use]
    pub fn top_crop(&self) -> Option<f64> {
        let slot = self.matrix[(2, 1)];
        if slot.abs() <= GEOMETRY_EPS {
            return None;
        }
        let crop = 1.0 - slot;
        (crop > GEOMETRY_EPS && 1.0 - 2.0 * crop > GEOMETRY_EPS).then_some(crop)
    }

    /// Map a raw pixel into viewport space.
    ///
    /// `crop_correction` controls whether an encoded top crop is removed.
    /// The result is not clamped; points near the frame edge may land
    /// slightly outside `[0, 1]`.
    #[must_use]
    pub fn normalize(
        &self,
        point: PixelPoint,
        image_size: ImageSize,
        crop_correction: bool,
    ) -> ViewportPoint {
        let u = point.x / f64::from(image_size.width);
        let v = point.y / f64::from(image_size.height);

        let mapped = RowVector4::new(u, v, 1.0, 0.0) * self.matrix;
        let mut x = mapped[0];
        let mut y = mapped[1];
        let z = mapped[2];

        if crop_correction {
            if let Some(crop) = self.top_crop() {
                let scale_y = 1.0 / (1.0 - 2.0 * crop);
                y = (y - crop) * scale_y;
            }
        }

        if z.abs() > GEOMETRY_EPS {
            x /= z;
            y /= z;
        }
        Point::new(x, y)
    }

    /// Map both endpoints of a pixel segment into viewport space.
    #[must_use]
    pub fn normalize_segment(
        &self,
        segment: &LineSegment<PixelPoint>,
        image_size: ImageSize,
        crop_correction: bool,
    ) -> LineSegment<ViewportPoint> {
        LineSegment::new(
            self.normalize(segment.a, image_size, crop_correction),
            self.normalize(segment.b, image_size, crop_correction),
        )
    }

    /// Where the four image corners land in the viewport, in pixel order
    /// `(0,0), (w,0), (w,h), (0,h)`.
    #[must_use]
    pub fn image_bounds(&self, image_size: ImageSize, crop_correction: bool) -> Quad {
        let w = f64::from(image_size.width);
        let h = f64::from(image_size.height);
        [
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ]
        .map(|p| self.normalize(p, image_size, crop_correction))
    }
}

impl Default for DisplayTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Map a raw pixel into viewport space, removing any encoded top crop.
#[must_use]
pub fn normalize(
    transform: &DisplayTransform,
    point: PixelPoint,
    image_size: ImageSize,
) -> ViewportPoint {
    transform.normalize(point, image_size, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Portrait display matrix captured on a phone, with a top crop baked in.
    const PORTRAIT_CROPPED: [f64; 16] = [
        0.0, -0.82051, 0.0, 0.0, //
        -1.0, 0.0, 0.0, 0.0, //
        1.0, 0.91026, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];

    fn size() -> ImageSize {
        ImageSize::new(640, 480).expect("valid size")
    }

    fn assert_close(p: Point, x: f64, y: f64, tol: f64) {
        assert!(
            (p.x - x).abs() < tol && (p.y - y).abs() < tol,
            "expected ({x}, {y}), got ({}, {})",
            p.x,
            p.y
        );
    }

    #[test]
    fn test_identity_round_trip() {
        let t = DisplayTransform::identity();
        assert_close(normalize(&t, Point::new(0.0, 0.0), size()), 0.0, 0.0, 1e-12);
        assert_close(normalize(&t, Point::new(640.0, 480.0), size()), 1.0, 1.0, 1e-12);
        assert_close(normalize(&t, Point::new(320.0, 120.0), size()), 0.5, 0.25, 1e-12);
        assert_eq!(t.top_crop(), None);
    }

    #[test]
    fn test_cropped_portrait_maps_to_viewport_corners() {
        let t = DisplayTransform::from_row_major(&PORTRAIT_CROPPED);
        let crop = t.top_crop().expect("crop encoded");
        assert!((crop - 0.08974).abs() < 1e-9);

        let bounds = t.image_bounds(size(), true);
        assert_close(bounds[0], 1.0, 1.0, 1e-3);
        assert_close(bounds[1], 1.0, 0.0, 1e-3);
        assert_close(bounds[2], 0.0, 0.0, 1e-3);
        assert_close(bounds[3], 0.0, 1.0, 1e-3);
    }

    #[test]
    fn test_crop_correction_can_be_disabled() {
        let t = DisplayTransform::from_row_major(&PORTRAIT_CROPPED);
        let raw = t.normalize(Point::new(0.0, 0.0), size(), false);
        assert_close(raw, 1.0, 0.91026, 1e-9);
    }

    #[test]
    fn test_storage_orders_agree() {
        let row = DisplayTransform::from_row_major(&PORTRAIT_CROPPED);
        let mut transposed = [0.0; 16];
        for r in 0..4 {
            for c in 0..4 {
                transposed[c * 4 + r] = PORTRAIT_CROPPED[r * 4 + c];
            }
        }
        let col = DisplayTransform::from_column_major(&transposed);
        assert_eq!(row, col);
    }

    #[test]
    fn test_perspective_divide() {
        let mut m = Matrix4::identity();
        m[(2, 2)] = 2.0;
        let t = DisplayTransform::new(m);
        assert_close(normalize(&t, Point::new(640.0, 240.0), size()), 0.5, 0.25, 1e-12);
    }

    #[test]
    fn test_unflipped_slot_is_not_a_crop() {
        // A y-flip puts 1.0 in the crop slot; that is not a crop.
        let t = DisplayTransform::from_row_major(&[
            1.0, 0.0, 0.0, 0.0, //
            0.0, -1.0, 0.0, 0.0, //
            0.0, 1.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        assert_eq!(t.top_crop(), None);
        assert_close(normalize(&t, Point::new(0.0, 120.0), size()), 0.0, 0.75, 1e-12);
    }
}
