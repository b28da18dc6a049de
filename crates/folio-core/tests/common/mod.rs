#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use folio_core::camera::{PinholeCamera, Pose};
use folio_core::display::DisplayTransform;
use folio_core::geometry::PixelPoint;
use folio_core::test_utils::paper_corners;
use folio_core::test_utils::project_to_pixels;
use folio_core::test_utils::scene::TrackedPlane;
use folio_core::{FrameInput, ImageSize};
use nalgebra::{Point3, Vector3};

/// Half extents of an A4 sheet in metres.
pub const SHEET_HALF_X: f64 = 0.1485;
pub const SHEET_HALF_Z: f64 = 0.105;

pub fn image_size() -> ImageSize {
    ImageSize::new(640, 480).unwrap()
}

/// Large desk plane at y = 0.
pub fn desk() -> TrackedPlane {
    TrackedPlane::horizontal(1, Point3::origin(), 2.0, 2.0)
}

/// Ground-truth corners of a sheet lying on the desk.
pub fn sheet() -> [Point3<f64>; 4] {
    paper_corners(Point3::origin(), SHEET_HALF_X, SHEET_HALF_Z)
}

/// Camera above and in front of the desk, looking at the sheet.
pub fn overhead_camera() -> PinholeCamera {
    let pose = Pose::look_at(Point3::new(0.1, 0.8, -0.5), Point3::origin(), Vector3::y()).unwrap();
    PinholeCamera::from_fov(60f64.to_radians(), 0.75, pose)
}

/// What an ideal detector would report for `corners` seen by `camera`.
pub fn detect(camera: &PinholeCamera, corners: &[Point3<f64>; 4]) -> [PixelPoint; 4] {
    project_to_pixels(camera, corners, image_size()).unwrap()
}

/// A frame with the identity display transform and the given detection.
pub fn identity_frame(corners: [PixelPoint; 4]) -> FrameInput<'static> {
    FrameInput::new(image_size())
        .with_transform(DisplayTransform::identity())
        .with_corners(corners)
}
