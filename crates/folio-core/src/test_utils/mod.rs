use crate::camera::{PinholeCamera, Pose};
use crate::frame::ImageSize;
use crate::geometry::{PixelPoint, Point, Quad};
use nalgebra::{Point3, Vector3};
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

/// Corners of an axis-aligned sheet lying flat at `center`, in cyclic order.
#[must_use]
pub fn paper_corners(center: Point3<f64>, half_x: f64, half_z: f64) -> [Point3<f64>; 4] {
    [
        Point3::new(center.x - half_x, center.y, center.z - half_z),
        Point3::new(center.x - half_x, center.y, center.z + half_z),
        Point3::new(center.x + half_x, center.y, center.z + half_z),
        Point3::new(center.x + half_x, center.y, center.z - half_z),
    ]
}

/// Project world corners to detector pixels, assuming the identity display
/// transform (pixel `(x, y)` = viewport `(x·w, y·h)`).
///
/// Returns `None` if any corner is behind the camera.
#[must_use]
pub fn project_to_pixels(
    camera: &PinholeCamera,
    corners: &[Point3<f64>; 4],
    image_size: ImageSize,
) -> Option<[PixelPoint; 4]> {
    let w = f64::from(image_size.width);
    let h = f64::from(image_size.height);
    let mut out = [Point::default(); 4];
    for (dst, corner) in out.iter_mut().zip(corners) {
        let v = camera.project(corner)?;
        *dst = Point::new(v.x * w, v.y * h);
    }
    Some(out)
}

/// Add isotropic Gaussian noise (pixels) to detected corners.
///
/// # Panics
/// Panics if `sigma` is not finite.
#[must_use]
pub fn jitter_corners<R: Rng>(rng: &mut R, corners: [PixelPoint; 4], sigma: f64) -> [PixelPoint; 4] {
    if sigma <= 0.0 {
        return corners;
    }
    let normal = Normal::new(0.0, sigma).expect("valid sigma");
    corners.map(|p| Point::new(p.x + normal.sample(rng), p.y + normal.sample(rng)))
}

/// A camera somewhere on a spherical shell around `target`, looking at it.
///
/// Elevation is drawn from 35°–80° above the horizon so a horizontal sheet
/// at `target` stays in view.
///
/// # Panics
/// Panics if `distance` is empty.
#[must_use]
pub fn random_camera_looking_at<R: Rng>(
    rng: &mut R,
    target: Point3<f64>,
    distance: std::ops::Range<f64>,
) -> PinholeCamera {
    let r = rng.gen_range(distance);
    let elevation = rng.gen_range(35f64.to_radians()..80f64.to_radians());
    let azimuth = rng.gen_range(0.0..std::f64::consts::TAU);
    let eye = target
        + Vector3::new(
            r * elevation.cos() * azimuth.cos(),
            r * elevation.sin(),
            r * elevation.cos() * azimuth.sin(),
        );
    let pose = Pose::look_at(eye, target, Vector3::y()).expect("elevation keeps up non-parallel");
    PinholeCamera::from_fov(60f64.to_radians(), 0.75, pose)
}

/// Mean distance between two quads, minimized over all 4 rotations and
/// both winding orders.
#[must_use]
pub fn compute_corner_error(detected: &Quad, ground_truth: &Quad) -> f64 {
    min_cyclic_error(detected, ground_truth, |a, b| a.distance_squared(*b).sqrt())
}

/// [`compute_corner_error`] for world-space quads.
#[must_use]
pub fn compute_world_corner_error(detected: &[Point3<f64>; 4], ground_truth: &[Point3<f64>; 4]) -> f64 {
    min_cyclic_error(detected, ground_truth, |a, b| (a - b).norm())
}

fn min_cyclic_error<T: Copy>(detected: &[T; 4], ground_truth: &[T; 4], dist: impl Fn(&T, &T) -> f64) -> f64 {
    let windings = [
        *detected,
        [detected[3], detected[2], detected[1], detected[0]],
    ];

    let mut min_error = f64::MAX;
    for points in windings {
        for rot in 0..4 {
            let sum: f64 = (0..4).map(|i| dist(&points[(i + rot) % 4], &ground_truth[i])).sum();
            min_error = min_error.min(sum / 4.0);
        }
    }
    min_error
}

/// Whether `b` is a cyclic rotation of `a` (same winding) within `tol`.
#[must_use]
pub fn same_cyclic_order(a: &Quad, b: &Quad, tol: f64) -> bool {
    (0..4).any(|shift| (0..4).all(|i| a[i].distance_squared(b[(i + shift) % 4]) <= tol * tol))
}

/// Synthetic tracking scenes.
pub mod scene;
pub use scene::{PlaneScene, SceneBuilder, TrackedPlane};
