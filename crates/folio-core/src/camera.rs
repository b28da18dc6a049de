//! Viewport-to-ray camera model.
//!
//! The pipeline only needs one thing from the camera: a world-space ray
//! through a viewport point. Hosts with a native AR camera implement
//! [`ViewportCamera`] directly; [`PinholeCamera`] covers everything else.
//!
//! Conventions: camera space is x right, y up, z forward. Viewport space has
//! its origin at the bottom-left and `(1, 1)` at the top-right.

use crate::geometry::{GEOMETRY_EPS, Point, ViewportPoint};
use crate::scene::Ray;
use nalgebra::{Matrix3, Point3, Unit, Vector3};

/// Anything that can turn a viewport point into a world-space ray.
pub trait ViewportCamera {
    /// Ray from the camera origin through `point`.
    fn viewport_point_to_ray(&self, point: ViewportPoint) -> Ray;
}

/// Camera intrinsics in normalized viewport units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraIntrinsics {
    /// Focal length in x (viewport widths).
    pub fx: f64,
    /// Focal length in y (viewport heights).
    pub fy: f64,
    /// Principal point x.
    pub cx: f64,
    /// Principal point y.
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Create new intrinsics.
    #[must_use]
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Intrinsics for a vertical field of view (radians) and a width/height
    /// aspect ratio, with the principal point at the viewport centre.
    #[must_use]
    pub fn from_fov(fov_y: f64, aspect: f64) -> Self {
        let fy = 0.5 / (fov_y * 0.5).tan();
        Self::new(fy / aspect, fy, 0.5, 0.5)
    }

    /// Convert to a 3x3 matrix.
    #[must_use]
    pub fn as_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Get inverse matrix.
    #[must_use]
    pub fn inv_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            1.0 / self.fx,
            0.0,
            -self.cx / self.fx,
            0.0,
            1.0 / self.fy,
            -self.cy / self.fy,
            0.0,
            0.0,
            1.0,
        )
    }
}

/// Camera-to-world rigid transform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// 3x3 rotation; columns are the camera's right, up and forward axes in world space.
    pub rotation: Matrix3<f64>,
    /// Camera position in world space.
    pub translation: Vector3<f64>,
}

impl Pose {
    /// Create a new pose.
    #[must_use]
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Pose at `eye` looking toward `target`.
    ///
    /// Returns `None` when `eye == target` or `up` is parallel to the view
    /// direction.
    #[must_use]
    pub fn look_at(eye: Point3<f64>, target: Point3<f64>, up: Vector3<f64>) -> Option<Self> {
        let forward = Unit::try_new(target - eye, GEOMETRY_EPS)?;
        let right = Unit::try_new(up.cross(&forward), GEOMETRY_EPS)?;
        let true_up = forward.cross(&right);
        Some(Self::new(
            Matrix3::from_columns(&[right.into_inner(), true_up, forward.into_inner()]),
            eye.coords,
        ))
    }

    /// Camera position in world space.
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        Point3::from(self.translation)
    }

    /// Express a world point in camera coordinates.
    #[must_use]
    pub fn world_to_camera(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.rotation.transpose() * (point.coords - self.translation)
    }
}

/// Ideal pinhole camera with a camera-to-world pose.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PinholeCamera {
    /// Normalized intrinsics.
    pub intrinsics: CameraIntrinsics,
    /// Camera-to-world pose.
    pub pose: Pose,
}

impl PinholeCamera {
    /// Create a camera from intrinsics and pose.
    #[must_use]
    pub fn new(intrinsics: CameraIntrinsics, pose: Pose) -> Self {
        Self { intrinsics, pose }
    }

    /// Create a camera from a vertical field of view (radians), aspect ratio and pose.
    #[must_use]
    pub fn from_fov(fov_y: f64, aspect: f64, pose: Pose) -> Self {
        Self::new(CameraIntrinsics::from_fov(fov_y, aspect), pose)
    }

    /// Project a world point into the viewport.
    ///
    /// Returns `None` for points at or behind the camera plane.
    #[must_use]
    pub fn project(&self, point: &Point3<f64>) -> Option<ViewportPoint> {
        let p_cam = self.pose.world_to_camera(point);
        if p_cam.z <= GEOMETRY_EPS {
            return None;
        }
        let x = (p_cam.x / p_cam.z) * self.intrinsics.fx + self.intrinsics.cx;
        let y = (p_cam.y / p_cam.z) * self.intrinsics.fy + self.intrinsics.cy;
        Some(Point::new(x, y))
    }
}

impl ViewportCamera for PinholeCamera {
    fn viewport_point_to_ray(&self, point: ViewportPoint) -> Ray {
        let dir_cam = self.intrinsics.inv_matrix() * Vector3::new(point.x, point.y, 1.0);
        Ray::new(self.pose.position(), self.pose.rotation * dir_cam)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn front_camera() -> PinholeCamera {
        let pose = Pose::look_at(
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 1.0),
            Vector3::y(),
        )
        .expect("valid pose");
        PinholeCamera::from_fov(60f64.to_radians(), 0.75, pose)
    }

    #[test]
    fn test_look_at_axes() {
        let cam = front_camera();
        let r = cam.pose.rotation;
        assert!((r.column(0) - Vector3::x()).norm() < 1e-12);
        assert!((r.column(1) - Vector3::y()).norm() < 1e-12);
        assert!((r.column(2) - Vector3::z()).norm() < 1e-12);
        assert!((r.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_look_at_degenerate() {
        let eye = Point3::new(0.0, 0.0, 0.0);
        assert!(Pose::look_at(eye, eye, Vector3::y()).is_none());
        assert!(Pose::look_at(eye, Point3::new(0.0, 2.0, 0.0), Vector3::y()).is_none());
    }

    #[test]
    fn test_centre_ray_is_forward() {
        let cam = front_camera();
        let ray = cam.viewport_point_to_ray(Point::new(0.5, 0.5));
        assert!((ray.origin - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
        assert!((ray.direction.into_inner() - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_viewport_orientation() {
        let cam = front_camera();
        let top_right = cam.viewport_point_to_ray(Point::new(1.0, 1.0));
        assert!(top_right.direction.x > 0.0);
        assert!(top_right.direction.y > 0.0);

        // Top edge of the viewport sits at half the vertical field of view.
        let top = cam.viewport_point_to_ray(Point::new(0.5, 1.0));
        let angle = top.direction.y.atan2(top.direction.z);
        assert!((angle - 30f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_project_behind_camera() {
        let cam = front_camera();
        assert!(cam.project(&Point3::new(0.0, 1.0, -1.0)).is_none());
    }

    proptest! {
        #[test]
        fn prop_intrinsics_inversion(
            fx in 0.2..5.0f64,
            fy in 0.2..5.0f64,
            cx in 0.0..1.0f64,
            cy in 0.0..1.0f64
        ) {
            let intrinsics = CameraIntrinsics::new(fx, fy, cx, cy);
            let identity = intrinsics.as_matrix() * intrinsics.inv_matrix();

            let expected = Matrix3::<f64>::identity();
            for i in 0..3 {
                for j in 0..3 {
                    prop_assert!((identity[(i, j)] - expected[(i, j)]).abs() < 1e-9);
                }
            }
        }

        #[test]
        fn prop_ray_through_projection(
            ex in -2.0..2.0f64,
            ey in 0.5..2.0f64,
            ez in -2.0..2.0f64,
            vx in 0.05..0.95f64,
            vy in 0.05..0.95f64,
            depth in 0.3..5.0f64,
        ) {
            let eye = Point3::new(ex, ey, ez);
            let pose = Pose::look_at(eye, Point3::new(0.0, 0.0, 0.0), Vector3::y()).expect("pose");
            let cam = PinholeCamera::from_fov(1.0, 0.5, pose);

            let ray = cam.viewport_point_to_ray(Point::new(vx, vy));
            let back = cam.project(&ray.point_at(depth)).expect("in front");
            prop_assert!((back.x - vx).abs() < 1e-9);
            prop_assert!((back.y - vy).abs() < 1e-9);
        }
    }
}
