//! A 2D coordinate frame on the plane of an anchored quad.
//!
//! Anchored corners live in world space but the clipping utilities in
//! [`crate::geometry`] are planar. [`PlaneFrame`] flattens world points onto
//! the quad's best-fit plane, and lifts 2D results back.

use crate::geometry::{GEOMETRY_EPS, LineSegment, Point, Quad, clip_line_to_quad, inset_quad};
use crate::scene::Ray;
use nalgebra::{Point3, Unit, Vector3};

/// Orthonormal frame spanning the plane of a world-space quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFrame {
    origin: Point3<f64>,
    u: Unit<Vector3<f64>>,
    v: Unit<Vector3<f64>>,
    normal: Unit<Vector3<f64>>,
}

impl PlaneFrame {
    /// Fit a frame to four world points.
    ///
    /// The normal comes from Newell's method, so slightly non-planar quads are
    /// handled. Returns `None` when the quad has (near) zero area.
    #[must_use]
    pub fn from_quad(quad: &[Point3<f64>; 4]) -> Option<Self> {
        let origin = Point3::from(quad.iter().map(|p| p.coords).sum::<Vector3<f64>>() * 0.25);

        let mut normal = Vector3::zeros();
        for i in 0..4 {
            let a = quad[i] - origin;
            let b = quad[(i + 1) % 4] - origin;
            normal += a.cross(&b);
        }
        let normal = Unit::try_new(normal, GEOMETRY_EPS)?;

        let edge = quad[1] - quad[0];
        let in_plane = edge - normal.into_inner() * edge.dot(&normal);
        let u = Unit::try_new(in_plane, GEOMETRY_EPS)?;
        let v = Unit::new_normalize(normal.cross(&u));

        Some(Self {
            origin,
            u,
            v,
            normal,
        })
    }

    /// Centroid of the quad the frame was built from.
    #[must_use]
    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    /// Unit normal (right-handed with respect to the quad's winding).
    #[must_use]
    pub fn normal(&self) -> Unit<Vector3<f64>> {
        self.normal
    }

    /// Project a world point onto the plane, in frame coordinates.
    #[must_use]
    pub fn to_local(&self, point: &Point3<f64>) -> Point {
        let d = point - self.origin;
        Point::new(d.dot(&self.u), d.dot(&self.v))
    }

    /// Lift frame coordinates back into world space.
    #[must_use]
    pub fn to_world(&self, point: Point) -> Point3<f64> {
        self.origin + self.u.into_inner() * point.x + self.v.into_inner() * point.y
    }

    /// Signed distance of a world point from the plane.
    #[must_use]
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.origin).dot(&self.normal)
    }

    /// Where `ray` crosses the plane, if it does so in front of its origin.
    #[must_use]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<Point3<f64>> {
        let denom = ray.direction.dot(&self.normal);
        if denom.abs() < GEOMETRY_EPS {
            return None;
        }
        let t = (self.origin - ray.origin).dot(&self.normal) / denom;
        (t > GEOMETRY_EPS).then(|| ray.point_at(t))
    }

    /// Flatten a world quad into frame coordinates.
    #[must_use]
    pub fn flatten_quad(&self, quad: &[Point3<f64>; 4]) -> Quad {
        quad.map(|p| self.to_local(&p))
    }
}

/// Clip a world segment to a world quad (optionally inset), on the quad's plane.
///
/// Both endpoints are projected onto the plane first. Returns `None` for a
/// degenerate quad or when the segment misses it.
#[must_use]
pub fn clip_segment_to_world_quad(
    segment: &LineSegment<Point3<f64>>,
    quad: &[Point3<f64>; 4],
    inset: f64,
) -> Option<LineSegment<Point3<f64>>> {
    let frame = PlaneFrame::from_quad(quad)?;
    clip_segment_in_frame(&frame, segment, &frame.flatten_quad(quad), inset)
}

/// Clip a world segment against a quad already flattened into `frame`.
#[must_use]
pub fn clip_segment_in_frame(
    frame: &PlaneFrame,
    segment: &LineSegment<Point3<f64>>,
    local_quad: &Quad,
    inset: f64,
) -> Option<LineSegment<Point3<f64>>> {
    let bounds = if inset > 0.0 {
        inset_quad(local_quad, inset)
    } else {
        *local_quad
    };
    let (a, b) = clip_line_to_quad(frame.to_local(&segment.a), frame.to_local(&segment.b), &bounds)?;
    Some(LineSegment::new(frame.to_world(a), frame.to_world(b)))
}
