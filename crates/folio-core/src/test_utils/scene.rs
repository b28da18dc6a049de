#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

use crate::geometry::GEOMETRY_EPS;
use crate::scene::{HitCategory, PlaneId, PlanePose, Ray, RaycastHit, RaycastQuery};
use nalgebra::{Point3, Unit, Vector3};
use rand::Rng;

/// A bounded rectangular plane, as a tracking runtime would report it.
#[derive(Debug, Clone, Copy)]
pub struct TrackedPlane {
    /// Plane identifier.
    pub id: PlaneId,
    /// Centre of the tracked rectangle.
    pub center: Point3<f64>,
    /// Unit normal.
    pub normal: Unit<Vector3<f64>>,
    /// First in-plane axis of the rectangle.
    pub u_axis: Unit<Vector3<f64>>,
    /// Half sizes along `u_axis` and `normal × u_axis`.
    pub half_extents: (f64, f64),
}

impl TrackedPlane {
    /// Plane through `center` with the given normal. `u_hint` is projected
    /// onto the plane to orient the rectangle.
    pub fn new(
        id: u64,
        center: Point3<f64>,
        normal: Vector3<f64>,
        u_hint: Vector3<f64>,
        half_extents: (f64, f64),
    ) -> Self {
        let normal = Unit::try_new(normal, GEOMETRY_EPS).unwrap_or_else(Vector3::y_axis);
        let u = u_hint - normal.into_inner() * u_hint.dot(&normal);
        let u_axis = Unit::try_new(u, GEOMETRY_EPS).unwrap_or_else(|| {
            let other = if normal.x.abs() < 0.9 {
                Vector3::x()
            } else {
                Vector3::y()
            };
            Unit::new_normalize(normal.cross(&other))
        });
        Self {
            id: PlaneId(id),
            center,
            normal,
            u_axis,
            half_extents,
        }
    }

    /// Horizontal, upward-facing plane (floor or table top).
    pub fn horizontal(id: u64, center: Point3<f64>, half_x: f64, half_z: f64) -> Self {
        Self::new(id, center, Vector3::y(), Vector3::x(), (half_x, half_z))
    }

    /// Second in-plane axis.
    pub fn v_axis(&self) -> Vector3<f64> {
        self.normal.cross(&self.u_axis)
    }

    /// Point on the plane at rectangle coordinates `(s, t)`.
    pub fn point_at(&self, s: f64, t: f64) -> Point3<f64> {
        self.center + self.u_axis.into_inner() * s + self.v_axis() * t
    }

    /// Whether a point on the plane lies inside the tracked rectangle.
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        let d = point - self.center;
        d.dot(&self.u_axis).abs() <= self.half_extents.0
            && d.dot(&self.v_axis()).abs() <= self.half_extents.1
    }

    /// Intersection with the plane's infinite extension as `(distance, point)`.
    pub fn intersect(&self, ray: &Ray) -> Option<(f64, Point3<f64>)> {
        let denom = ray.direction.dot(&self.normal);
        if denom.abs() < GEOMETRY_EPS {
            return None;
        }
        let t = (self.center - ray.origin).dot(&self.normal) / denom;
        (t > GEOMETRY_EPS).then(|| (t, ray.point_at(t)))
    }
}

/// Synthetic scene of tracked planes and feature points.
#[derive(Debug, Clone, Default)]
pub struct PlaneScene {
    planes: Vec<TrackedPlane>,
    feature_points: Vec<Point3<f64>>,
    feature_radius: f64,
    report_estimated: bool,
}

impl PlaneScene {
    /// Tracked planes in the scene.
    pub fn planes(&self) -> &[TrackedPlane] {
        &self.planes
    }

    /// Look up a plane by id.
    pub fn plane(&self, id: PlaneId) -> Option<&TrackedPlane> {
        self.planes.iter().find(|p| p.id == id)
    }
}

impl RaycastQuery for PlaneScene {
    fn raycast(&self, ray: &Ray) -> Vec<RaycastHit> {
        let mut hits = Vec::new();
        for plane in &self.planes {
            let Some((distance, position)) = plane.intersect(ray) else {
                continue;
            };
            let category = if plane.contains(&position) {
                HitCategory::PlaneWithinPolygon
            } else if self.report_estimated {
                HitCategory::PlaneEstimated
            } else {
                continue;
            };
            hits.push(RaycastHit {
                position,
                plane_id: Some(plane.id),
                distance,
                category,
            });
        }

        for point in &self.feature_points {
            let t = (point - ray.origin).dot(&ray.direction);
            if t <= GEOMETRY_EPS {
                continue;
            }
            let closest = ray.point_at(t);
            if (closest - point).norm() <= self.feature_radius {
                hits.push(RaycastHit {
                    position: *point,
                    plane_id: None,
                    distance: t,
                    category: HitCategory::FeaturePoint,
                });
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn plane_pose(&self, plane: PlaneId) -> Option<PlanePose> {
        self.plane(plane).map(|p| PlanePose {
            position: p.center,
            normal: p.normal,
        })
    }
}

/// A builder for synthetic tracking scenes.
pub struct SceneBuilder {
    scene: PlaneScene,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBuilder {
    /// Create an empty scene builder.
    pub fn new() -> Self {
        Self {
            scene: PlaneScene {
                feature_radius: 0.01,
                ..PlaneScene::default()
            },
        }
    }

    /// Add a tracked plane.
    pub fn with_plane(mut self, plane: TrackedPlane) -> Self {
        self.scene.planes.push(plane);
        self
    }

    /// Add a feature point.
    pub fn with_feature_point(mut self, point: Point3<f64>) -> Self {
        self.scene.feature_points.push(point);
        self
    }

    /// Set how close a ray must pass to a feature point to hit it.
    pub fn with_feature_radius(mut self, radius: f64) -> Self {
        self.scene.feature_radius = radius;
        self
    }

    /// Also report hits on planes' infinite extensions as `PlaneEstimated`.
    pub fn with_estimated_planes(mut self) -> Self {
        self.scene.report_estimated = true;
        self
    }

    /// Scatter `count` feature points uniformly inside a box.
    pub fn with_random_feature_points<R: Rng>(
        mut self,
        rng: &mut R,
        count: usize,
        min: Point3<f64>,
        max: Point3<f64>,
    ) -> Self {
        for _ in 0..count {
            let p = Point3::new(
                rng.gen_range(min.x..=max.x),
                rng.gen_range(min.y..=max.y),
                rng.gen_range(min.z..=max.z),
            );
            self.scene.feature_points.push(p);
        }
        self
    }

    /// Finish the scene.
    pub fn build(self) -> PlaneScene {
        self.scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_sorted_and_categorized() {
        let scene = SceneBuilder::new()
            .with_plane(TrackedPlane::horizontal(1, Point3::new(0.0, 0.0, 0.0), 1.0, 1.0))
            .with_plane(TrackedPlane::horizontal(2, Point3::new(0.0, 0.5, 0.0), 0.2, 0.2))
            .with_estimated_planes()
            .build();
        let ray = Ray::new(Point3::new(0.5, 2.0, 0.0), -Vector3::y());
        let hits = scene.raycast(&ray);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].plane_id, Some(PlaneId(2)));
        assert_eq!(hits[0].category, HitCategory::PlaneEstimated);
        assert_eq!(hits[1].plane_id, Some(PlaneId(1)));
        assert_eq!(hits[1].category, HitCategory::PlaneWithinPolygon);
        assert!((hits[1].distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_bounded_planes_only_by_default() {
        let scene = SceneBuilder::new()
            .with_plane(TrackedPlane::horizontal(1, Point3::origin(), 0.1, 0.1))
            .build();
        let ray = Ray::new(Point3::new(0.5, 1.0, 0.0), -Vector3::y());
        assert!(scene.raycast(&ray).is_empty());
        assert!(scene.plane_pose(PlaneId(1)).is_some());
        assert!(scene.plane_pose(PlaneId(2)).is_none());
    }

    #[test]
    fn test_feature_point_hit() {
        let scene = SceneBuilder::new()
            .with_feature_point(Point3::new(0.0, 0.0, 2.0))
            .with_feature_radius(0.05)
            .build();
        let hit = Ray::new(Point3::new(0.01, 0.0, 0.0), Vector3::z());
        let miss = Ray::new(Point3::new(0.2, 0.0, 0.0), Vector3::z());
        assert_eq!(scene.raycast(&hit).len(), 1);
        assert!(scene.raycast(&miss).is_empty());
    }

    #[test]
    fn test_parallel_and_backward_rays_miss() {
        let plane = TrackedPlane::horizontal(1, Point3::origin(), 1.0, 1.0);
        assert!(plane.intersect(&Ray::new(Point3::new(0.0, 1.0, 0.0), Vector3::x())).is_none());
        assert!(plane.intersect(&Ray::new(Point3::new(0.0, 1.0, 0.0), Vector3::y())).is_none());
    }
}
