//! The raycast contract offered by the host's plane-tracking runtime.

use nalgebra::{Point3, Unit, Vector3};

/// A half-line in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ray {
    /// Start of the ray.
    pub origin: Point3<f64>,
    /// Unit direction.
    pub direction: Unit<Vector3<f64>>,
}

impl Ray {
    /// Create a ray, normalizing `direction`.
    ///
    /// A zero direction falls back to `+z` so the ray is always well formed.
    #[must_use]
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        let direction = Unit::try_new(direction, f64::EPSILON).unwrap_or_else(Vector3::z_axis);
        Self { origin, direction }
    }

    /// Point at `distance` along the ray.
    #[must_use]
    pub fn point_at(&self, distance: f64) -> Point3<f64> {
        self.origin + self.direction.into_inner() * distance
    }
}

/// Opaque identifier of a tracked plane. Stable across frames while the
/// runtime keeps tracking that plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaneId(pub u64);

/// What kind of scene geometry a raycast hit landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HitCategory {
    /// Inside the plane's detected boundary polygon.
    PlaneWithinPolygon,
    /// Inside the plane's bounding rectangle but outside its polygon.
    PlaneWithinBounds,
    /// On the plane's infinite extension.
    PlaneEstimated,
    /// On a tracked feature point.
    FeaturePoint,
    /// On the depth map.
    Depth,
}

impl HitCategory {
    /// Whether hits of this category belong to a tracked plane.
    #[must_use]
    pub fn is_plane(self) -> bool {
        matches!(
            self,
            Self::PlaneWithinPolygon | Self::PlaneWithinBounds | Self::PlaneEstimated
        )
    }
}

/// One intersection reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RaycastHit {
    /// World position of the hit.
    pub position: Point3<f64>,
    /// Owning plane; `None` for non-plane categories.
    pub plane_id: Option<PlaneId>,
    /// Distance from the ray origin.
    pub distance: f64,
    /// Kind of geometry hit.
    pub category: HitCategory,
}

/// Centre and unit normal of a tracked plane.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanePose {
    /// Plane centre in world space.
    pub position: Point3<f64>,
    /// Unit normal pointing away from the surface.
    pub normal: Unit<Vector3<f64>>,
}

/// Scene queries the anchoring pipeline needs from the tracking runtime.
pub trait RaycastQuery {
    /// All hits along `ray`, nearest first.
    fn raycast(&self, ray: &Ray) -> Vec<RaycastHit>;

    /// Current pose of a tracked plane, if the runtime still knows it.
    fn plane_pose(&self, _plane: PlaneId) -> Option<PlanePose> {
        None
    }
}

impl<F> RaycastQuery for F
where
    F: Fn(&Ray) -> Vec<RaycastHit>,
{
    fn raycast(&self, ray: &Ray) -> Vec<RaycastHit> {
        self(ray)
    }
}
