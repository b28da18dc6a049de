//! Planar primitives and four-sided polygon utilities.
//!
//! Everything here works in any 2D frame: raw sensor pixels, the normalized
//! viewport, or the local frame of an anchored plane. None of the helpers
//! assume a particular winding; they do assume the quad is convex.

use std::ops::{Add, Mul, Neg, Sub};

/// Cross products, denominators and vector lengths below this magnitude are
/// treated as zero.
pub const GEOMETRY_EPS: f64 = 1e-6;

/// A 2D point (or vector) with double precision.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

/// A point in raw sensor-image pixels, origin top-left.
pub type PixelPoint = Point;

/// A point in display-normalized viewport space, nominally `[0, 1]²`.
pub type ViewportPoint = Point;

/// Four points ordered cyclically around their centroid.
pub type Quad = [Point; 4];

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product `self × other`.
    #[must_use]
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Squared Euclidean length.
    #[must_use]
    pub fn norm_squared(self) -> f64 {
        self.dot(self)
    }

    /// Euclidean length.
    #[must_use]
    pub fn norm(self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Squared distance to `other`.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        (self - other).norm_squared()
    }

    /// Unit vector with the same direction, or the zero vector when the input
    /// is too short to normalize.
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let n = self.norm();
        if n < GEOMETRY_EPS {
            Self::default()
        } else {
            self * (1.0 / n)
        }
    }

    /// Midpoint between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        (self + other) * 0.5
    }
}

impl Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// A line segment with both endpoints in the same coordinate space.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSegment<P> {
    /// First endpoint.
    pub a: P,
    /// Second endpoint.
    pub b: P,
}

impl<P> LineSegment<P> {
    /// Create a segment from its endpoints.
    #[must_use]
    pub const fn new(a: P, b: P) -> Self {
        Self { a, b }
    }
}

/// Returns `true` when `p` lies inside the convex `quad` or on its boundary.
///
/// The cross product of every edge with the vector to `p` must share one sign
/// (zero is compatible with both). Works for either winding.
#[must_use]
pub fn point_in_quad(p: Point, quad: &Quad) -> bool {
    let mut has_pos = false;
    let mut has_neg = false;
    for (i, &a) in quad.iter().enumerate() {
        let b = quad[(i + 1) % 4];
        let cross = (b - a).cross(p - a);
        if cross > 0.0 {
            has_pos = true;
        } else if cross < 0.0 {
            has_neg = true;
        }
        if has_pos && has_neg {
            return false;
        }
    }
    true
}

/// Shrink `quad` by moving every vertex `inset` units along the bisector of
/// its adjacent edge normals.
///
/// The bisector is flipped when needed so it points toward the midpoint of
/// the vertex's neighbours. A vertex whose bisector collapses (near-zero angle
/// or coincident neighbours) is left where it is.
#[must_use]
pub fn inset_quad(quad: &Quad, inset: f64) -> Quad {
    std::array::from_fn(|i| {
        let prev = quad[(i + 3) % 4];
        let curr = quad[i];
        let next = quad[(i + 1) % 4];

        let dir_a = (curr - prev).normalize_or_zero();
        let dir_b = (next - curr).normalize_or_zero();
        let n_a = Point::new(-dir_a.y, dir_a.x);
        let n_b = Point::new(-dir_b.y, dir_b.x);

        let mut bisector = (n_a + n_b).normalize_or_zero();
        if bisector.dot(prev.midpoint(next) - curr) < 0.0 {
            bisector = -bisector;
        }
        curr + bisector * inset
    })
}

/// Intersection point of segments `[p1, p2]` and `[q1, q2]`.
///
/// Returns `None` for parallel (or degenerate) pairs and when the crossing
/// lies outside either segment.
#[must_use]
pub fn segment_intersection(p1: Point, p2: Point, q1: Point, q2: Point) -> Option<Point> {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = r.cross(s);
    if denom.abs() < GEOMETRY_EPS {
        return None;
    }

    let qp = q1 - p1;
    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    ((0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)).then(|| p1 + r * t)
}

/// Clip segment `[a, b]` to the interior of the convex `quad`.
///
/// Candidate endpoints are the original endpoints lying inside the quad plus
/// every crossing with a quad edge; the two candidates farthest apart form
/// the result, oriented so the first point is the one nearer to `a`.
/// Returns `None` when the segment never enters the quad.
#[must_use]
pub fn clip_line_to_quad(a: Point, b: Point, quad: &Quad) -> Option<(Point, Point)> {
    let a_inside = point_in_quad(a, quad);
    let b_inside = point_in_quad(b, quad);
    if a_inside && b_inside {
        return Some((a, b));
    }

    // At most one endpoint plus four edge crossings.
    let mut candidates = [Point::default(); 6];
    let mut count = 0;
    for (p, inside) in [(a, a_inside), (b, b_inside)] {
        if inside {
            candidates[count] = p;
            count += 1;
        }
    }
    for (i, &q1) in quad.iter().enumerate() {
        if let Some(hit) = segment_intersection(a, b, q1, quad[(i + 1) % 4]) {
            candidates[count] = hit;
            count += 1;
        }
    }
    if count < 2 {
        return None;
    }

    let candidates = &candidates[..count];
    let mut best = (candidates[0], candidates[1]);
    let mut best_dist = -1.0;
    for (i, &p) in candidates.iter().enumerate() {
        for &q in &candidates[i + 1..] {
            let d = p.distance_squared(q);
            if d > best_dist {
                best_dist = d;
                best = (p, q);
            }
        }
    }

    let (p, q) = best;
    if a.distance_squared(q) < a.distance_squared(p) {
        Some((q, p))
    } else {
        Some((p, q))
    }
}

/// Unsigned area enclosed by `quad` (shoelace formula).
#[must_use]
pub fn quad_area(quad: &Quad) -> f64 {
    let mut twice_area = 0.0;
    for (i, &p) in quad.iter().enumerate() {
        twice_area += p.cross(quad[(i + 1) % 4]);
    }
    twice_area.abs() * 0.5
}

/// Returns `true` when `quad` has non-negligible area and its opposite edges
/// do not cross each other.
#[must_use]
pub fn is_simple_quad(quad: &Quad) -> bool {
    if quad_area(quad) < GEOMETRY_EPS * GEOMETRY_EPS {
        return false;
    }
    segment_intersection(quad[0], quad[1], quad[2], quad[3]).is_none()
        && segment_intersection(quad[1], quad[2], quad[3], quad[0]).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit_square() -> Quad {
        [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_point_in_unit_square() {
        let quad = unit_square();
        assert!(point_in_quad(Point::new(0.5, 0.5), &quad));
        assert!(!point_in_quad(Point::new(2.0, 2.0), &quad));
        // Boundary points count as inside.
        assert!(point_in_quad(Point::new(0.0, 0.5), &quad));
        assert!(point_in_quad(Point::new(1.0, 1.0), &quad));
    }

    #[test]
    fn test_point_in_quad_either_winding() {
        let mut quad = unit_square();
        quad.reverse();
        assert!(point_in_quad(Point::new(0.25, 0.75), &quad));
        assert!(!point_in_quad(Point::new(-0.1, 0.5), &quad));
    }

    #[test]
    fn test_point_on_edge_line_first() {
        // The first edge's cross product is zero here; the remaining edges
        // must still be able to reject the point.
        let quad = unit_square();
        assert!(!point_in_quad(Point::new(2.0, 0.0), &quad));
    }

    #[test]
    fn test_clip_horizontal_through_square() {
        let quad = unit_square();
        let (a, b) = clip_line_to_quad(Point::new(-1.0, 0.5), Point::new(2.0, 0.5), &quad)
            .expect("segment crosses the square");
        assert!(approx(a, Point::new(0.0, 0.5)), "got {a:?}");
        assert!(approx(b, Point::new(1.0, 0.5)), "got {b:?}");
    }

    #[test]
    fn test_clip_keeps_direction() {
        let quad = unit_square();
        let (a, b) = clip_line_to_quad(Point::new(2.0, 0.5), Point::new(-1.0, 0.5), &quad)
            .expect("segment crosses the square");
        assert!(approx(a, Point::new(1.0, 0.5)));
        assert!(approx(b, Point::new(0.0, 0.5)));
    }

    #[test]
    fn test_clip_both_inside_is_identity() {
        let quad = unit_square();
        let a = Point::new(0.2, 0.3);
        let b = Point::new(0.7, 0.9);
        assert_eq!(clip_line_to_quad(a, b, &quad), Some((a, b)));
    }

    #[test]
    fn test_clip_one_endpoint_inside() {
        let quad = unit_square();
        let (a, b) = clip_line_to_quad(Point::new(0.5, 0.5), Point::new(0.5, 3.0), &quad)
            .expect("segment leaves through the top edge");
        assert!(approx(a, Point::new(0.5, 0.5)));
        assert!(approx(b, Point::new(0.5, 1.0)));
    }

    #[test]
    fn test_clip_miss_returns_none() {
        let quad = unit_square();
        assert!(clip_line_to_quad(Point::new(2.0, 2.0), Point::new(3.0, 5.0), &quad).is_none());
        assert!(clip_line_to_quad(Point::new(-1.0, 2.0), Point::new(2.0, 2.0), &quad).is_none());
    }

    #[test]
    fn test_clip_along_edge() {
        // Parallel to two edges: only the perpendicular edges contribute.
        let quad = unit_square();
        let (a, b) = clip_line_to_quad(Point::new(-1.0, 0.0), Point::new(2.0, 0.0), &quad)
            .expect("segment runs along the bottom edge");
        assert!(approx(a, Point::new(0.0, 0.0)));
        assert!(approx(b, Point::new(1.0, 0.0)));
    }

    #[test]
    fn test_segment_intersection_parallel() {
        let hit = segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_inset_square() {
        let quad = unit_square();
        let inset = inset_quad(&quad, 0.1 * std::f64::consts::SQRT_2);
        assert!(approx(inset[0], Point::new(0.1, 0.1)), "got {:?}", inset[0]);
        assert!(approx(inset[2], Point::new(0.9, 0.9)), "got {:?}", inset[2]);
    }

    #[test]
    fn test_inset_is_winding_agnostic() {
        let mut quad = unit_square();
        quad.reverse();
        let inset = inset_quad(&quad, 0.05);
        for p in inset {
            assert!(p.x > 0.0 && p.x < 1.0 && p.y > 0.0 && p.y < 1.0, "{p:?} left the square");
        }
    }

    #[test]
    fn test_inset_degenerate_corner_stays() {
        // Vertices 1 and 2 coincide; their bisectors collapse.
        let quad = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ];
        let inset = inset_quad(&quad, 0.1);
        assert!(inset.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn test_inset_area_monotonic() {
        let quad = [
            Point::new(10.0, 12.0),
            Point::new(220.0, 30.0),
            Point::new(200.0, 180.0),
            Point::new(25.0, 160.0),
        ];
        let mut last = quad_area(&quad);
        for step in 1..=10 {
            let area = quad_area(&inset_quad(&quad, f64::from(step) * 5.0));
            assert!(area < last, "inset {step}: {area} !< {last}");
            last = area;
        }
    }

    #[test]
    fn test_quad_area_and_simplicity() {
        let quad = unit_square();
        assert!((quad_area(&quad) - 1.0).abs() < 1e-12);
        assert!(is_simple_quad(&quad));

        let bowtie = [quad[0], quad[2], quad[1], quad[3]];
        assert!(!is_simple_quad(&bowtie));

        let collinear = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
        ];
        assert!(!is_simple_quad(&collinear));
    }

    proptest! {
        #[test]
        fn prop_clipped_segment_stays_in_rectangle(
            x0 in -50.0..50.0f64, y0 in -50.0..50.0f64,
            w in 1.0..100.0f64, h in 1.0..100.0f64,
            ax in -200.0..200.0f64, ay in -200.0..200.0f64,
            bx in -200.0..200.0f64, by in -200.0..200.0f64,
        ) {
            let quad = [
                Point::new(x0, y0),
                Point::new(x0 + w, y0),
                Point::new(x0 + w, y0 + h),
                Point::new(x0, y0 + h),
            ];
            let a = Point::new(ax, ay);
            let b = Point::new(bx, by);
            if let Some((ca, cb)) = clip_line_to_quad(a, b, &quad) {
                let tol = 1e-7;
                for p in [ca, cb] {
                    prop_assert!(p.x >= x0 - tol && p.x <= x0 + w + tol, "{:?}", p);
                    prop_assert!(p.y >= y0 - tol && p.y <= y0 + h + tol, "{:?}", p);
                    // Clipped endpoints stay on the original carrier line.
                    let off_line = (b - a).cross(p - a).abs() / (b - a).norm().max(1e-12);
                    prop_assert!(off_line < 1e-6, "{} off the line", off_line);
                }
                let full = a.distance_squared(b);
                prop_assert!(ca.distance_squared(cb) <= full * (1.0 + 1e-9) + 1e-9);
            }
        }
    }
}
