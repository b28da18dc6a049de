//! Canonical cyclic ordering of four detected corners.
//!
//! The detector reports corners in arbitrary order. Everything downstream
//! (per-slot smoothing, edge iteration in the clipper) needs a stable cyclic
//! sequence, so corners are sorted by polar angle around their centroid.

use crate::geometry::{Point, Quad};

/// Order four points by ascending `atan2` angle around their centroid.
///
/// The result is a cyclic sequence (counter-clockwise for y-up coordinates,
/// clockwise for y-down pixel coordinates) starting at the point with the
/// smallest angle in `(-π, π]`. Coincident or collinear points still produce
/// a permutation of the input; the sort is stable so ties keep input order.
#[must_use]
pub fn order_corners(points: [Point; 4]) -> Quad {
    corner_order(&points).map(|i| points[i])
}

/// The permutation [`order_corners`] applies: `order[k]` is the input index
/// of the `k`-th ordered corner.
///
/// Lets callers order one representation of the corners (raw pixels) and
/// apply the same permutation to another (viewport points).
#[must_use]
pub fn corner_order(points: &[Point; 4]) -> [usize; 4] {
    let centroid = points.iter().fold(Point::default(), |acc, &p| acc + p) * 0.25;

    let mut order = [0, 1, 2, 3];
    let angle = |i: usize| (points[i].y - centroid.y).atan2(points[i].x - centroid.x);
    order.sort_by(|&a, &b| angle(a).total_cmp(&angle(b)));
    order
}
