//! Lifting viewport points onto tracked planes.
//!
//! Each point is turned into a camera ray and raycast against the scene.
//! Within one pass (one frame's worth of points for an anchor group) the first
//! plane hit locks the pass to that plane, so all four corners of a sheet land
//! on the same surface even when a nearer plane overlaps part of it. Points
//! without a qualifying hit fall back to a fixed distance along their ray.
//!
//! [`AnchorState`] carries what survives between frames: per-slot history for
//! smoothing, the last master plane, and the lost-frame counter.

use crate::camera::ViewportCamera;
use crate::config::AnchorConfig;
use crate::geometry::ViewportPoint;
use crate::scene::{HitCategory, PlaneId, RaycastHit, RaycastQuery};
use nalgebra::Point3;

/// A viewport point resolved into world space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaneAnchor {
    /// World position (after offset and smoothing).
    pub position: Point3<f64>,
    /// Plane the point landed on; `None` on fallback or non-plane hits.
    pub plane_id: Option<PlaneId>,
    /// Category of the accepted hit; `None` on fallback.
    pub category: Option<HitCategory>,
    /// True when no hit qualified and the point was placed along the ray.
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct SlotState {
    previous: Option<Point3<f64>>,
    plane: Option<PlaneId>,
    fallback: bool,
}

/// Temporal state for one anchor group.
#[derive(Debug, Clone)]
pub struct AnchorState {
    slots: Vec<SlotState>,
    master_plane: Option<PlaneId>,
    in_pass: bool,
    pass_lock: Option<PlaneId>,
    pass_plane_hits: usize,
    lost_frames: u32,
    tracking_lost: bool,
}

impl Default for AnchorState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl AnchorState {
    /// Create a state with room for `slots` points. More slots are added on demand.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            slots: vec![SlotState::default(); slots],
            master_plane: None,
            in_pass: false,
            pass_lock: None,
            pass_plane_hits: 0,
            lost_frames: 0,
            tracking_lost: true,
        }
    }

    /// Forget all history, as on a tracking-session restart.
    pub fn reset(&mut self) {
        self.slots.fill(SlotState::default());
        self.master_plane = None;
        self.in_pass = false;
        self.pass_lock = None;
        self.pass_plane_hits = 0;
        self.lost_frames = 0;
        self.tracking_lost = true;
    }

    /// Start a pass, optionally pre-locked to `seed`.
    pub fn begin_pass(&mut self, seed: Option<PlaneId>) {
        self.in_pass = true;
        self.pass_lock = seed;
        self.pass_plane_hits = 0;
    }

    /// Finish a pass. A pass without any plane hit counts as a lost frame.
    pub fn end_pass(&mut self, config: &AnchorConfig) {
        if !self.commit_pass() {
            self.register_lost(config);
        }
    }

    /// Close the current pass and drop its lock. Returns whether it found a plane.
    fn commit_pass(&mut self) -> bool {
        let found = self.pass_plane_hits > 0;
        if found {
            self.master_plane = self.pass_lock;
            self.lost_frames = 0;
            self.tracking_lost = false;
        }
        self.in_pass = false;
        self.pass_lock = None;
        self.pass_plane_hits = 0;
        found
    }

    /// Record a frame where the source quad was not detected.
    pub fn note_missing_source(&mut self, config: &AnchorConfig) {
        self.register_lost(config);
    }

    fn register_lost(&mut self, config: &AnchorConfig) {
        self.lost_frames = self.lost_frames.saturating_add(1);
        if self.lost_frames > config.lost_frame_tolerance {
            tracing::debug!(lost_frames = self.lost_frames, "anchor state reset");
            self.reset();
        }
    }

    /// Plane the most recent successful pass locked onto.
    #[must_use]
    pub fn master_plane(&self) -> Option<PlaneId> {
        self.master_plane
    }

    /// True until a pass finds a plane, and again after every reset.
    #[must_use]
    pub fn is_tracking_lost(&self) -> bool {
        self.tracking_lost
    }

    /// Consecutive lost frames since the last successful pass.
    #[must_use]
    pub fn lost_frames(&self) -> u32 {
        self.lost_frames
    }

    /// Number of slots with room for history.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Last smoothed position of `slot`, if any.
    #[must_use]
    pub fn previous_position(&self, slot: usize) -> Option<Point3<f64>> {
        self.slots.get(slot).and_then(|s| s.previous)
    }

    fn slot_mut(&mut self, slot: usize) -> &mut SlotState {
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, SlotState::default());
        }
        &mut self.slots[slot]
    }
}

/// Pick the nearest hit of the highest-ranked accepted category.
/// Plane hits must match `lock` when one is set.
fn select_hit<'h>(
    hits: &'h [RaycastHit],
    accepted: &[HitCategory],
    lock: Option<PlaneId>,
) -> Option<&'h RaycastHit> {
    accepted.iter().find_map(|&category| {
        hits.iter()
            .filter(|hit| hit.category == category)
            .filter(|hit| !category.is_plane() || lock.is_none_or(|id| hit.plane_id == Some(id)))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    })
}

/// Resolve one viewport point into world space and update `state`.
///
/// `slot` identifies the point across frames for smoothing (corner index,
/// line endpoint index).
///
/// Outside a [`AnchorState::begin_pass`] / [`AnchorState::end_pass`] bracket
/// the call is a pass of its own: no lock carries over from earlier calls and
/// a plane hit becomes the master plane. Lost frames are only counted by
/// `end_pass`.
pub fn resolve<C, S>(
    point: ViewportPoint,
    slot: usize,
    camera: &C,
    scene: &S,
    config: &AnchorConfig,
    state: &mut AnchorState,
) -> PlaneAnchor
where
    C: ViewportCamera + ?Sized,
    S: RaycastQuery + ?Sized,
{
    let standalone = !state.in_pass;
    if standalone {
        state.begin_pass(None);
    }

    let ray = camera.viewport_point_to_ray(point);
    let hits = scene.raycast(&ray);

    let raw = match select_hit(&hits, &config.accepted_hits, state.pass_lock) {
        Some(hit) => {
            let plane_id = if hit.category.is_plane() {
                hit.plane_id
            } else {
                None
            };
            if let Some(id) = plane_id {
                if state.pass_lock.is_none() {
                    state.pass_lock = Some(id);
                }
                state.pass_plane_hits += 1;
            }

            let mut position = hit.position;
            if config.surface_offset != 0.0 {
                if let Some(pose) = plane_id.and_then(|id| scene.plane_pose(id)) {
                    position += pose.normal.into_inner() * config.surface_offset;
                }
            }

            PlaneAnchor {
                position,
                plane_id,
                category: Some(hit.category),
                fallback: false,
            }
        }
        None => PlaneAnchor {
            position: ray.point_at(config.fallback_distance),
            plane_id: None,
            category: None,
            fallback: true,
        },
    };

    let history = state.slot_mut(slot);
    let position = match history.previous {
        Some(prev)
            if config.smoothing_enabled()
                && history.plane == raw.plane_id
                && history.fallback == raw.fallback =>
        {
            prev + (raw.position - prev) * config.smoothing_blend
        }
        _ => raw.position,
    };
    *history = SlotState {
        previous: Some(position),
        plane: raw.plane_id,
        fallback: raw.fallback,
    };

    tracing::debug!(
        slot,
        fallback = raw.fallback,
        plane = ?raw.plane_id,
        x = position.x,
        y = position.y,
        z = position.z,
        "resolved anchor"
    );

    if standalone {
        state.commit_pass();
    }

    PlaneAnchor { position, ..raw }
}

/// Resolve a fixed-size group of points as one pass.
///
/// Point `i` uses slot `i`.
pub fn resolve_group<const N: usize, C, S>(
    points: [ViewportPoint; N],
    camera: &C,
    scene: &S,
    config: &AnchorConfig,
    state: &mut AnchorState,
) -> [PlaneAnchor; N]
where
    C: ViewportCamera + ?Sized,
    S: RaycastQuery + ?Sized,
{
    state.begin_pass(None);
    let anchors = std::array::from_fn(|i| resolve(points[i], i, camera, scene, config, state));
    state.end_pass(config);
    anchors
}
