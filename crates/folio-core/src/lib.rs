//! Core anchoring logic for the Folio paper-tracking library.
//!
//! Folio takes the corners and edge segments a 2D detector finds on a sheet
//! of paper and anchors them into a live AR scene, so overlays stay glued to
//! the sheet while the camera moves.
//!
//! # Architecture Overview
//!
//! Each call to [`AnchorPipeline::process_frame`] runs these stages:
//!
//! 1. **Normalization**:
//!    - Raw sensor pixels are mapped through the frame's display transform
//!      into viewport space, with any encoded top crop removed.
//!
//! 2. **Ordering**:
//!    - The four corners are sorted by angle around their centroid so each
//!      corner keeps its slot from frame to frame.
//!
//! 3. **Anchoring**:
//!    - Every corner is raycast against the tracked scene. The first plane
//!      hit locks the pass so all corners share one plane; misses fall back
//!      to a fixed distance along the ray.
//!    - Per-slot smoothing and lost-frame bookkeeping live in
//!      [`resolver::AnchorState`].
//!
//! 4. **Line clipping**:
//!    - Detected edge segments are anchored on the corners' plane, then
//!      clipped to the anchored sheet in the sheet's own plane.
//!
//! # Example
//!
//! ```
//! use folio_core::{AnchorPipeline, FrameInput, FrameOutput, ImageSize};
//! use folio_core::camera::{PinholeCamera, Pose};
//! use folio_core::display::DisplayTransform;
//! use folio_core::geometry::Point;
//! use folio_core::scene::{HitCategory, PlaneId, Ray, RaycastHit};
//! use nalgebra::{Point3, Vector3};
//!
//! // A tracked floor at y = 0.
//! let floor = |ray: &Ray| {
//!     let t = -ray.origin.y / ray.direction.y;
//!     vec![RaycastHit {
//!         position: ray.point_at(t),
//!         plane_id: Some(PlaneId(1)),
//!         distance: t,
//!         category: HitCategory::PlaneWithinPolygon,
//!     }]
//! };
//! let pose = Pose::look_at(Point3::new(0.0, 1.0, -0.5), Point3::origin(), Vector3::y()).unwrap();
//! let camera = PinholeCamera::from_fov(1.0, 0.75, pose);
//!
//! let input = FrameInput::new(ImageSize::new(640, 480).unwrap())
//!     .with_transform(DisplayTransform::identity())
//!     .with_corners([
//!         Point::new(200.0, 150.0),
//!         Point::new(440.0, 150.0),
//!         Point::new(440.0, 330.0),
//!         Point::new(200.0, 330.0),
//!     ]);
//!
//! let mut pipeline = AnchorPipeline::new();
//! match pipeline.process_frame(&input, &camera, &floor) {
//!     FrameOutput::Anchored(frame) => {
//!         assert!(frame.quad.iter().all(|a| !a.fallback));
//!         assert_eq!(frame.master_plane, Some(PlaneId(1)));
//!     }
//!     FrameOutput::Hidden(reason) => panic!("frame hidden: {reason:?}"),
//! }
//! ```

/// Viewport-to-ray camera model.
pub mod camera;
/// Configuration types for the anchoring pipeline.
pub mod config;
/// Display-transform normalization.
pub mod display;
/// Per-frame inputs and raw buffer decoding.
pub mod frame;
/// 2D quad geometry primitives.
pub mod geometry;
/// Canonical corner ordering.
pub mod order;
/// Plane frames and world-space clipping.
pub mod plane;
/// Plane anchor resolution and temporal state.
pub mod resolver;
/// Raycast contract of the tracking runtime.
pub mod scene;
/// Utilities for testing and synthetic scene generation.
pub mod test_utils;

pub use crate::config::AnchorConfig;
pub use crate::frame::{FrameInput, ImageSize};
use crate::camera::ViewportCamera;
use crate::config::OrderSpace;
use crate::display::DisplayTransform;
use crate::frame::MAX_DETECTED_LINES;
use crate::geometry::{LineSegment, Quad};
use crate::resolver::{AnchorState, PlaneAnchor};
use crate::scene::{PlaneId, RaycastQuery};
use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;
use nalgebra::Point3;

/// Furthest stage a frame reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameStage {
    /// Nothing usable arrived.
    #[default]
    NoFrame,
    /// Corners were detected.
    Detected,
    /// Corners were mapped into the viewport.
    Normalized,
    /// Corners were put in cyclic order.
    Ordered,
    /// Corners were anchored in world space.
    Anchored,
    /// Lines were anchored and clipped.
    Clipped,
}

/// Pipeline-wide statistics for a single frame.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineStats {
    /// Time taken for normalization and ordering in milliseconds.
    pub normalize_ms: f64,
    /// Time taken for corner anchoring in milliseconds.
    pub resolve_ms: f64,
    /// Time taken for line anchoring and clipping in milliseconds.
    pub clip_ms: f64,
    /// Total pipeline time in milliseconds.
    pub total_ms: f64,
    /// Number of corners placed by fallback.
    pub num_fallback: usize,
    /// Number of detected line segments.
    pub num_lines_in: usize,
    /// Number of segments surviving the clip.
    pub num_lines_clipped: usize,
    /// Furthest stage reached.
    pub stage: FrameStage,
}

/// Why nothing should be drawn this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HideReason {
    /// The platform gave no display transform.
    NoTransform,
    /// The detector found no sheet.
    NoDetection,
}

/// An edge segment anchored and clipped to the sheet.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClippedLine {
    /// World segment, starting on the side of the detected first endpoint.
    pub segment: LineSegment<Point3<f64>>,
    /// Whether each detected endpoint missed the tracked plane and was
    /// carried along its ray onto the sheet instead.
    pub fallback: [bool; 2],
}

/// A sheet anchored in world space.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnchoredFrame {
    /// Anchored corners in cyclic order.
    pub quad: [PlaneAnchor; 4],
    /// The same corners in viewport space.
    pub viewport_quad: Quad,
    /// Edge segments clipped to the sheet, in world space.
    pub lines: Vec<ClippedLine>,
    /// Plane the corners are locked to.
    pub master_plane: Option<PlaneId>,
    /// Timings and counters.
    pub stats: PipelineStats,
}

/// Result of one [`AnchorPipeline::process_frame`] call.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameOutput {
    /// Hide the overlay.
    Hidden(HideReason),
    /// Draw the overlay here.
    Anchored(AnchoredFrame),
}

impl FrameOutput {
    /// The anchored frame, if any.
    #[must_use]
    pub fn anchored(&self) -> Option<&AnchoredFrame> {
        match self {
            Self::Anchored(frame) => Some(frame),
            Self::Hidden(_) => None,
        }
    }

    /// The hide reason, if hidden.
    #[must_use]
    pub fn hide_reason(&self) -> Option<HideReason> {
        match self {
            Self::Hidden(reason) => Some(*reason),
            Self::Anchored(_) => None,
        }
    }
}

/// The main entry point for anchoring detections.
///
/// The pipeline holds the per-frame arena and the temporal state of the
/// corner and line anchor groups. Run one pipeline per tracked sheet.
pub struct AnchorPipeline {
    arena: Bump,
    config: AnchorConfig,
    line_config: AnchorConfig,
    corner_state: AnchorState,
    line_state: AnchorState,
    last_transform: Option<DisplayTransform>,
    last_stats: PipelineStats,
}

impl AnchorPipeline {
    /// Create a new pipeline with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AnchorConfig::default())
    }

    /// Create a pipeline with custom configuration.
    #[must_use]
    pub fn with_config(config: AnchorConfig) -> Self {
        Self {
            arena: Bump::new(),
            line_config: config.for_line_endpoints(),
            config,
            corner_state: AnchorState::new(4),
            line_state: AnchorState::default(),
            last_transform: None,
            last_stats: PipelineStats::default(),
        }
    }

    /// Get the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &AnchorConfig {
        &self.config
    }

    /// Temporal state of the corner group.
    #[must_use]
    pub fn corner_state(&self) -> &AnchorState {
        &self.corner_state
    }

    /// Temporal state of the line endpoints.
    #[must_use]
    pub fn line_state(&self) -> &AnchorState {
        &self.line_state
    }

    /// Statistics of the most recent frame, hidden or not.
    #[must_use]
    pub fn last_stats(&self) -> PipelineStats {
        self.last_stats
    }

    /// Drop all temporal state, as on a tracking-session restart.
    pub fn reset(&mut self) {
        self.corner_state.reset();
        self.line_state = AnchorState::default();
        self.last_transform = None;
    }

    /// Anchor one frame's detections.
    ///
    /// Never fails: missing inputs produce [`FrameOutput::Hidden`], missing
    /// plane hits produce fallback anchors.
    pub fn process_frame<C, S>(
        &mut self,
        input: &FrameInput<'_>,
        camera: &C,
        scene: &S,
    ) -> FrameOutput
    where
        C: ViewportCamera + ?Sized,
        S: RaycastQuery + ?Sized,
    {
        let start_total = std::time::Instant::now();
        let mut stats = PipelineStats::default();
        self.arena.reset();

        let Some(transform) = input.transform else {
            tracing::warn!("no display transform for this frame, hiding overlay");
            return self.hide(HideReason::NoTransform, stats, start_total);
        };
        self.observe_transform(&transform, input);

        let Some(corners) = input.corners else {
            tracing::debug!("no sheet detected");
            self.corner_state.note_missing_source(&self.config);
            self.line_state.reset();
            return self.hide(HideReason::NoDetection, stats, start_total);
        };
        stats.stage = FrameStage::Detected;

        let size = input.image_size;
        let crop = self.config.crop_correction;

        let start_norm = std::time::Instant::now();
        let viewport_quad = {
            let _span = tracing::info_span!("normalize").entered();
            let normalized = corners.map(|p| transform.normalize(p, size, crop));
            stats.stage = FrameStage::Normalized;
            let order = match self.config.order_space {
                OrderSpace::Pixel => order::corner_order(&corners),
                OrderSpace::Viewport => order::corner_order(&normalized),
            };
            order.map(|i| normalized[i])
        };
        stats.normalize_ms = start_norm.elapsed().as_secs_f64() * 1000.0;
        stats.stage = FrameStage::Ordered;
        if !geometry::is_simple_quad(&viewport_quad) {
            tracing::debug!("ordered quad is degenerate or self-intersecting");
        }

        let start_resolve = std::time::Instant::now();
        let quad = {
            let _span = tracing::info_span!("resolve_corners").entered();
            resolver::resolve_group(
                viewport_quad,
                camera,
                scene,
                &self.config,
                &mut self.corner_state,
            )
        };
        stats.resolve_ms = start_resolve.elapsed().as_secs_f64() * 1000.0;
        stats.num_fallback = quad.iter().filter(|a| a.fallback).count();
        stats.stage = FrameStage::Anchored;

        let mut lines = Vec::new();
        stats.num_lines_in = input.lines.len();
        if self.config.clip_lines && !input.lines.is_empty() {
            let start_clip = std::time::Instant::now();
            let _span = tracing::info_span!("clip_lines").entered();
            lines = self.anchor_lines(input, &transform, &quad, camera, scene);
            stats.clip_ms = start_clip.elapsed().as_secs_f64() * 1000.0;
            stats.stage = FrameStage::Clipped;
        }
        stats.num_lines_clipped = lines.len();

        stats.total_ms = start_total.elapsed().as_secs_f64() * 1000.0;
        self.last_stats = stats;

        FrameOutput::Anchored(AnchoredFrame {
            quad,
            viewport_quad,
            lines,
            master_plane: self.corner_state.master_plane(),
            stats,
        })
    }

    fn hide(
        &mut self,
        reason: HideReason,
        mut stats: PipelineStats,
        start_total: std::time::Instant,
    ) -> FrameOutput {
        stats.total_ms = start_total.elapsed().as_secs_f64() * 1000.0;
        self.last_stats = stats;
        FrameOutput::Hidden(reason)
    }

    fn observe_transform(&mut self, transform: &DisplayTransform, input: &FrameInput<'_>) {
        if self.last_transform.as_ref() == Some(transform) {
            return;
        }
        let bounds = transform.image_bounds(input.image_size, self.config.crop_correction);
        tracing::debug!(
            top_crop = ?transform.top_crop(),
            ?bounds,
            "display transform changed"
        );
        self.last_transform = Some(*transform);
    }

    /// Anchor line endpoints on the corners' plane and clip them to the sheet.
    ///
    /// At most [`MAX_DETECTED_LINES`] segments are used. Endpoints that miss
    /// the tracked plane are moved along their ray onto the sheet's plane.
    fn anchor_lines<C, S>(
        &mut self,
        input: &FrameInput<'_>,
        transform: &DisplayTransform,
        quad: &[PlaneAnchor; 4],
        camera: &C,
        scene: &S,
    ) -> Vec<ClippedLine>
    where
        C: ViewportCamera + ?Sized,
        S: RaycastQuery + ?Sized,
    {
        let world_quad = quad.map(|a| a.position);
        let Some(frame) = plane::PlaneFrame::from_quad(&world_quad) else {
            tracing::debug!("anchored quad is degenerate, dropping lines");
            return Vec::new();
        };
        let local_quad = frame.flatten_quad(&world_quad);

        let lines = &input.lines[..input.lines.len().min(MAX_DETECTED_LINES)];
        if lines.len() < input.lines.len() {
            tracing::debug!(
                detected = input.lines.len(),
                kept = lines.len(),
                "too many lines, extra segments ignored"
            );
        }

        let size = input.image_size;
        let crop = self.config.crop_correction;
        let endpoints = BumpVec::from_iter_in(
            lines
                .iter()
                .map(|s| transform.normalize_segment(s, size, crop))
                .flat_map(|s| [s.a, s.b]),
            &self.arena,
        );

        self.line_state.begin_pass(self.corner_state.master_plane());
        let anchored = BumpVec::from_iter_in(
            endpoints.iter().enumerate().map(|(slot, &p)| {
                let mut anchor =
                    resolver::resolve(p, slot, camera, scene, &self.line_config, &mut self.line_state);
                if anchor.fallback {
                    let ray = camera.viewport_point_to_ray(p);
                    if let Some(on_sheet) = frame.intersect_ray(&ray) {
                        anchor.position = on_sheet;
                    }
                }
                anchor
            }),
            &self.arena,
        );
        self.line_state.end_pass(&self.line_config);

        anchored
            .chunks_exact(2)
            .filter_map(|pair| {
                let segment = LineSegment::new(pair[0].position, pair[1].position);
                plane::clip_segment_in_frame(
                    &frame,
                    &segment,
                    &local_quad,
                    self.config.line_clip_inset,
                )
                .map(|segment| ClippedLine {
                    segment,
                    fallback: [pair[0].fallback, pair[1].fallback],
                })
            })
            .collect()
    }
}

impl Default for AnchorPipeline {
    fn default() -> Self {
        Self::new()
    }
}
