//! Configuration for the anchoring pipeline.
//!
//! [`AnchorConfig`] is fixed when the [`crate::AnchorPipeline`] is built. Two
//! presets reproduce the historical pipeline variants:
//! - [`AnchorConfig::corner_markers`]: corner markers lifted slightly off the
//!   sheet and smoothed between frames.
//! - [`AnchorConfig::edge_lines`]: raw edge anchoring on any geometry the
//!   runtime reports, one metre out when nothing is hit.

use crate::scene::HitCategory;

/// Height above the surface used by the corner-marker preset (world units).
pub const SURFACE_CLEARANCE: f64 = 0.1;
/// Per-frame blend toward the new position used for corner smoothing.
pub const SMOOTHING_BLEND: f64 = 0.25;
/// Fallback distance along the ray for corners with no plane hit.
pub const CORNER_FALLBACK_DISTANCE: f64 = 0.5;
/// Fallback distance along the ray for generic viewport-to-world lifts.
pub const VIEWPORT_FALLBACK_DISTANCE: f64 = 1.0;

/// Coordinate space in which the four corners are ordered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderSpace {
    /// Order raw detector pixels before normalization.
    #[default]
    Pixel,
    /// Order after mapping into the viewport, so the display transform
    /// cannot mirror the cyclic sequence.
    Viewport,
}

/// Pipeline-level configuration for anchoring.
///
/// # Example
/// ```
/// use folio_core::config::AnchorConfig;
///
/// let config = AnchorConfig::builder()
///     .surface_offset(0.02)
///     .lost_frame_tolerance(3)
///     .build();
/// assert_eq!(config.lost_frame_tolerance, 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnchorConfig {
    /// Space in which corners are ordered (default: pixel).
    pub order_space: OrderSpace,
    /// Remove the top crop encoded in the display transform (default: true).
    pub crop_correction: bool,
    /// Accepted hit categories in rank order (default: plane within polygon).
    /// The first category with a qualifying hit wins.
    pub accepted_hits: Vec<HitCategory>,
    /// Distance along the ray used when nothing qualifies (default: 0.5).
    pub fallback_distance: f64,
    /// Offset along the plane normal applied to plane hits (default: 0.0).
    pub surface_offset: f64,
    /// Blend toward the new position per frame (default: 0.25).
    /// Values outside `(0, 1)` disable smoothing.
    pub smoothing_blend: f64,
    /// Consecutive frames without a quad or without any plane hit tolerated
    /// before the anchor state resets (default: 0, reset immediately).
    pub lost_frame_tolerance: u32,
    /// Anchor and clip detected line segments (default: true).
    pub clip_lines: bool,
    /// Inset applied to the anchored quad before clipping lines, in world
    /// units (default: 0.0).
    pub line_clip_inset: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            order_space: OrderSpace::Pixel,
            crop_correction: true,
            accepted_hits: vec![HitCategory::PlaneWithinPolygon],
            fallback_distance: CORNER_FALLBACK_DISTANCE,
            surface_offset: 0.0,
            smoothing_blend: SMOOTHING_BLEND,
            lost_frame_tolerance: 0,
            clip_lines: true,
            line_clip_inset: 0.0,
        }
    }
}

impl AnchorConfig {
    /// Create a new builder for `AnchorConfig`.
    #[must_use]
    pub fn builder() -> AnchorConfigBuilder {
        AnchorConfigBuilder::default()
    }

    /// Corner markers: plane-polygon hits only, lifted by
    /// [`SURFACE_CLEARANCE`], smoothed, half a metre out on fallback.
    #[must_use]
    pub fn corner_markers() -> Self {
        Self {
            surface_offset: SURFACE_CLEARANCE,
            ..Self::default()
        }
    }

    /// Edge lines: any hit category, no offset, no smoothing, one metre out
    /// on fallback.
    #[must_use]
    pub fn edge_lines() -> Self {
        Self {
            accepted_hits: vec![
                HitCategory::PlaneWithinPolygon,
                HitCategory::PlaneWithinBounds,
                HitCategory::PlaneEstimated,
                HitCategory::FeaturePoint,
                HitCategory::Depth,
            ],
            fallback_distance: VIEWPORT_FALLBACK_DISTANCE,
            smoothing_blend: 1.0,
            ..Self::default()
        }
    }

    /// The configuration used for line endpoints: same hit policy, no smoothing.
    #[must_use]
    pub fn for_line_endpoints(&self) -> Self {
        Self {
            smoothing_blend: 1.0,
            ..self.clone()
        }
    }

    /// Whether smoothing is active.
    #[must_use]
    pub fn smoothing_enabled(&self) -> bool {
        self.smoothing_blend > 0.0 && self.smoothing_blend < 1.0
    }
}

/// Builder for [`AnchorConfig`].
#[derive(Default)]
pub struct AnchorConfigBuilder {
    order_space: Option<OrderSpace>,
    crop_correction: Option<bool>,
    accepted_hits: Option<Vec<HitCategory>>,
    fallback_distance: Option<f64>,
    surface_offset: Option<f64>,
    smoothing_blend: Option<f64>,
    lost_frame_tolerance: Option<u32>,
    clip_lines: Option<bool>,
    line_clip_inset: Option<f64>,
}

impl AnchorConfigBuilder {
    /// Set the space in which corners are ordered.
    #[must_use]
    pub fn order_space(mut self, space: OrderSpace) -> Self {
        self.order_space = Some(space);
        self
    }

    /// Enable or disable top-crop removal.
    #[must_use]
    pub fn crop_correction(mut self, enable: bool) -> Self {
        self.crop_correction = Some(enable);
        self
    }

    /// Set the accepted hit categories, highest rank first.
    #[must_use]
    pub fn accepted_hits(mut self, categories: &[HitCategory]) -> Self {
        self.accepted_hits = Some(categories.to_vec());
        self
    }

    /// Set the fallback distance along the ray.
    #[must_use]
    pub fn fallback_distance(mut self, distance: f64) -> Self {
        self.fallback_distance = Some(distance);
        self
    }

    /// Set the offset along the plane normal.
    #[must_use]
    pub fn surface_offset(mut self, offset: f64) -> Self {
        self.surface_offset = Some(offset);
        self
    }

    /// Set the smoothing blend (1.0 disables smoothing).
    #[must_use]
    pub fn smoothing_blend(mut self, blend: f64) -> Self {
        self.smoothing_blend = Some(blend);
        self
    }

    /// Set how many lost frames are tolerated before the state resets.
    #[must_use]
    pub fn lost_frame_tolerance(mut self, frames: u32) -> Self {
        self.lost_frame_tolerance = Some(frames);
        self
    }

    /// Enable or disable line anchoring and clipping.
    #[must_use]
    pub fn clip_lines(mut self, enable: bool) -> Self {
        self.clip_lines = Some(enable);
        self
    }

    /// Set the quad inset used when clipping lines.
    #[must_use]
    pub fn line_clip_inset(mut self, inset: f64) -> Self {
        self.line_clip_inset = Some(inset);
        self
    }

    /// Build the configuration, using defaults for unset fields.
    #[must_use]
    pub fn build(self) -> AnchorConfig {
        let d = AnchorConfig::default();
        AnchorConfig {
            order_space: self.order_space.unwrap_or(d.order_space),
            crop_correction: self.crop_correction.unwrap_or(d.crop_correction),
            accepted_hits: self.accepted_hits.unwrap_or(d.accepted_hits),
            fallback_distance: self.fallback_distance.unwrap_or(d.fallback_distance),
            surface_offset: self.surface_offset.unwrap_or(d.surface_offset),
            smoothing_blend: self.smoothing_blend.unwrap_or(d.smoothing_blend),
            lost_frame_tolerance: self
                .lost_frame_tolerance
                .unwrap_or(d.lost_frame_tolerance),
            clip_lines: self.clip_lines.unwrap_or(d.clip_lines),
            line_clip_inset: self.line_clip_inset.unwrap_or(d.line_clip_inset),
        }
    }
}
