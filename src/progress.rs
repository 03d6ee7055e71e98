//! # Route Progress Tracking
//!
//! Splits an active route into driven and remaining geometry on every GPS fix.
//!
//! [`ProgressTracker`] owns the route polyline for one navigation session. Each
//! location update snaps the fix to the route via the [`SpatialIndex`] and
//! produces a [`RouteProgress`] snapshot: the snapped position plus the driven
//! and remaining coordinate sequences the renderer draws as two differently
//! styled polylines.
//!
//! ## Driven/remaining seam
//!
//! The driven line does not end directly under the vehicle icon. Its last two
//! points are interpolated behind the snapped position, first 3 m behind and
//! then 6 m behind, so the icon never covers the line cap. The remaining line
//! starts at the un-offset snapped point, and the two lines meet at
//! approximately the vehicle's true position. The offsets are presentation
//! tuning values, overridable via [`ProgressConfig`].
//!
//! ## States
//!
//! The tracker is either **inactive** (no route, or flushed) or **active**
//! (route set, non-empty). Calling [`calculate_progress`] while inactive returns
//! a zero-valued snapshot rather than an error, since callers poll on every fix
//! and the route may simply not be set yet.
//!
//! `driven_distance` is passed through from the caller unchanged. The tracker
//! does geometric snapping only; cumulative odometry comes from an independent
//! source because the snapped fraction alone is not distance-stable across
//! segments of varying length.

use crate::geo_utils::{haversine_distance, interpolate, safe_ratio};
use crate::spatial_index::SpatialIndex;
use crate::{GpsPoint, RoutePosition};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Visual offsets for the driven/remaining seam, in meters behind the snapped
/// position. Defaults: 3 m for the driven line's second-to-last point, 6 m for
/// its final point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressConfig {
    /// Distance behind the vehicle for the driven line's second-to-last point.
    pub seam_offset_meters: f64,
    /// Distance behind the vehicle at which the driven line ends.
    pub seam_back_offset_meters: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            seam_offset_meters: 3.0,
            seam_back_offset_meters: 6.0,
        }
    }
}

/// Snapshot of traversal progress along the active route.
///
/// Recomputed on every location update; carries no identity and is not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteProgress {
    /// Total route length in meters, fixed for the route.
    pub total_distance: f64,
    /// Cumulative driven meters, supplied by the caller's odometry source.
    pub driven_distance: f64,
    /// The snapped position on the route.
    pub last_position: RoutePosition,
    /// Route start through the snapped position (with the seam points appended).
    pub driven_points: Vec<GpsPoint>,
    /// Snapped position through the route end.
    pub remaining_points: Vec<GpsPoint>,
}

impl RouteProgress {
    /// The zero-valued snapshot returned while no route is active.
    pub fn empty() -> Self {
        Self {
            total_distance: 0.0,
            driven_distance: 0.0,
            last_position: RoutePosition::empty(),
            driven_points: Vec::new(),
            remaining_points: Vec::new(),
        }
    }

    /// Completion percentage in [0, 100]. Zero when the route length is unknown.
    pub fn percentage_complete(&self) -> f64 {
        if self.total_distance <= 0.0 {
            return 0.0;
        }
        (self.driven_distance / self.total_distance) * 100.0
    }
}

/// Tracks traversal progress along one active route.
///
/// # Example
///
/// ```rust
/// use route_tracker::{GpsPoint, ProgressTracker};
///
/// let route = vec![
///     GpsPoint::new(0.0, 0.0),
///     GpsPoint::new(0.0, 0.001),
///     GpsPoint::new(0.0, 0.002),
/// ];
///
/// let mut tracker = ProgressTracker::new();
/// tracker.set_route(&route, 222.6);
///
/// let progress = tracker.calculate_progress(&GpsPoint::new(0.0, 0.0005), 55.6);
/// assert_eq!(progress.last_position.coordinate_index, 0);
/// assert!(progress.percentage_complete() > 24.0);
/// ```
#[derive(Debug)]
pub struct ProgressTracker {
    index: SpatialIndex,
    points: Vec<GpsPoint>,
    total_distance: f64,
    config: ProgressConfig,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_config(ProgressConfig::default())
    }

    pub fn with_config(config: ProgressConfig) -> Self {
        Self {
            index: SpatialIndex::new(),
            points: Vec::new(),
            total_distance: 0.0,
            config,
        }
    }

    /// Set or replace the active route and rebuild the spatial index.
    ///
    /// Safe to call again mid-session (reroute); prior state is fully replaced.
    /// An empty polyline leaves the tracker inactive.
    pub fn set_route(&mut self, points: &[GpsPoint], total_distance: f64) {
        self.points = points.to_vec();
        self.total_distance = total_distance;
        self.index.reindex(points);
        info!(
            "route set: {} points, {:.0}m total",
            points.len(),
            total_distance
        );
    }

    /// Whether a non-empty route is currently set.
    pub fn is_active(&self) -> bool {
        !self.points.is_empty()
    }

    /// Clear the route and flush the spatial index; the tracker becomes inactive.
    pub fn flush(&mut self) {
        debug!("progress tracker flushed");
        self.points.clear();
        self.total_distance = 0.0;
        self.index.flush();
    }

    /// Compute a progress snapshot for a location fix.
    ///
    /// `distance_from_start` is the caller's cumulative driven distance in
    /// meters; it is carried into the snapshot unchanged. While inactive this
    /// returns [`RouteProgress::empty`] and never fails.
    pub fn calculate_progress(
        &self,
        location: &GpsPoint,
        distance_from_start: f64,
    ) -> RouteProgress {
        if !self.is_active() {
            return RouteProgress::empty();
        }

        let position = self.index.find_exact_position(location);
        let (driven_points, remaining_points) = self.split_coordinates(&position);

        RouteProgress {
            total_distance: self.total_distance,
            driven_distance: distance_from_start,
            last_position: position,
            driven_points,
            remaining_points,
        }
    }

    /// Split the route polyline at a snapped position.
    ///
    /// Mid-route, `driven` is every coordinate up to and including the snapped
    /// segment's start, followed by the two seam points (3 m behind the snapped
    /// position, then 6 m behind); `remaining` starts at the exact snapped point
    /// and continues with the rest of the polyline. Positions at or past the
    /// final coordinate degrade to all-driven / single-tail splits.
    fn split_coordinates(&self, position: &RoutePosition) -> (Vec<GpsPoint>, Vec<GpsPoint>) {
        let coords = &self.points;
        let i = position.coordinate_index;

        if i >= coords.len() {
            // Past the end of the polyline: everything is driven.
            return (coords.clone(), Vec::new());
        }

        let mut driven: Vec<GpsPoint> = coords[..i].to_vec();

        if i + 1 < coords.len() {
            let start = coords[i];
            let end = coords[i + 1];
            let segment_length = haversine_distance(&start, &end);
            let along = position.distance_from_segment_start;

            let back_ratio =
                safe_ratio(along - self.config.seam_back_offset_meters, segment_length);
            let seam_ratio = safe_ratio(along - self.config.seam_offset_meters, segment_length);
            let current_ratio = safe_ratio(along, segment_length);

            driven.push(start);
            driven.push(interpolate(&start, &end, seam_ratio));
            driven.push(interpolate(&start, &end, back_ratio));

            let mut remaining = Vec::with_capacity(coords.len() - i);
            remaining.push(interpolate(&start, &end, current_ratio));
            remaining.extend_from_slice(&coords[i + 1..]);

            (driven, remaining)
        } else {
            // Snapped to the final coordinate: the tail is all that remains.
            (driven, vec![coords[i]])
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
