//! # Route Tracker
//!
//! Route progress tracking and traffic congestion segmentation for live
//! turn-by-turn navigation.
//!
//! Given a planned route (an ordered polyline plus per-edge congestion
//! annotations) and a stream of vehicle location fixes, this library
//! continuously determines:
//!
//! - the "snapped" position, the exact point on the route closest to the
//!   vehicle as a segment index plus fractional offset,
//! - the split of the route into driven and remaining coordinate sequences for
//!   differential rendering,
//! - contiguous runs of route edges sharing one congestion level, anchored at
//!   the vehicle, for colored traffic overlays.
//!
//! Route planning, location providers, rendering and HTTP plumbing are external
//! collaborators: this crate is a purely in-memory geometric service over data
//! they supply.
//!
//! ## Quick Start
//!
//! ```rust
//! use route_tracker::{GpsPoint, ProgressTracker};
//!
//! // Planned route from the planner: three points along the equator
//! let route = vec![
//!     GpsPoint::new(0.0, 0.0),
//!     GpsPoint::new(0.0, 0.001),
//!     GpsPoint::new(0.0, 0.002),
//! ];
//!
//! let mut tracker = ProgressTracker::new();
//! tracker.set_route(&route, 222.6);
//!
//! // A fix arrives midway along the first segment
//! let progress = tracker.calculate_progress(&GpsPoint::new(0.0, 0.0005), 55.6);
//! assert_eq!(progress.last_position.coordinate_index, 0);
//! println!("{:.0}% complete", progress.percentage_complete());
//! ```
//!
//! ## Failure semantics
//!
//! No operation returns an error or panics for normal runtime conditions: an
//! empty route, a position past the end, a missing annotation all degenerate to
//! empty or sentinel results. A live navigation overlay must keep rendering, so
//! availability wins over strict error signaling.
//!
//! ## Concurrency
//!
//! Fixes arrive as a single logical stream and are processed one at a time.
//! Every call is synchronous, non-blocking and free of I/O; mutation
//! (`set_route`, `reindex`, `flush`, `cleanup`) takes `&mut self`, so the borrow
//! checker enforces the single-writer exclusion the model requires. Callers
//! with concurrent readers wrap a tracker in their own lock or actor.

use serde::{Deserialize, Serialize};

pub mod cache;
pub mod congestion;
pub mod geo_utils;
pub mod progress;
pub mod spatial_index;

pub use cache::RouteCache;
pub use congestion::{
    CongestionConfig, CongestionLevel, CongestionSegment, CongestionSegmenter, EdgeAnnotation,
};
pub use progress::{ProgressConfig, ProgressTracker, RouteProgress};
pub use spatial_index::SpatialIndex;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in degrees (WGS84).
///
/// # Example
/// ```
/// use route_tracker::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A planned route as delivered by the route planner.
///
/// `route_id` is a stable identifier assigned by the planner; the tracking
/// subsystem uses it as the cache key for decoded annotations, so it must not
/// change for the lifetime of one navigation session. `points` is the ordered
/// polyline from origin (index 0) to destination; `annotations` carries one
/// entry per polyline edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub route_id: u64,
    pub points: Vec<GpsPoint>,
    /// Total route length in meters.
    pub total_distance: f64,
    /// Per-edge planner annotations; entry `i` describes the edge from
    /// coordinate `i` to `i + 1`.
    pub annotations: Vec<EdgeAnnotation>,
}

impl Route {
    /// Build a route, deriving the total distance from the polyline geometry.
    pub fn new(route_id: u64, points: Vec<GpsPoint>, annotations: Vec<EdgeAnnotation>) -> Self {
        let total_distance = geo_utils::polyline_length(&points);
        Self {
            route_id,
            points,
            total_distance,
            annotations,
        }
    }

    /// Build a route with a planner-supplied total distance.
    pub fn with_total_distance(
        route_id: u64,
        points: Vec<GpsPoint>,
        total_distance: f64,
        annotations: Vec<EdgeAnnotation>,
    ) -> Self {
        Self {
            route_id,
            points,
            total_distance,
            annotations,
        }
    }
}

/// The result of a nearest-point query against the route polyline.
///
/// The position lies on the segment between `coordinate_index` and
/// `coordinate_index + 1`, at `distance_from_segment_start` meters (fraction
/// `percentage_along_segment` in [0, 1]) from the segment start; `point` is the
/// interpolated coordinate itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePosition {
    pub coordinate_index: usize,
    /// Meters from the segment's start coordinate to the projected point.
    pub distance_from_segment_start: f64,
    /// Fractional position along the segment, clamped to [0, 1].
    pub percentage_along_segment: f64,
    /// The projected point on the polyline.
    pub point: GpsPoint,
}

impl RoutePosition {
    /// The sentinel for "no route / not yet computed": index 0, zero distances,
    /// the null island coordinate.
    pub fn empty() -> Self {
        Self {
            coordinate_index: 0,
            distance_from_segment_start: 0.0,
            percentage_along_segment: 0.0,
            point: GpsPoint::new(0.0, 0.0),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
