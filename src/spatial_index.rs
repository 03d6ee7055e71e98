//! # Spatial Index
//!
//! Fast nearest-point queries against a route polyline.
//!
//! During active navigation this answers "where on the route is the vehicle?"
//! on every GPS fix (~1 Hz, sometimes faster). A brute-force scan over a polyline
//! of thousands of points per fix is wasteful, so the segments are bulk-loaded
//! into an R-tree once per route and queried via nearest-neighbor iteration.
//! The index is purely a performance optimization: the result is always identical
//! to brute-force clamped projection over every segment, including the
//! lowest-index tie-break (verified against a brute-force oracle in the tests).
//!
//! ## Query semantics
//!
//! [`SpatialIndex::find_exact_position`] projects the query point onto each
//! candidate segment, clamped so the closest point always lies between the two
//! endpoints, and selects the segment with the smallest distance to the
//! projected point. When two segments are equidistant, as on a route that loops
//! or self-intersects near the vehicle, the lower segment index wins.
//!
//! ## Planar scaling
//!
//! Candidate selection happens in a locally-scaled planar space where longitude
//! is scaled by the cosine of the route's mean latitude, captured at build time.
//! This keeps the R-tree envelope metric and the segment distance metric
//! consistent, and over the extent of a navigation route the ordering matches
//! great-circle distances. The reported `distance_from_segment_start` is still
//! computed with the haversine formula for navigation-grade accuracy.

use crate::geo_utils::{self, haversine_distance};
use crate::{GpsPoint, RoutePosition};
use log::{debug, info};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Tolerance (in squared scaled degrees) within which two candidate segments are
/// considered equidistant and the lower index wins. Roughly sub-micrometer, so it
/// can only merge genuine geometric ties, not distinct answers.
const TIE_EPSILON: f64 = 1e-18;

/// Floor for the longitude scale factor, keeps polar routes from collapsing to a line.
const MIN_LNG_SCALE: f64 = 0.01;

// =============================================================================
// Indexed Segment
// =============================================================================

/// One polyline edge in scaled planar space, tagged with its route index.
#[derive(Debug, Clone)]
struct SegmentEntry {
    index: usize,
    start: GpsPoint,
    end: GpsPoint,
    // Scaled planar coordinates: x = longitude * scale, y = latitude.
    sx: f64,
    sy: f64,
    ex: f64,
    ey: f64,
}

impl SegmentEntry {
    /// Clamped projection of a scaled planar point onto this segment.
    ///
    /// Returns `(t, px, py)` where `t` is the fractional position in [0, 1] and
    /// `(px, py)` the projected point. Zero-length segments project to the start
    /// with `t = 0.0`.
    fn project(&self, qx: f64, qy: f64) -> (f64, f64, f64) {
        let dx = self.ex - self.sx;
        let dy = self.ey - self.sy;
        let len2 = dx * dx + dy * dy;

        let t = if len2 <= 0.0 {
            0.0
        } else {
            (((qx - self.sx) * dx + (qy - self.sy) * dy) / len2).clamp(0.0, 1.0)
        };

        (t, self.sx + dx * t, self.sy + dy * t)
    }
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.sx, self.sy], [self.ex, self.ey])
    }
}

impl PointDistance for SegmentEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let (_, px, py) = self.project(point[0], point[1]);
        let dx = px - point[0];
        let dy = py - point[1];
        dx * dx + dy * dy
    }
}

// =============================================================================
// Spatial Index
// =============================================================================

/// Nearest-segment index over one route polyline.
///
/// Rebuilt only on [`build_index`](Self::build_index) /
/// [`reindex`](Self::reindex), never per query. Queries on an empty or flushed
/// index return [`RoutePosition::empty`] and never panic.
///
/// # Example
///
/// ```rust
/// use route_tracker::{GpsPoint, SpatialIndex};
///
/// let route = vec![
///     GpsPoint::new(0.0, 0.0),
///     GpsPoint::new(0.0, 0.001),
///     GpsPoint::new(0.0, 0.002),
/// ];
///
/// let mut index = SpatialIndex::new();
/// index.build_index(&route);
///
/// let position = index.find_exact_position(&GpsPoint::new(0.0, 0.0005));
/// assert_eq!(position.coordinate_index, 0);
/// assert!((position.percentage_along_segment - 0.5).abs() < 0.01);
/// ```
#[derive(Debug)]
pub struct SpatialIndex {
    tree: Option<RTree<SegmentEntry>>,
    /// Longitude scale factor captured at build time (cos of mean latitude).
    scale: f64,
    segment_count: usize,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// Create an empty index. Queries return the empty sentinel until a route is indexed.
    pub fn new() -> Self {
        Self {
            tree: None,
            scale: 1.0,
            segment_count: 0,
        }
    }

    /// Build the index for a polyline, fully replacing any prior state.
    ///
    /// Polylines with fewer than two points leave the index empty; no stale
    /// segments from a previous route survive.
    pub fn build_index(&mut self, points: &[GpsPoint]) {
        self.tree = None;
        self.segment_count = 0;
        self.scale = 1.0;

        if points.len() < 2 {
            debug!("build_index: {} point(s), index left empty", points.len());
            return;
        }

        let mean_lat = points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64;
        let scale = mean_lat.to_radians().cos().max(MIN_LNG_SCALE);

        let entries: Vec<SegmentEntry> = points
            .windows(2)
            .enumerate()
            .map(|(index, w)| SegmentEntry {
                index,
                start: w[0],
                end: w[1],
                sx: w[0].longitude * scale,
                sy: w[0].latitude,
                ex: w[1].longitude * scale,
                ey: w[1].latitude,
            })
            .collect();

        self.segment_count = entries.len();
        self.scale = scale;
        self.tree = Some(RTree::bulk_load(entries));

        info!(
            "indexed {} route segments ({} points)",
            self.segment_count,
            points.len()
        );
    }

    /// Rebuild the index for a new or updated polyline (e.g. after a reroute).
    pub fn reindex(&mut self, points: &[GpsPoint]) {
        self.build_index(points);
    }

    /// Drop the index and all derived state. Subsequent queries return the empty sentinel.
    pub fn flush(&mut self) {
        debug!("spatial index flushed ({} segments dropped)", self.segment_count);
        self.tree = None;
        self.segment_count = 0;
        self.scale = 1.0;
    }

    /// Whether the index currently holds no segments.
    pub fn is_empty(&self) -> bool {
        self.tree.is_none()
    }

    /// Number of indexed segments (polyline points minus one; 0 when empty).
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Find the closest position on the indexed polyline to a query point.
    ///
    /// Walks the R-tree nearest-neighbor iterator (sorted by ascending distance)
    /// and stops as soon as a candidate is strictly farther than the best found,
    /// scanning equidistant candidates for the lowest segment index. Returns
    /// [`RoutePosition::empty`] when no route is indexed.
    pub fn find_exact_position(&self, point: &GpsPoint) -> RoutePosition {
        let Some(tree) = &self.tree else {
            return RoutePosition::empty();
        };

        let query = [point.longitude * self.scale, point.latitude];

        let mut best: Option<(f64, &SegmentEntry)> = None;
        for (entry, d2) in tree.nearest_neighbor_iter_with_distance_2(&query) {
            match best {
                None => best = Some((d2, entry)),
                Some((best_d2, best_entry)) => {
                    if d2 > best_d2 + TIE_EPSILON {
                        break;
                    }
                    if entry.index < best_entry.index {
                        best = Some((best_d2, entry));
                    }
                }
            }
        }

        match best {
            Some((_, entry)) => {
                let (t, _, _) = entry.project(query[0], query[1]);
                let exact = geo_utils::interpolate(&entry.start, &entry.end, t);
                RoutePosition {
                    coordinate_index: entry.index,
                    distance_from_segment_start: haversine_distance(&entry.start, &exact),
                    percentage_along_segment: t,
                    point: exact,
                }
            }
            None => RoutePosition::empty(),
        }
    }

    /// Linear interpolation between two points, re-exposed for components
    /// operating on the same polyline (see [`geo_utils::interpolate`]).
    #[inline]
    pub fn interpolate(&self, start: &GpsPoint, end: &GpsPoint, t: f64) -> GpsPoint {
        geo_utils::interpolate(start, end, t)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    /// Brute-force oracle: clamped projection over every segment, same scaled
    /// planar metric as the index, lowest index wins ties.
    fn brute_force_nearest(points: &[GpsPoint], query: &GpsPoint) -> RoutePosition {
        if points.len() < 2 {
            return RoutePosition::empty();
        }

        let mean_lat = points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64;
        let scale = mean_lat.to_radians().cos().max(MIN_LNG_SCALE);
        let qx = query.longitude * scale;
        let qy = query.latitude;

        let mut distances: Vec<(usize, f64, f64)> = Vec::new();
        for (index, w) in points.windows(2).enumerate() {
            let entry = SegmentEntry {
                index,
                start: w[0],
                end: w[1],
                sx: w[0].longitude * scale,
                sy: w[0].latitude,
                ex: w[1].longitude * scale,
                ey: w[1].latitude,
            };
            let (t, px, py) = entry.project(qx, qy);
            let d2 = (px - qx) * (px - qx) + (py - qy) * (py - qy);
            distances.push((index, d2, t));
        }

        let min_d2 = distances
            .iter()
            .map(|&(_, d2, _)| d2)
            .fold(f64::INFINITY, f64::min);

        // First (lowest) index within the tie window.
        let &(index, _, t) = distances
            .iter()
            .find(|&&(_, d2, _)| d2 <= min_d2 + TIE_EPSILON)
            .unwrap();

        let exact = geo_utils::interpolate(&points[index], &points[index + 1], t);
        RoutePosition {
            coordinate_index: index,
            distance_from_segment_start: haversine_distance(&points[index], &exact),
            percentage_along_segment: t,
            point: exact,
        }
    }

    fn equator_route() -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 0.001),
            GpsPoint::new(0.0, 0.002),
        ]
    }

    #[test]
    fn test_empty_index_returns_sentinel() {
        let index = SpatialIndex::new();
        let pos = index.find_exact_position(&GpsPoint::new(51.5, -0.12));
        assert_eq!(pos, RoutePosition::empty());
    }

    #[test]
    fn test_single_point_route_returns_sentinel() {
        let mut index = SpatialIndex::new();
        index.build_index(&[GpsPoint::new(51.5, -0.12)]);
        assert!(index.is_empty());
        let pos = index.find_exact_position(&GpsPoint::new(51.5, -0.12));
        assert_eq!(pos, RoutePosition::empty());
    }

    #[test]
    fn test_flush_drops_index() {
        let mut index = SpatialIndex::new();
        index.build_index(&equator_route());
        assert_eq!(index.segment_count(), 2);

        index.flush();
        assert!(index.is_empty());
        assert_eq!(index.segment_count(), 0);
        let pos = index.find_exact_position(&GpsPoint::new(0.0, 0.0005));
        assert_eq!(pos, RoutePosition::empty());
    }

    #[test]
    fn test_midpoint_of_first_segment() {
        // Spec scenario: three points, two ~111m segments, vehicle at the
        // midpoint of the first segment.
        let mut index = SpatialIndex::new();
        index.build_index(&equator_route());

        let pos = index.find_exact_position(&GpsPoint::new(0.0, 0.0005));
        assert_eq!(pos.coordinate_index, 0);
        assert!(approx_eq(pos.percentage_along_segment, 0.5, 1e-6));
        assert!(approx_eq(pos.point.latitude, 0.0, 1e-9));
        assert!(approx_eq(pos.point.longitude, 0.0005, 1e-9));
        assert!(approx_eq(pos.distance_from_segment_start, 55.66, 0.5));
    }

    #[test]
    fn test_query_off_route_projects_onto_segment() {
        let mut index = SpatialIndex::new();
        index.build_index(&equator_route());

        // 30m or so north of the midpoint of the second segment
        let pos = index.find_exact_position(&GpsPoint::new(0.0003, 0.0015));
        assert_eq!(pos.coordinate_index, 1);
        assert!(approx_eq(pos.percentage_along_segment, 0.5, 1e-6));
        assert!(approx_eq(pos.point.latitude, 0.0, 1e-9));
    }

    #[test]
    fn test_query_past_route_end_clamps() {
        let mut index = SpatialIndex::new();
        index.build_index(&equator_route());

        let pos = index.find_exact_position(&GpsPoint::new(0.0, 0.005));
        assert_eq!(pos.coordinate_index, 1);
        assert_eq!(pos.percentage_along_segment, 1.0);
    }

    #[test]
    fn test_query_before_route_start_clamps() {
        let mut index = SpatialIndex::new();
        index.build_index(&equator_route());

        let pos = index.find_exact_position(&GpsPoint::new(0.0, -0.005));
        assert_eq!(pos.coordinate_index, 0);
        assert_eq!(pos.percentage_along_segment, 0.0);
        assert_eq!(pos.distance_from_segment_start, 0.0);
    }

    #[test]
    fn test_tie_break_prefers_earliest_segment() {
        // An out-and-back route: segment 3 retraces segment 0 exactly.
        // A fix beside the shared stretch is equidistant from both; the
        // earliest segment must win or progress would jump backward.
        let route = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 0.001),
            GpsPoint::new(0.0, 0.002),
            GpsPoint::new(0.0, 0.001),
            GpsPoint::new(0.0, 0.0),
        ];
        let mut index = SpatialIndex::new();
        index.build_index(&route);

        let pos = index.find_exact_position(&GpsPoint::new(0.0001, 0.0005));
        assert_eq!(pos.coordinate_index, 0);
        assert!(approx_eq(pos.percentage_along_segment, 0.5, 1e-6));
    }

    #[test]
    fn test_zero_length_segment_no_nan() {
        // Duplicate consecutive points form a zero-length segment.
        let route = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 0.001),
            GpsPoint::new(0.0, 0.001),
            GpsPoint::new(0.0, 0.002),
        ];
        let mut index = SpatialIndex::new();
        index.build_index(&route);

        let pos = index.find_exact_position(&GpsPoint::new(0.0, 0.001));
        assert!(!pos.percentage_along_segment.is_nan());
        assert!(!pos.distance_from_segment_start.is_nan());
        assert!((0.0..=1.0).contains(&pos.percentage_along_segment));
    }

    #[test]
    fn test_reindex_replaces_route() {
        let mut index = SpatialIndex::new();
        index.build_index(&equator_route());

        // New route far away; no stale segments from the old one may leak.
        let new_route = vec![
            GpsPoint::new(51.5074, -0.1278),
            GpsPoint::new(51.5080, -0.1290),
        ];
        index.reindex(&new_route);
        assert_eq!(index.segment_count(), 1);

        let pos = index.find_exact_position(&GpsPoint::new(51.5074, -0.1278));
        assert_eq!(pos.coordinate_index, 0);
        assert_eq!(pos.percentage_along_segment, 0.0);
    }

    #[test]
    fn test_matches_brute_force_oracle() {
        // Zigzag route with a loop, queried from a grid of offsets around it.
        // The index must reproduce brute-force projection exactly.
        let mut route: Vec<GpsPoint> = (0..40)
            .map(|i| {
                let lat = 51.5 + (i as f64) * 0.0004 * if i % 2 == 0 { 1.0 } else { 0.7 };
                let lng = -0.12 + (i as f64) * 0.0006;
                GpsPoint::new(lat, lng)
            })
            .collect();
        // Close a loop back near the start
        route.push(GpsPoint::new(51.5005, -0.1195));
        route.push(GpsPoint::new(51.5, -0.12));

        let mut index = SpatialIndex::new();
        index.build_index(&route);

        for i in 0..15 {
            for j in 0..15 {
                let query = GpsPoint::new(
                    51.499 + (i as f64) * 0.0012,
                    -0.121 + (j as f64) * 0.0018,
                );
                let fast = index.find_exact_position(&query);
                let oracle = brute_force_nearest(&route, &query);

                assert_eq!(
                    fast.coordinate_index, oracle.coordinate_index,
                    "index mismatch for query {:?}",
                    query
                );
                assert!(approx_eq(
                    fast.percentage_along_segment,
                    oracle.percentage_along_segment,
                    1e-9
                ));
            }
        }
    }

    #[test]
    fn test_interpolate_exposed_for_dependents() {
        let index = SpatialIndex::new();
        let a = GpsPoint::new(51.50, -0.10);
        let b = GpsPoint::new(51.52, -0.12);
        let mid = index.interpolate(&a, &b, 0.5);
        assert_eq!(mid, geo_utils::interpolate(&a, &b, 0.5));
    }

    #[test]
    fn test_percentage_always_clamped() {
        let mut index = SpatialIndex::new();
        index.build_index(&equator_route());

        for lng in [-1.0, -0.001, 0.0005, 0.0021, 1.0] {
            for lat in [-0.5, 0.0, 0.5] {
                let pos = index.find_exact_position(&GpsPoint::new(lat, lng));
                assert!((0.0..=1.0).contains(&pos.percentage_along_segment));
                assert!(!pos.percentage_along_segment.is_nan());
            }
        }
    }
}
