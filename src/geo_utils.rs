//! # Geographic Utilities
//!
//! Pure geometric primitives used by the tracking engine.
//!
//! This module provides the fundamental operations shared by the spatial index,
//! the progress tracker and the congestion segmenter. All functions are total:
//! degenerate input (empty polylines, zero-length segments) produces zeros, never
//! NaN or a panic, because these run on every GPS fix of a live navigation session.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a route polyline in meters |
//! | [`interpolate`] | Linear interpolation between two points by a ratio |
//! | [`safe_ratio`] | Division clamped to [0, 1], guarded against zero length |
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances use the haversine great-circle formula (via the `geo` crate), the
//! standard for navigation-grade accuracy. Flat-earth approximations drift too far
//! over route-length distances to stay consistent with planner-reported lengths.
//!
//! ### Linear Interpolation
//!
//! [`interpolate`] lerps latitude and longitude independently. This is a planar
//! approximation, deliberately chosen because consecutive route points are tens of
//! meters apart, where the error against a geodesic is negligible. Ratios outside
//! [0, 1] extrapolate; callers clamp via [`safe_ratio`] when they must stay on the
//! segment.
//!
//! ### Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees), the
//! standard produced by GPS receivers and route planners.

use crate::GpsPoint;
use geo::{Distance, Haversine, Point};

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points in meters.
///
/// Uses the haversine formula (spherical Earth, radius 6,371 km), accurate to
/// within 0.3% for navigation purposes.
///
/// # Example
///
/// ```rust
/// use route_tracker::{GpsPoint, geo_utils};
///
/// let a = GpsPoint::new(0.0, 0.0);
/// let b = GpsPoint::new(0.0, 0.001); // ~111m east along the equator
///
/// let dist = geo_utils::haversine_distance(&a, &b);
/// assert!((dist - 111.3).abs() < 1.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Calculate the total length of a route polyline in meters.
///
/// Sums the haversine distance between consecutive points. Empty or single-point
/// polylines return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Interpolation
// =============================================================================

/// Linearly interpolate between two GPS points.
///
/// Latitude and longitude are interpolated independently:
/// `lat = start.lat + (end.lat - start.lat) * t`, same for longitude.
///
/// `t = 0.0` returns `start`, `t = 1.0` returns `end`. Values outside [0, 1]
/// extrapolate along the same line; callers that need to stay on the segment
/// clamp first (see [`safe_ratio`]).
///
/// # Example
///
/// ```rust
/// use route_tracker::{GpsPoint, geo_utils};
///
/// let start = GpsPoint::new(51.50, -0.10);
/// let end = GpsPoint::new(51.52, -0.12);
///
/// let mid = geo_utils::interpolate(&start, &end, 0.5);
/// assert_eq!(mid.latitude, 51.51);
/// assert_eq!(mid.longitude, -0.11);
/// ```
#[inline]
pub fn interpolate(start: &GpsPoint, end: &GpsPoint, t: f64) -> GpsPoint {
    GpsPoint::new(
        start.latitude + (end.latitude - start.latitude) * t,
        start.longitude + (end.longitude - start.longitude) * t,
    )
}

/// Divide `numerator` by `length`, clamped to [0, 1].
///
/// Returns 0.0 when `length` is zero or negative, so zero-length segments can
/// never produce NaN or Infinity downstream. Negative numerators clamp to 0.0.
#[inline]
pub fn safe_ratio(numerator: f64, length: f64) -> f64 {
    if length <= 0.0 {
        return 0.0;
    }
    (numerator / length).clamp(0.0, 1.0)
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

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GpsPoint::new(51.5074, -0.1278);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_distance_known_value() {
        // London to Paris is approximately 344 km
        let london = GpsPoint::new(51.5074, -0.1278);
        let paris = GpsPoint::new(48.8566, 2.3522);
        let dist = haversine_distance(&london, &paris);
        assert!(approx_eq(dist, 343_560.0, 5000.0));
    }

    #[test]
    fn test_haversine_distance_equator_degree() {
        // 0.001 degrees of longitude at the equator is ~111.3m
        let a = GpsPoint::new(0.0, 0.0);
        let b = GpsPoint::new(0.0, 0.001);
        assert!(approx_eq(haversine_distance(&a, &b), 111.3, 1.0));
    }

    #[test]
    fn test_polyline_length_empty() {
        let empty: Vec<GpsPoint> = vec![];
        assert_eq!(polyline_length(&empty), 0.0);
    }

    #[test]
    fn test_polyline_length_single_point() {
        let single = vec![GpsPoint::new(51.5074, -0.1278)];
        assert_eq!(polyline_length(&single), 0.0);
    }

    #[test]
    fn test_polyline_length_sums_segments() {
        let track = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 0.001),
            GpsPoint::new(0.0, 0.002),
        ];
        let length = polyline_length(&track);
        assert!(approx_eq(length, 222.6, 2.0));
    }

    #[test]
    fn test_interpolate_endpoints() {
        let start = GpsPoint::new(51.50, -0.10);
        let end = GpsPoint::new(51.52, -0.12);
        assert_eq!(interpolate(&start, &end, 0.0), start);
        assert_eq!(interpolate(&start, &end, 1.0), end);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let start = GpsPoint::new(51.50, -0.10);
        let end = GpsPoint::new(51.52, -0.12);
        let mid = interpolate(&start, &end, 0.5);
        assert!(approx_eq(mid.latitude, 51.51, 1e-12));
        assert!(approx_eq(mid.longitude, -0.11, 1e-12));
    }

    #[test]
    fn test_interpolate_extrapolates() {
        let start = GpsPoint::new(0.0, 0.0);
        let end = GpsPoint::new(1.0, 1.0);
        let beyond = interpolate(&start, &end, 2.0);
        assert_eq!(beyond.latitude, 2.0);
        assert_eq!(beyond.longitude, 2.0);
    }

    #[test]
    fn test_safe_ratio_clamps() {
        assert_eq!(safe_ratio(5.0, 10.0), 0.5);
        assert_eq!(safe_ratio(-3.0, 10.0), 0.0);
        assert_eq!(safe_ratio(15.0, 10.0), 1.0);
    }

    #[test]
    fn test_safe_ratio_zero_length() {
        // Zero-length segment must not produce NaN
        assert_eq!(safe_ratio(5.0, 0.0), 0.0);
        assert_eq!(safe_ratio(0.0, 0.0), 0.0);
        assert!(!safe_ratio(1.0, 0.0).is_nan());
    }
}
