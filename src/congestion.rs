//! # Congestion Segmentation
//!
//! Coalesces per-edge traffic annotations into contiguous colored segments,
//! anchored at the vehicle's current position.
//!
//! The route planner annotates every polyline edge with an optional congestion
//! level plus speed/distance/duration telemetry (see [`EdgeAnnotation`]). The
//! renderer wants something coarser: contiguous runs of edges sharing one level,
//! each carrying the boundary coordinates to trace, starting at the vehicle so
//! the overlay visually originates at the icon. [`CongestionSegmenter`] produces
//! those runs and caches the decoded levels per route so repeated overlay
//! refreshes never re-decode.
//!
//! ## Walk semantics
//!
//! Starting at the snapped position's segment, the walk first emits a "behind
//! point" a small fraction behind the vehicle (so the first colored segment
//! starts slightly before the icon), then the exact current coordinate, then
//! advances edge by edge:
//!
//! - edges with no congestion value are skipped: the index advances, no point
//!   is added and no segment boundary is triggered. Absence of data is not a
//!   distinct category;
//! - while the level is unchanged, the edge's end coordinate joins the current
//!   run (on the vehicle's own segment, only if the vehicle is not already at
//!   the segment end);
//! - a level change closes the run and opens a new one seeded with the edge's
//!   start and end coordinates.
//!
//! Segments are returned in route-forward order only; nothing behind the
//! vehicle is included.
//!
//! ## Cache identity
//!
//! Both [`set_route`](CongestionSegmenter::set_route) and
//! [`extract_congestion_segments`](CongestionSegmenter::extract_congestion_segments)
//! key the cache by [`Route::route_id`]. The identifier must stay stable for the
//! lifetime of one navigation session. Keying the two calls differently, or
//! deriving keys from mutable route content, turns every extraction into a
//! silent cache miss.

use crate::cache::RouteCache;
use crate::geo_utils::interpolate;
use crate::{GpsPoint, Route, RoutePosition};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Categorical traffic density attached to a route edge.
///
/// Parsed from the planner's congestion strings; anything unrecognized
/// (including the literal `"unknown"`) decodes to no level at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Low,
    Moderate,
    Heavy,
    Severe,
}

impl CongestionLevel {
    /// Parse a planner congestion string. Returns `None` for anything that is
    /// not one of the four known categories.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "moderate" => Some(Self::Moderate),
            "heavy" => Some(Self::Heavy),
            "severe" => Some(Self::Severe),
            _ => None,
        }
    }
}

/// Raw per-edge annotation as delivered by the route planner.
///
/// One annotation describes the edge from coordinate `i` to `i + 1`. Only
/// `congestion` is consumed here; the telemetry fields pass through untouched
/// for other consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeAnnotation {
    #[serde(default)]
    pub maxspeed: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub congestion: Option<String>,
    #[serde(default)]
    pub congestion_numeric: Option<i64>,
}

/// A contiguous run of route edges sharing one congestion level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionSegment {
    pub level: CongestionLevel,
    /// Polyline index where the run starts.
    pub start_index: usize,
    /// Polyline index bounding the run (exclusive edge bound).
    pub end_index: usize,
    /// Ordered coordinates tracing the run; the first segment begins just
    /// behind the vehicle.
    pub points: Vec<GpsPoint>,
}

/// Visual tuning for the congestion overlay's origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CongestionConfig {
    /// Fraction of the vehicle's segment by which the first colored point sits
    /// behind the snapped position. Default 0.025.
    pub behind_point_fraction: f64,
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            behind_point_fraction: 0.025,
        }
    }
}

/// Decoded congestion levels, one per polyline edge.
type DecodedLevels = Vec<Option<CongestionLevel>>;

/// Extracts colored congestion segments from an annotated route.
///
/// Owns an explicit [`RouteCache`] of decoded annotation levels plus per-route
/// last-position bookkeeping; both are purged by
/// [`cleanup`](Self::cleanup) when navigation ends.
///
/// # Example
///
/// ```rust
/// use route_tracker::{
///     CongestionSegmenter, EdgeAnnotation, GpsPoint, Route, SpatialIndex,
/// };
///
/// let points = vec![
///     GpsPoint::new(0.0, 0.0),
///     GpsPoint::new(0.0, 0.001),
///     GpsPoint::new(0.0, 0.002),
/// ];
/// let annotations = vec![
///     EdgeAnnotation { congestion: Some("low".into()), ..Default::default() },
///     EdgeAnnotation { congestion: Some("low".into()), ..Default::default() },
/// ];
/// let route = Route::new(42, points.clone(), annotations);
///
/// let mut index = SpatialIndex::new();
/// index.build_index(&points);
/// let position = index.find_exact_position(&GpsPoint::new(0.0, 0.0005));
///
/// let mut segmenter = CongestionSegmenter::new();
/// segmenter.set_route(&route);
/// let segments = segmenter.extract_congestion_segments(&route, &position);
/// assert_eq!(segments.len(), 1);
/// ```
#[derive(Debug)]
pub struct CongestionSegmenter {
    annotations: RouteCache<DecodedLevels>,
    last_positions: RouteCache<RoutePosition>,
    config: CongestionConfig,
    decode_count: usize,
}

impl Default for CongestionSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl CongestionSegmenter {
    pub fn new() -> Self {
        Self::with_config(CongestionConfig::default())
    }

    pub fn with_config(config: CongestionConfig) -> Self {
        Self {
            annotations: RouteCache::new(),
            last_positions: RouteCache::new(),
            config,
            decode_count: 0,
        }
    }

    /// Decode and cache the route's congestion levels.
    ///
    /// Idempotent: a route whose identity is already cached is not re-decoded.
    pub fn set_route(&mut self, route: &Route) {
        if self.annotations.contains(route.route_id) {
            debug!("annotations already cached for route {}", route.route_id);
            return;
        }

        let levels = decode_levels(&route.annotations);
        self.decode_count += 1;
        info!(
            "decoded {} congestion annotations for route {}",
            levels.len(),
            route.route_id
        );
        self.annotations.insert(route.route_id, levels);
    }

    /// Number of annotation decodes performed so far (cache hits do not count).
    pub fn decode_count(&self) -> usize {
        self.decode_count
    }

    /// Last position passed to
    /// [`extract_congestion_segments`](Self::extract_congestion_segments) for a route.
    pub fn last_position(&self, route_id: u64) -> Option<&RoutePosition> {
        self.last_positions.get(route_id)
    }

    /// Walk forward from the vehicle's position, coalescing consecutive edges
    /// with identical congestion level into segments.
    ///
    /// Returns an empty list when no annotations are cached for the route, when
    /// the route has no walkable geometry or when the position lies beyond the
    /// annotated edges. Never fails.
    pub fn extract_congestion_segments(
        &mut self,
        route: &Route,
        position: &RoutePosition,
    ) -> Vec<CongestionSegment> {
        let Some(levels) = self.annotations.get(route.route_id) else {
            debug!("no cached annotations for route {}", route.route_id);
            return Vec::new();
        };

        let geometry = &route.points;
        let start_index = position.coordinate_index;
        // Edges exist up to min(annotation count, point count - 1).
        let edge_bound = levels.len().min(geometry.len().saturating_sub(1));

        if edge_bound == 0 || start_index >= edge_bound {
            return Vec::new();
        }

        self.last_positions.insert(route.route_id, position.clone());

        let seg_start = geometry[start_index];
        let seg_end = geometry[start_index + 1];
        let behind_t =
            (position.percentage_along_segment - self.config.behind_point_fraction).max(0.0);

        let mut segments: Vec<CongestionSegment> = Vec::new();
        let mut points: Vec<GpsPoint> =
            vec![interpolate(&seg_start, &seg_end, behind_t), position.point];
        let mut run_level: Option<CongestionLevel> = None;
        let mut run_start = start_index;

        for index in start_index..edge_bound {
            // Absence of data is not a category: skip without closing the run.
            let Some(level) = levels[index] else {
                continue;
            };

            match run_level {
                None => {
                    if index == start_index {
                        // Vehicle's own segment: the current point is already
                        // listed, so append only the segment end, and only if
                        // the vehicle is not already sitting on it.
                        if position.percentage_along_segment < 1.0 {
                            points.push(geometry[index + 1]);
                        }
                    } else {
                        points.push(geometry[index + 1]);
                    }
                    run_level = Some(level);
                }
                Some(current) if current == level => {
                    points.push(geometry[index + 1]);
                }
                Some(current) => {
                    segments.push(CongestionSegment {
                        level: current,
                        start_index: run_start,
                        end_index: index,
                        points: std::mem::take(&mut points),
                    });
                    run_start = index;
                    points = vec![geometry[index], geometry[index + 1]];
                    run_level = Some(level);
                }
            }
        }

        // Close the trailing run with the edge-array bound as its end.
        if let Some(level) = run_level {
            if !points.is_empty() {
                segments.push(CongestionSegment {
                    level,
                    start_index: run_start,
                    end_index: edge_bound,
                    points,
                });
            }
        }

        segments
    }

    /// Drop the annotation cache and per-route bookkeeping. Called when
    /// navigation ends.
    pub fn cleanup(&mut self) {
        debug!(
            "congestion segmenter cleanup: {} cached route(s) dropped",
            self.annotations.len()
        );
        self.annotations.clear();
        self.last_positions.clear();
    }
}

/// One decoded level per edge; unrecognized or missing congestion becomes `None`.
fn decode_levels(annotations: &[EdgeAnnotation]) -> DecodedLevels {
    annotations
        .iter()
        .map(|a| a.congestion.as_deref().and_then(CongestionLevel::parse))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
