//! Simulated turn-by-turn navigation session.
//!
//! Run with: cargo run --example turn_by_turn

use route_tracker::{
    CongestionSegmenter, EdgeAnnotation, GpsPoint, ProgressTracker, Route,
};

fn main() {
    // Planned route from the planner (London area), with per-edge congestion
    let points = vec![
        GpsPoint::new(51.5074, -0.1278), // Start
        GpsPoint::new(51.5080, -0.1290),
        GpsPoint::new(51.5090, -0.1300),
        GpsPoint::new(51.5100, -0.1310),
        GpsPoint::new(51.5110, -0.1320), // End
    ];
    let congestion = ["low", "low", "heavy", "moderate"];
    let annotations: Vec<EdgeAnnotation> = congestion
        .iter()
        .map(|c| EdgeAnnotation {
            congestion: Some(c.to_string()),
            ..Default::default()
        })
        .collect();
    let route = Route::new(1, points.clone(), annotations);

    let mut tracker = ProgressTracker::new();
    let mut segmenter = CongestionSegmenter::new();

    tracker.set_route(&route.points, route.total_distance);
    segmenter.set_route(&route);

    println!("Navigating: {} points, {:.0}m total\n", points.len(), route.total_distance);

    // Simulated location fixes, slightly off the polyline like real GPS
    let fixes = [
        GpsPoint::new(51.5074, -0.1279),
        GpsPoint::new(51.5078, -0.1287),
        GpsPoint::new(51.5086, -0.1297),
        GpsPoint::new(51.5096, -0.1306),
        GpsPoint::new(51.5106, -0.1317),
    ];

    let mut driven = 0.0;
    for (i, fix) in fixes.iter().enumerate() {
        driven += route.total_distance / fixes.len() as f64;

        let progress = tracker.calculate_progress(fix, driven);
        let position = &progress.last_position;

        println!(
            "fix {}: segment {} at {:.0}% | {:.0}% of route | {} driven / {} remaining points",
            i,
            position.coordinate_index,
            position.percentage_along_segment * 100.0,
            progress.percentage_complete(),
            progress.driven_points.len(),
            progress.remaining_points.len(),
        );

        let segments = segmenter.extract_congestion_segments(&route, position);
        for segment in &segments {
            println!(
                "   {:?} traffic over edges {}..{} ({} points)",
                segment.level, segment.start_index, segment.end_index,
                segment.points.len(),
            );
        }
    }

    // Navigation over: release session state
    tracker.flush();
    segmenter.cleanup();
    println!("\nSession ended.");
}
