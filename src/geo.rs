//! Great-circle geometry over route polylines
//!
//! All distances are kilometers on a sphere of radius 6371 km.

use haversine::{Units, distance};

use crate::models::LatLng;

/// Default spacing between discovery samples
pub const DEFAULT_SAMPLE_INTERVAL_KM: f64 = 150.0;

/// Slack allowed when deciding whether a point lies on a segment
pub const DEFAULT_ON_SEGMENT_TOLERANCE_KM: f64 = 1.0;

/// Great-circle distance between two points
#[must_use]
pub fn haversine_distance(a: LatLng, b: LatLng) -> f64 {
    distance(a.into(), b.into(), Units::Kilometers)
}

/// Sum of the distances between consecutive polyline points
#[must_use]
pub fn total_route_distance(coords: &[LatLng]) -> f64 {
    coords
        .windows(2)
        .map(|pair| haversine_distance(pair[0], pair[1]))
        .sum()
}

/// Distance from the start of the polyline to `point`.
///
/// Scans segments in order and takes the first one where going through
/// `point` costs less than `tolerance_km` extra over the segment itself.
/// Returns `None` when no segment qualifies.
#[must_use]
pub fn distance_along_route(point: LatLng, coords: &[LatLng], tolerance_km: f64) -> Option<f64> {
    let mut distance_so_far = 0.0;

    for pair in coords.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let segment = haversine_distance(start, end);
        let to_start = haversine_distance(start, point);
        let to_end = haversine_distance(point, end);

        if (to_start + to_end - segment).abs() < tolerance_km {
            // Clamp for points a hair beyond the segment end
            return Some(distance_so_far + to_start.min(segment));
        }

        distance_so_far += segment;
    }

    None
}

/// Every polyline point where the distance walked since the previous sample
/// first reaches `interval_km`.
///
/// The walk starts at the first point, which is never itself a sample.
#[must_use]
pub fn sample_every_x_km(coords: &[LatLng], interval_km: f64) -> Vec<LatLng> {
    let mut samples = Vec::new();
    let mut accumulated = 0.0;

    for pair in coords.windows(2) {
        accumulated += haversine_distance(pair[0], pair[1]);
        if accumulated >= interval_km {
            samples.push(pair[1]);
            accumulated = 0.0;
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // Slightly over 10 km so interval sums never sit exactly on a boundary
    const STEP_KM: f64 = 10.01;

    /// Points due north along a meridian, `step_km` apart
    fn meridian(count: usize, step_km: f64) -> Vec<LatLng> {
        let step_deg = step_km / 6371.0_f64 * (180.0 / std::f64::consts::PI);
        (0..count)
            .map(|i| LatLng::new(40.0 + step_deg * i as f64, 5.0))
            .collect()
    }

    #[test]
    fn test_haversine_known_distance() {
        let london = LatLng::new(51.5074, -0.1278);
        let paris = LatLng::new(48.8566, 2.3522);
        let d = haversine_distance(london, paris);
        assert!((d - 343.5).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let a = LatLng::new(52.52, 13.405);
        let b = LatLng::new(48.137, 11.575);
        assert!((haversine_distance(a, b) - haversine_distance(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_total_route_distance() {
        let coords = meridian(5, STEP_KM);
        assert!((total_route_distance(&coords) - 40.04).abs() < 0.01);
        assert_eq!(total_route_distance(&coords[..1]), 0.0);
        assert_eq!(total_route_distance(&[]), 0.0);
    }

    #[test]
    fn test_sampling_320_km_every_150_yields_two() {
        // 32 segments of ~10 km
        let coords = meridian(33, STEP_KM);
        let samples = sample_every_x_km(&coords, 150.0);

        assert_eq!(samples.len(), 2);
        let first = distance_along_route(samples[0], &coords, 1.0).unwrap();
        let second = distance_along_route(samples[1], &coords, 1.0).unwrap();
        assert!((first - 150.0).abs() < 0.5, "first at {first}");
        assert!((second - 300.0).abs() < 0.5, "second at {second}");
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 0)]
    #[case(15, 0)]
    #[case(16, 1)]
    fn test_sampling_short_polylines(#[case] points: usize, #[case] expected: usize) {
        let coords = meridian(points, STEP_KM);
        assert_eq!(sample_every_x_km(&coords, 150.0).len(), expected);
    }

    #[test]
    fn test_distance_along_route_on_vertex() {
        let coords = meridian(11, STEP_KM);
        let d = distance_along_route(coords[4], &coords, 1.0).unwrap();
        assert!((d - 40.04).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_distance_along_route_off_route() {
        let coords = meridian(11, STEP_KM);
        let far_away = LatLng::new(40.3, 8.0);
        assert!(distance_along_route(far_away, &coords, 1.0).is_none());
    }

    #[test]
    fn test_distance_along_route_stays_within_route_length() {
        let coords = meridian(21, 7.5);
        let total = total_route_distance(&coords);
        for point in &coords {
            let d = distance_along_route(*point, &coords, 1.0).unwrap();
            assert!((0.0..=total + 1e-9).contains(&d), "{d} outside 0..={total}");
        }
    }
}
