use crate::models::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6_371.0;
pub const AVERAGE_CYCLING_SPEED_KMH: f64 = 15.0;

/// Great-circle distance in kilometres.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlng = (dlng / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
}

pub fn is_within_distance(a: Coordinate, b: Coordinate, max_km: f64) -> bool {
    distance_km(a, b) <= max_km
}

pub fn total_distance_km(points: &[Coordinate]) -> f64 {
    points.windows(2).map(|w| distance_km(w[0], w[1])).sum()
}

pub fn estimated_duration_min(distance_km: f64, speed_kmh: f64) -> f64 {
    if speed_kmh <= 0.0 {
        return 0.0;
    }
    distance_km / speed_kmh * 60.0
}

/// Closest point of the finite segment `start..end` to `point`.
///
/// The projection treats lat/lng deltas as a local plane, which is accurate
/// enough at city scale. Results are clamped to the segment endpoints, and a
/// zero-length segment projects onto its start.
pub fn project_point_onto_segment(
    point: Coordinate,
    start: Coordinate,
    end: Coordinate,
) -> Coordinate {
    let dlat = end.lat - start.lat;
    let dlng = end.lng - start.lng;
    let len_sq = dlat * dlat + dlng * dlng;
    if len_sq == 0.0 {
        return start;
    }

    let t = ((point.lat - start.lat) * dlat + (point.lng - start.lng) * dlng) / len_sq;
    if t <= 0.0 {
        start
    } else if t >= 1.0 {
        end
    } else {
        start.interpolate(end, t)
    }
}

/// Distance in kilometres from `point` to the finite segment `start..end`.
pub fn distance_to_segment_km(point: Coordinate, start: Coordinate, end: Coordinate) -> f64 {
    distance_km(point, project_point_onto_segment(point, start, end))
}
