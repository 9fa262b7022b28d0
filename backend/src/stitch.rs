use crate::connections::RouteGraph;
use crate::geometry::{distance_km, is_within_distance};
use crate::models::{Coordinate, RouteSegment};

pub const DEFAULT_REDUNDANT_DISTANCE_KM: f64 = 0.01;

/// Drop every point within `min_distance_km` of the last retained point.
/// The first and last point are always kept as they are.
pub fn remove_redundant_points(points: &[Coordinate], min_distance_km: f64) -> Vec<Coordinate> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut result = Vec::with_capacity(points.len());
    result.push(points[0]);
    for &point in &points[1..points.len() - 1] {
        let last = result[result.len() - 1];
        if !is_within_distance(last, point, min_distance_km) {
            result.push(point);
        }
    }
    result.push(points[points.len() - 1]);
    result
}

/// Vertices `from..=to` of one segment, walked in the direction from `from` to `to`.
pub fn same_segment_path(points: &[Coordinate], from: usize, to: usize) -> Vec<Coordinate> {
    if points.is_empty() {
        return Vec::new();
    }
    let last = points.len() - 1;
    let (from, to) = (from.min(last), to.min(last));
    if from <= to {
        points[from..=to].to_vec()
    } else {
        points[to..=from].iter().rev().copied().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub from_index: usize,
    pub to_index: usize,
    pub distance_km: f64,
}

/// Closest vertex pair between two segments; the first pair wins ties.
pub fn best_connection(from: &[Coordinate], to: &[Coordinate]) -> Option<Connection> {
    let mut best: Option<Connection> = None;
    for (i, a) in from.iter().enumerate() {
        for (j, b) in to.iter().enumerate() {
            let d = distance_km(*a, *b);
            if best.map_or(true, |c| d < c.distance_km) {
                best = Some(Connection {
                    from_index: i,
                    to_index: j,
                    distance_km: d,
                });
            }
        }
    }
    best
}

/// Flatten a chain of segment ids into one polyline.
///
/// The walk enters the first segment at `start_index` and leaves the last one
/// at `end_index`. Between consecutive segments it crosses over at their
/// closest vertex pair, so each segment is walked in whichever direction leads
/// from its entry vertex to its exit vertex. The result starts with the vertex
/// at `start_index`.
pub fn stitch_segment_path(
    graph: &RouteGraph,
    segments: &[RouteSegment],
    chain: &[String],
    start_index: usize,
    end_index: usize,
) -> Option<Vec<Coordinate>> {
    let chain_points = chain
        .iter()
        .map(|id| {
            graph
                .node(id)
                .map(|idx| segments[graph.segment(idx).position].points.as_slice())
        })
        .collect::<Option<Vec<_>>>()?;

    let mut out = Vec::new();
    let mut entry = start_index;
    for (i, points) in chain_points.iter().enumerate() {
        let (exit, next_entry) = match chain_points.get(i + 1) {
            Some(next) => {
                let connection = best_connection(points, next)?;
                (connection.from_index, connection.to_index)
            }
            None => (end_index, 0),
        };
        out.extend(same_segment_path(points, entry, exit));
        entry = next_entry;
    }

    tracing::debug!(
        "stitched {} segments into {} points",
        chain.len(),
        out.len()
    );
    Some(out)
}
