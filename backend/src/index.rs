//! Nearest-vertex and nearest-edge lookups across a segment snapshot.
//!
//! Scans are linear and visit segments in snapshot order, then vertices in
//! route order. A candidate replaces the current best only when it is strictly
//! closer, so ties resolve to the first one encountered.

use crate::geometry::{distance_km, distance_to_segment_km, project_point_onto_segment};
use crate::models::{Coordinate, NearestPointResult, NearestSegmentResult, RouteSegment};

/// Which vertices of a segment take part in point scans and proximity tests.
///
/// The first and last vertex are always included; in between every
/// `stride`-th index is kept. A stride of 1 samples every vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexSampling {
    stride: usize,
}

impl VertexSampling {
    pub const ALL: Self = Self { stride: 1 };

    pub fn every(stride: usize) -> Self {
        Self {
            stride: stride.max(1),
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn includes(&self, index: usize, len: usize) -> bool {
        index == 0 || index + 1 == len || index % self.stride == 0
    }

    pub fn sample<'a>(
        &self,
        points: &'a [Coordinate],
    ) -> impl Iterator<Item = (usize, Coordinate)> + 'a {
        let sampling = *self;
        points
            .iter()
            .copied()
            .enumerate()
            .filter(move |(index, _)| sampling.includes(*index, points.len()))
    }
}

impl Default for VertexSampling {
    fn default() -> Self {
        Self::ALL
    }
}

/// A sampled vertex, addressed by the position of its segment in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexRef {
    pub segment: usize,
    pub index: usize,
    pub point: Coordinate,
}

/// All sampled vertices of usable segments, in scan order.
pub fn sampled_vertices(segments: &[RouteSegment], sampling: VertexSampling) -> Vec<VertexRef> {
    segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| segment.is_usable())
        .flat_map(|(segment_pos, segment)| {
            sampling
                .sample(&segment.points)
                .map(move |(index, point)| VertexRef {
                    segment: segment_pos,
                    index,
                    point,
                })
        })
        .collect()
}

pub fn find_nearest_route_point(
    target: Coordinate,
    segments: &[RouteSegment],
    sampling: VertexSampling,
) -> Option<NearestPointResult> {
    let mut best: Option<NearestPointResult> = None;

    for segment in segments.iter().filter(|s| s.is_usable()) {
        let Some(id) = segment.id.as_deref() else {
            continue;
        };
        for (index, point) in sampling.sample(&segment.points) {
            let distance = distance_km(target, point);
            if best.as_ref().map_or(true, |b| distance < b.distance_km) {
                best = Some(NearestPointResult {
                    point,
                    route_id: id.to_string(),
                    index,
                    distance_km: distance,
                });
            }
        }
    }

    best
}

pub fn find_nearest_route_segment(
    target: Coordinate,
    segments: &[RouteSegment],
) -> Option<NearestSegmentResult> {
    let mut best: Option<NearestSegmentResult> = None;

    for segment in segments.iter().filter(|s| s.is_usable()) {
        let Some(id) = segment.id.as_deref() else {
            continue;
        };
        for (i, pair) in segment.points.windows(2).enumerate() {
            let distance = distance_to_segment_km(target, pair[0], pair[1]);
            if best.as_ref().map_or(true, |b| distance < b.distance_km) {
                best = Some(NearestSegmentResult {
                    route_id: id.to_string(),
                    segment: [pair[0], pair[1]],
                    insert_index: i + 1,
                    distance_km: distance,
                    projection: project_point_onto_segment(target, pair[0], pair[1]),
                });
            }
        }
    }

    best
}
