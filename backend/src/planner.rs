use std::borrow::Cow;
use std::collections::HashSet;

use crate::connections::{DEFAULT_CONNECTION_THRESHOLD_M, build_connections};
use crate::external::RoadRouter;
use crate::geometry::{
    AVERAGE_CYCLING_SPEED_KMH, distance_km, estimated_duration_min, total_distance_km,
};
use crate::greedy::{GreedyConfig, WalkStart, greedy_walk};
use crate::index::{VertexSampling, find_nearest_route_point, find_nearest_route_segment};
use crate::models::{
    Coordinate, NearestPointResult, PlannedRoute, RouteSegment, RouteStrategy, RoutingPreference,
    SnapResponse,
};
use crate::search::find_segment_path;
use crate::stitch::{
    DEFAULT_REDUNDANT_DISTANCE_KM, remove_redundant_points, same_segment_path,
    stitch_segment_path,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    pub sampling: VertexSampling,
    pub connection_threshold_m: f64,
    /// Endpoints farther than this from every segment are routed externally.
    pub max_snap_distance_km: f64,
    /// Approach and exit legs longer than this go through the road router.
    pub approach_threshold_km: f64,
    pub redundant_distance_km: f64,
    pub greedy: GreedyConfig,
    /// Try the greedy walk when the segment graph has no path.
    pub greedy_fallback: bool,
    pub average_speed_kmh: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            sampling: VertexSampling::ALL,
            connection_threshold_m: DEFAULT_CONNECTION_THRESHOLD_M,
            max_snap_distance_km: 2.0,
            approach_threshold_km: 0.05,
            redundant_distance_km: DEFAULT_REDUNDANT_DISTANCE_KM,
            greedy: GreedyConfig::default(),
            greedy_fallback: true,
            average_speed_kmh: AVERAGE_CYCLING_SPEED_KMH,
        }
    }
}

/// Builds bike routes over a segment snapshot, falling back to a road router
/// where the segments do not reach.
///
/// The planner holds no per-request state; every call works on the snapshot it
/// is given and builds its own segment graph.
#[derive(Debug, Clone)]
pub struct RoutePlanner<R> {
    config: PlannerConfig,
    router: R,
}

impl<R: RoadRouter> RoutePlanner<R> {
    pub fn new(config: PlannerConfig, router: R) -> Self {
        Self { config, router }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Route with summary figures.
    pub async fn plan(
        &self,
        segments: &[RouteSegment],
        start: Coordinate,
        end: Coordinate,
        preference: RoutingPreference,
    ) -> PlannedRoute {
        let (path, strategy) = self.route(segments, start, end, preference).await;
        let distance_km = total_distance_km(&path);
        PlannedRoute {
            duration_min: estimated_duration_min(distance_km, self.config.average_speed_kmh),
            path,
            distance_km,
            strategy,
        }
    }

    /// Full route from `start` to `end`. Always at least two points, starting
    /// at `start` and ending at `end`.
    pub async fn build_full_route(
        &self,
        segments: &[RouteSegment],
        start: Coordinate,
        end: Coordinate,
        preference: RoutingPreference,
    ) -> Vec<Coordinate> {
        self.route(segments, start, end, preference).await.0
    }

    /// Nearest vertex and nearest edge to `point`.
    pub fn snap(&self, segments: &[RouteSegment], point: Coordinate) -> SnapResponse {
        let segments = distinct_segments(segments);
        SnapResponse {
            nearest_point: find_nearest_route_point(point, &segments, self.config.sampling),
            nearest_segment: find_nearest_route_segment(point, &segments),
        }
    }

    async fn route(
        &self,
        segments: &[RouteSegment],
        start: Coordinate,
        end: Coordinate,
        preference: RoutingPreference,
    ) -> (Vec<Coordinate>, RouteStrategy) {
        let segments = distinct_segments(segments);
        let sampling = self.config.sampling;

        let snaps = find_nearest_route_point(start, &segments, sampling)
            .zip(find_nearest_route_point(end, &segments, sampling));
        let Some((start_snap, end_snap)) = snaps else {
            tracing::info!("no route segments to snap to, routing externally");
            return (self.external(start, end).await, RouteStrategy::External);
        };
        if start_snap.distance_km > self.config.max_snap_distance_km
            || end_snap.distance_km > self.config.max_snap_distance_km
        {
            tracing::info!(
                "endpoints too far from segments ({:.2} km, {:.2} km), routing externally",
                start_snap.distance_km,
                end_snap.distance_km
            );
            return (self.external(start, end).await, RouteStrategy::External);
        }

        let Some((internal, strategy)) =
            self.internal_path(&segments, &start_snap, &end_snap, preference)
        else {
            tracing::info!(
                "segments {} and {} are not connected, routing externally",
                start_snap.route_id,
                end_snap.route_id
            );
            return (self.external(start, end).await, RouteStrategy::External);
        };

        let mut path = vec![start];
        let approach = self.leg(start, start_snap.point, start_snap.distance_km).await;
        append_leg(&mut path, approach);
        append_leg(&mut path, internal);
        let last = path.last().copied().unwrap_or(start);
        let exit = self.leg(last, end, distance_km(last, end)).await;
        append_leg(&mut path, exit);

        let path = anchor(path, start, end);
        let path = remove_redundant_points(&path, self.config.redundant_distance_km);
        tracing::debug!("route has {} points", path.len());
        (path, strategy)
    }

    fn internal_path(
        &self,
        segments: &[RouteSegment],
        start_snap: &NearestPointResult,
        end_snap: &NearestPointResult,
        preference: RoutingPreference,
    ) -> Option<(Vec<Coordinate>, RouteStrategy)> {
        if start_snap.route_id == end_snap.route_id {
            let segment = segments
                .iter()
                .find(|s| s.is_usable() && s.id.as_deref() == Some(start_snap.route_id.as_str()))?;
            let points = same_segment_path(&segment.points, start_snap.index, end_snap.index);
            return Some((
                points,
                RouteStrategy::SameSegment {
                    segment: start_snap.route_id.clone(),
                },
            ));
        }

        let graph = build_connections(
            segments,
            self.config.connection_threshold_m,
            self.config.sampling,
        );
        if let Some(chain) = find_segment_path(
            &graph,
            segments,
            &start_snap.route_id,
            &end_snap.route_id,
            preference,
        ) {
            if let Some(points) =
                stitch_segment_path(&graph, segments, &chain, start_snap.index, end_snap.index)
            {
                tracing::debug!("segment path: {}", chain.join(" -> "));
                return Some((points, RouteStrategy::Graph { segments: chain }));
            }
        }

        if !self.config.greedy_fallback {
            return None;
        }
        let start = WalkStart {
            route_id: &start_snap.route_id,
            index: start_snap.index,
            point: start_snap.point,
        };
        let walk = greedy_walk(
            segments,
            start,
            end_snap.point,
            preference,
            self.config.sampling,
            self.config.greedy,
        )?;
        Some((walk.points, RouteStrategy::Greedy { steps: walk.steps }))
    }

    /// Connection between a free point and the route; via the road router
    /// when longer than the approach threshold.
    async fn leg(&self, from: Coordinate, to: Coordinate, length_km: f64) -> Vec<Coordinate> {
        if length_km > self.config.approach_threshold_km {
            self.router.route(from, to).await
        } else {
            vec![from, to]
        }
    }

    async fn external(&self, start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
        let path = self.router.route(start, end).await;
        let path = anchor(path, start, end);
        remove_redundant_points(&path, self.config.redundant_distance_km)
    }
}

/// Drops later segments that reuse the id of an earlier usable one.
fn distinct_segments(segments: &[RouteSegment]) -> Cow<'_, [RouteSegment]> {
    let mut seen = HashSet::new();
    let unique = segments
        .iter()
        .filter(|s| s.is_usable())
        .filter_map(|s| s.id.as_deref())
        .all(|id| seen.insert(id));
    if unique {
        return Cow::Borrowed(segments);
    }

    let mut seen = HashSet::new();
    Cow::Owned(
        segments
            .iter()
            .filter(|s| match s.id.as_deref() {
                Some(id) if s.is_usable() => seen.insert(id),
                _ => true,
            })
            .cloned()
            .collect(),
    )
}

/// Append `leg`, skipping its leading points that repeat the current last point.
fn append_leg(path: &mut Vec<Coordinate>, leg: Vec<Coordinate>) {
    let mut leg = leg.into_iter().peekable();
    while path.last().is_some() && leg.peek().is_some() && leg.peek() == path.last() {
        leg.next();
    }
    path.extend(leg);
}

/// Make sure the route begins at `start` and finishes at `end` exactly.
fn anchor(mut path: Vec<Coordinate>, start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
    if path.first() != Some(&start) {
        path.insert(0, start);
    }
    if path.len() < 2 || path.last() != Some(&end) {
        path.push(end);
    }
    path
}
