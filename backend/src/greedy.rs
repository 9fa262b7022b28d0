//! Last-resort local walk used when the segment graph has no path.
//!
//! Starting at the start snap vertex, each step jumps to the sampled vertex
//! within reach that scores best against the end point and the active
//! preference. The walk is a heuristic: it can hop between segments that are
//! not connected, and the result is not optimal.

use std::collections::HashSet;

use crate::geometry::{distance_km, is_within_distance};
use crate::index::{VertexSampling, sampled_vertices};
use crate::models::{Coordinate, RouteSegment, RouteType, RoutingPreference, Slope};

const END_WEIGHT: f64 = 2.0;
const SAME_ROUTE_BONUS: f64 = 3.0;
const RATING_BONUS: f64 = 10.0;
const FASTEST_END_WEIGHT: f64 = 8.0;
const FASTEST_STEEP_PENALTY: f64 = 25.0;
const AVOID_STEEP_PENALTY: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreedyConfig {
    /// Candidates farther than this from the current point are ignored.
    pub search_radius_km: f64,
    /// The walk stops once it is within this distance of the end point.
    pub arrival_km: f64,
    pub max_steps: usize,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            search_radius_km: 5.0,
            arrival_km: 0.1,
            max_steps: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GreedyWalk {
    /// Visited vertices, beginning with the start vertex.
    pub points: Vec<Coordinate>,
    pub steps: usize,
    /// Whether the last point lies within the arrival distance of the end.
    pub reached: bool,
}

/// Where the walk begins: a vertex of the segment with id `route_id`.
#[derive(Debug, Clone, Copy)]
pub struct WalkStart<'a> {
    pub route_id: &'a str,
    pub index: usize,
    pub point: Coordinate,
}

/// Preference-specific score adjustment for stepping onto `segment`.
fn preference_adjustment(
    segment: &RouteSegment,
    preference: RoutingPreference,
    to_end_km: f64,
) -> f64 {
    let steep = segment.slope == Some(Slope::Steep);
    let mut score = match preference.route_type {
        RouteType::BestRated => segment
            .effective_rating()
            .map_or(0.0, |rating| rating.powi(3) * RATING_BONUS),
        RouteType::Flattest => match segment.slope {
            Some(Slope::Flat) => 50.0,
            Some(Slope::Light) => 25.0,
            Some(Slope::Medium) => -10.0,
            Some(Slope::Steep) => -100.0,
            Some(Slope::Varying) => -25.0,
            None => 0.0,
        },
        RouteType::Fastest => {
            let mut score = -FASTEST_END_WEIGHT * to_end_km;
            if steep {
                score -= FASTEST_STEEP_PENALTY;
            }
            score
        }
    };
    if preference.avoid_steep_slopes && steep {
        score -= AVOID_STEEP_PENALTY;
    }
    score
}

/// Walk from `start` towards `end` across sampled vertices of `segments`.
///
/// Returns `None` when the walk is stuck at its first vertex without having
/// arrived, i.e. no candidate lies within the search radius.
pub fn greedy_walk(
    segments: &[RouteSegment],
    start: WalkStart<'_>,
    end: Coordinate,
    preference: RoutingPreference,
    sampling: VertexSampling,
    config: GreedyConfig,
) -> Option<GreedyWalk> {
    let vertices = sampled_vertices(segments, sampling);

    let mut taken = HashSet::new();
    let mut visited_routes = HashSet::new();
    if let Some(position) = segments
        .iter()
        .position(|s| s.is_usable() && s.id.as_deref() == Some(start.route_id))
    {
        taken.insert((position, start.index));
        visited_routes.insert(position);
    }

    let mut current = start.point;
    let mut points = vec![current];
    let mut steps = 0;

    while steps < config.max_steps && !is_within_distance(current, end, config.arrival_km) {
        let mut best: Option<(f64, usize)> = None;
        for (i, vertex) in vertices.iter().enumerate() {
            if taken.contains(&(vertex.segment, vertex.index)) {
                continue;
            }
            let from_current = distance_km(current, vertex.point);
            if from_current > config.search_radius_km {
                continue;
            }
            let to_end = distance_km(vertex.point, end);

            let mut score = -END_WEIGHT * to_end - from_current;
            if visited_routes.contains(&vertex.segment) {
                score += SAME_ROUTE_BONUS;
            }
            score += preference_adjustment(&segments[vertex.segment], preference, to_end);

            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, i));
            }
        }

        let Some((_, chosen)) = best else {
            break;
        };
        let vertex = vertices[chosen];
        taken.insert((vertex.segment, vertex.index));
        visited_routes.insert(vertex.segment);
        current = vertex.point;
        points.push(current);
        steps += 1;
    }

    let reached = is_within_distance(current, end, config.arrival_km);
    tracing::debug!("greedy walk took {steps} steps, reached end: {reached}");
    if steps == 0 && !reached {
        return None;
    }
    Some(GreedyWalk {
        points,
        steps,
        reached,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate { lat, lng }
    }

    fn start_at<'a>(segments: &'a [RouteSegment], id: &'a str, index: usize) -> WalkStart<'a> {
        let segment = segments
            .iter()
            .find(|s| s.id.as_deref() == Some(id))
            .unwrap();
        WalkStart {
            route_id: id,
            index,
            point: segment.points[index],
        }
    }

    #[test]
    fn walks_across_disconnected_segments_to_the_end() {
        // 0.003° ≈ 333 m gap, too wide for the graph but within reach here
        let segments = vec![
            RouteSegment::new("a", vec![c(0.0, 0.0), c(0.0, 0.005), c(0.0, 0.01)]),
            RouteSegment::new("b", vec![c(0.0, 0.013), c(0.0, 0.018), c(0.0, 0.023)]),
        ];
        let end = segments[1].points[2];
        let walk = greedy_walk(
            &segments,
            start_at(&segments, "a", 0),
            end,
            RoutingPreference::default(),
            VertexSampling::ALL,
            GreedyConfig::default(),
        )
        .expect("walk");

        assert!(walk.reached);
        assert_eq!(walk.points.first(), Some(&c(0.0, 0.0)));
        assert_eq!(walk.points.last(), Some(&end));
        assert!(walk.steps <= GreedyConfig::default().max_steps);
    }

    #[test]
    fn no_candidates_in_reach_returns_none() {
        // the only segment lies about 111 km away
        let segments = vec![RouteSegment::new("b", vec![c(0.0, 1.0), c(0.0, 1.01)])];
        let start = WalkStart {
            route_id: "a",
            index: 0,
            point: c(0.0, 0.0),
        };
        assert!(greedy_walk(
            &segments,
            start,
            c(0.0, 1.01),
            RoutingPreference::default(),
            VertexSampling::ALL,
            GreedyConfig::default(),
        )
        .is_none());
    }

    #[test]
    fn already_arrived_is_not_a_failure() {
        let segments = vec![RouteSegment::new("a", vec![c(0.0, 0.0), c(0.0, 0.01)])];
        let walk = greedy_walk(
            &segments,
            start_at(&segments, "a", 0),
            c(0.0, 0.0002),
            RoutingPreference::default(),
            VertexSampling::ALL,
            GreedyConfig::default(),
        )
        .expect("walk");
        assert!(walk.reached);
        assert_eq!(walk.steps, 0);
        assert_eq!(walk.points, vec![c(0.0, 0.0)]);
    }

    /// Origin at (0, 0) with a northern and a southern candidate segment that
    /// both run east towards the end at (0, 0.2).
    fn fork(north: RouteSegment, south: RouteSegment) -> Vec<RouteSegment> {
        vec![
            RouteSegment::new("origin", vec![c(0.0, 0.0), c(0.0, -0.01)]),
            north,
            south,
        ]
    }

    fn first_step(segments: &[RouteSegment], preference: RoutingPreference) -> Coordinate {
        let config = GreedyConfig {
            max_steps: 1,
            ..GreedyConfig::default()
        };
        let walk = greedy_walk(
            segments,
            start_at(segments, "origin", 0),
            c(0.0, 0.2),
            preference,
            VertexSampling::ALL,
            config,
        )
        .expect("walk");
        assert_eq!(walk.steps, 1);
        walk.points[1]
    }

    #[test]
    fn flattest_prefers_flat_neighbour() {
        // two candidates at the same distance, one flat and one steep
        let segments = fork(
            RouteSegment::new("steep", vec![c(0.001, 0.002), c(0.001, 0.1)]).with_slope(Slope::Steep),
            RouteSegment::new("flat", vec![c(-0.001, 0.002), c(-0.001, 0.1)]).with_slope(Slope::Flat),
        );
        let step = first_step(&segments, RoutingPreference::new(RouteType::Flattest, false));
        assert_eq!(step.lat, -0.001);
    }

    #[test]
    fn best_rated_prefers_rated_neighbour() {
        // the rated segment reaches less far towards the end
        let segments = fork(
            RouteSegment::new("rated", vec![c(0.001, 0.002), c(0.001, 0.05)]).with_rating(4.0),
            RouteSegment::new("unrated", vec![c(-0.001, 0.002), c(-0.001, 0.1)]),
        );
        let step = first_step(&segments, RoutingPreference::new(RouteType::BestRated, false));
        assert_eq!(step, c(0.001, 0.05));
    }

    #[test]
    fn fastest_penalises_steep_neighbour() {
        // the steep segment gets about 1 km closer to the end
        let segments = fork(
            RouteSegment::new("steep", vec![c(0.001, 0.002), c(0.001, 0.11)]).with_slope(Slope::Steep),
            RouteSegment::new("medium", vec![c(-0.001, 0.002), c(-0.001, 0.1)])
                .with_slope(Slope::Medium),
        );
        let step = first_step(&segments, RoutingPreference::new(RouteType::Fastest, false));
        assert_eq!(step, c(-0.001, 0.1));
    }

    #[test]
    fn fastest_favours_progress_towards_the_end() {
        let segments = fork(
            RouteSegment::new("short", vec![c(0.001, 0.002), c(0.001, 0.05)]),
            RouteSegment::new("long", vec![c(-0.001, 0.002), c(-0.001, 0.1)]),
        );
        let step = first_step(&segments, RoutingPreference::new(RouteType::Fastest, false));
        assert_eq!(step, c(-0.001, 0.1));
    }

    #[test]
    fn avoiding_steep_slopes_overrides_a_better_candidate() {
        // equally rated; the steep segment reaches further east
        let segments = fork(
            RouteSegment::new("steep", vec![c(0.001, 0.002), c(0.001, 0.12)])
                .with_slope(Slope::Steep)
                .with_rating(3.0),
            RouteSegment::new("gentle", vec![c(-0.001, 0.002), c(-0.001, 0.1)])
                .with_slope(Slope::Light)
                .with_rating(3.0),
        );
        let plain = first_step(&segments, RoutingPreference::new(RouteType::BestRated, false));
        assert_eq!(plain, c(0.001, 0.12));
        let careful = first_step(&segments, RoutingPreference::new(RouteType::BestRated, true));
        assert_eq!(careful, c(-0.001, 0.1));
    }

    #[test]
    fn arrival_distance_is_inclusive() {
        let segments = vec![RouteSegment::new("a", vec![c(0.0, 0.0), c(0.0, 0.01)])];
        let end = c(0.0, 0.0009);
        let config = GreedyConfig {
            arrival_km: distance_km(c(0.0, 0.0), end),
            ..GreedyConfig::default()
        };
        let walk = greedy_walk(
            &segments,
            start_at(&segments, "a", 0),
            end,
            RoutingPreference::default(),
            VertexSampling::ALL,
            config,
        )
        .expect("walk");
        assert!(walk.reached);
        assert_eq!(walk.steps, 0);
    }

    #[test]
    fn walk_never_revisits_a_vertex() {
        let segments = vec![
            RouteSegment::new("a", vec![c(0.0, 0.0), c(0.0, 0.001), c(0.0, 0.002)]),
            RouteSegment::new("b", vec![c(0.001, 0.0), c(0.001, 0.001)]),
        ];
        // the end is unreachable, so the walk runs until it runs out of vertices
        let walk = greedy_walk(
            &segments,
            start_at(&segments, "a", 0),
            c(1.0, 1.0),
            RoutingPreference::default(),
            VertexSampling::ALL,
            GreedyConfig::default(),
        )
        .expect("walk");
        assert!(!walk.reached);
        assert_eq!(walk.steps, 4);
        let mut seen: Vec<(u64, u64)> = walk
            .points
            .iter()
            .map(|p| (p.lat.to_bits(), p.lng.to_bits()))
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), walk.points.len());
    }
}
