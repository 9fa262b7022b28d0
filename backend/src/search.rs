//! Segment-level path search over a [`RouteGraph`].
//!
//! Two strategies share one entry point:
//!
//! - **Fewest hops** (BFS) when the preference is `fastest` with no slope avoidance.
//! - **Weighted** (Dijkstra) otherwise. The cost of stepping into a segment
//!   depends only on that segment's attributes:
//!
//! ```text
//! best_rated: 1 / rating³, or 20 when unrated
//! flattest:   flat 0.01, light 0.2, medium 5, steep 100, varying 10, unknown 8
//! fastest:    1
//! avoid_steep_slopes and steep: cost × 10
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use petgraph::graph::NodeIndex;

use crate::connections::RouteGraph;
use crate::models::{RouteSegment, RouteType, RoutingPreference, Slope};

const UNRATED_WEIGHT: f64 = 20.0;
const UNKNOWN_SLOPE_WEIGHT: f64 = 8.0;
const STEEP_AVOIDANCE_FACTOR: f64 = 10.0;

/// Cost of entering `segment` under `preference`.
pub fn traversal_weight(segment: &RouteSegment, preference: RoutingPreference) -> f64 {
    let mut weight = match preference.route_type {
        RouteType::BestRated => match segment.effective_rating() {
            Some(rating) => 1.0 / rating.powi(3),
            None => UNRATED_WEIGHT,
        },
        RouteType::Flattest => match segment.slope {
            Some(Slope::Flat) => 0.01,
            Some(Slope::Light) => 0.2,
            Some(Slope::Medium) => 5.0,
            Some(Slope::Steep) => 100.0,
            Some(Slope::Varying) => 10.0,
            None => UNKNOWN_SLOPE_WEIGHT,
        },
        RouteType::Fastest => 1.0,
    };

    if preference.avoid_steep_slopes && segment.slope == Some(Slope::Steep) {
        weight *= STEEP_AVOIDANCE_FACTOR;
    }
    weight
}

/// Ordered list of segment ids leading from `start_id` to `end_id`, both inclusive.
///
/// `segments` must be the snapshot `graph` was built from.
pub fn find_segment_path(
    graph: &RouteGraph,
    segments: &[RouteSegment],
    start_id: &str,
    end_id: &str,
    preference: RoutingPreference,
) -> Option<Vec<String>> {
    let start = graph.node(start_id)?;
    let end = graph.node(end_id)?;
    if start == end {
        return Some(vec![start_id.to_string()]);
    }

    let nodes = if preference.is_weighted() {
        weighted_path(graph, start, end, |idx| {
            traversal_weight(&segments[graph.segment(idx).position], preference)
        })
    } else {
        fewest_hops_path(graph, start, end)
    }?;

    Some(
        nodes
            .into_iter()
            .map(|idx| graph.segment(idx).id.clone())
            .collect(),
    )
}

pub fn fewest_hops_path(
    graph: &RouteGraph,
    start: NodeIndex,
    end: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    previous.insert(start, start);

    while let Some(current) = queue.pop_front() {
        for next in graph.neighbors(current) {
            if previous.contains_key(&next) {
                continue;
            }
            previous.insert(next, current);
            if next == end {
                return Some(reconstruct(&previous, start, end));
            }
            queue.push_back(next);
        }
    }

    None
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    cost: f64,
    /// Discovery order; earlier entries win cost ties.
    seq: usize,
    node: NodeIndex,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Reversed so the max-heap pops the cheapest, earliest entry.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub fn weighted_path(
    graph: &RouteGraph,
    start: NodeIndex,
    end: NodeIndex,
    weight: impl Fn(NodeIndex) -> f64,
) -> Option<Vec<NodeIndex>> {
    let mut dist: HashMap<NodeIndex, f64> = HashMap::new();
    let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut heap = BinaryHeap::new();
    let mut seq = 0;

    dist.insert(start, 0.0);
    previous.insert(start, start);
    heap.push(QueueEntry {
        cost: 0.0,
        seq,
        node: start,
    });

    while let Some(QueueEntry { cost, node, .. }) = heap.pop() {
        if node == end {
            return Some(reconstruct(&previous, start, end));
        }
        if dist.get(&node).is_some_and(|&best| cost > best) {
            continue;
        }

        for next in graph.neighbors(node) {
            let candidate = cost + weight(next);
            let improves = dist.get(&next).map_or(true, |&known| candidate < known);
            if improves {
                dist.insert(next, candidate);
                previous.insert(next, node);
                seq += 1;
                heap.push(QueueEntry {
                    cost: candidate,
                    seq,
                    node: next,
                });
            }
        }
    }

    None
}

fn reconstruct(
    previous: &HashMap<NodeIndex, NodeIndex>,
    start: NodeIndex,
    end: NodeIndex,
) -> Vec<NodeIndex> {
    let mut path = vec![end];
    let mut current = end;
    while current != start {
        current = previous[&current];
        path.push(current);
    }
    path.reverse();
    path
}
