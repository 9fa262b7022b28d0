use std::collections::{BTreeMap, BTreeSet, HashMap};

use kdtree::KdTree;
use kdtree::distance::squared_euclidean;
use petgraph::graph::{NodeIndex, UnGraph};

use crate::geometry::{EARTH_RADIUS_KM, distance_km};
use crate::index::{VertexSampling, sampled_vertices};
use crate::models::{Coordinate, RouteSegment};

pub const DEFAULT_CONNECTION_THRESHOLD_M: f64 = 150.0;

/// Slack on the chord radius so rounding never drops a pair the haversine
/// test would accept.
const CHORD_SLACK: f64 = 1.0 + 1e-6;

/// Position on a sphere of Earth's radius, in kilometres.
fn to_cartesian(point: Coordinate) -> [f64; 3] {
    let (lat, lng) = (point.lat.to_radians(), point.lng.to_radians());
    [
        EARTH_RADIUS_KM * lat.cos() * lng.cos(),
        EARTH_RADIUS_KM * lat.cos() * lng.sin(),
        EARTH_RADIUS_KM * lat.sin(),
    ]
}

/// Straight-line distance through the sphere between two points `arc_km` apart.
fn chord_km(arc_km: f64) -> f64 {
    let half_angle = (arc_km / (2.0 * EARTH_RADIUS_KM)).min(std::f64::consts::FRAC_PI_2);
    2.0 * EARTH_RADIUS_KM * half_angle.sin()
}

#[derive(Debug, Clone)]
pub struct SegmentNode {
    pub id: String,
    /// Position of the segment in the snapshot the graph was built from.
    pub position: usize,
}

/// Proximity graph over the segments of one snapshot.
///
/// Nodes are added in snapshot order, so `NodeIndex` order is snapshot order.
#[derive(Debug, Clone)]
pub struct RouteGraph {
    graph: UnGraph<SegmentNode, ()>,
    ids: HashMap<String, NodeIndex>,
}

impl RouteGraph {
    pub fn node(&self, id: &str) -> Option<NodeIndex> {
        self.ids.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn segment(&self, idx: NodeIndex) -> &SegmentNode {
        &self.graph[idx]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Neighbours of a node in snapshot order.
    pub fn neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        match (self.node(a), self.node(b)) {
            (Some(a), Some(b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Adjacency view keyed by segment id.
    pub fn connections(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.graph
            .node_indices()
            .map(|idx| {
                let neighbours = self
                    .graph
                    .neighbors(idx)
                    .map(|n| self.graph[n].id.clone())
                    .collect();
                (self.graph[idx].id.clone(), neighbours)
            })
            .collect()
    }
}

/// Connect every pair of segments that have a sampled vertex pair closer than
/// `threshold_m`.
///
/// Candidate pairs come from a kd-tree over points on the sphere, queried with
/// the chord length of the threshold. Every vertex within the threshold is a
/// candidate, including across the antimeridian and near the poles; the
/// haversine test then decides, so the result matches a full pairwise scan.
pub fn build_connections(
    segments: &[RouteSegment],
    threshold_m: f64,
    sampling: VertexSampling,
) -> RouteGraph {
    let mut graph = UnGraph::new_undirected();
    let mut ids = HashMap::new();
    let mut node_by_position = HashMap::new();

    for (position, segment) in segments.iter().enumerate() {
        if !segment.is_usable() {
            continue;
        }
        let Some(id) = segment.id.as_ref() else {
            continue;
        };
        if ids.contains_key(id) {
            tracing::debug!("duplicate segment id {id}, keeping the first occurrence");
            continue;
        }
        let idx = graph.add_node(SegmentNode {
            id: id.clone(),
            position,
        });
        ids.insert(id.clone(), idx);
        node_by_position.insert(position, idx);
    }

    let vertices: Vec<_> = sampled_vertices(segments, sampling)
        .into_iter()
        .filter(|v| node_by_position.contains_key(&v.segment))
        .filter(|v| v.point.lat.is_finite() && v.point.lng.is_finite())
        .collect();

    let threshold_km = threshold_m / 1000.0;
    if vertices.is_empty() || threshold_km <= 0.0 {
        return RouteGraph { graph, ids };
    }

    let positions: Vec<[f64; 3]> = vertices.iter().map(|v| to_cartesian(v.point)).collect();
    let mut tree = KdTree::new(3);
    for (i, position) in positions.iter().enumerate() {
        if let Err(err) = tree.add(*position, i) {
            tracing::warn!(
                "skipping vertex {} of segment {} in proximity index: {err:?}",
                vertices[i].index,
                vertices[i].segment
            );
        }
    }

    let radius = chord_km(threshold_km) * CHORD_SLACK;
    for (i, vertex) in vertices.iter().enumerate() {
        let Ok(candidates) = tree.within(&positions[i], radius * radius, &squared_euclidean)
        else {
            continue;
        };

        let from = node_by_position[&vertex.segment];
        for (_, &j) in candidates {
            if j <= i {
                continue;
            }
            let other = &vertices[j];
            if other.segment == vertex.segment {
                continue;
            }
            let to = node_by_position[&other.segment];
            if graph.contains_edge(from, to) {
                continue;
            }
            if distance_km(vertex.point, other.point) < threshold_km {
                graph.add_edge(from, to, ());
            }
        }
    }

    tracing::debug!(
        "built segment graph: {} segments, {} connections, {} sampled vertices",
        graph.node_count(),
        graph.edge_count(),
        vertices.len()
    );

    RouteGraph { graph, ids }
}
