pub use shared::{
    ApiError, Coordinate, NearestPointResult, NearestSegmentResult, RouteRequest, RouteResponse,
    RouteSegment, RouteStrategy, RouteType, RoutingPreference, Slope, SnapRequest, SnapResponse,
};

/// A stitched route with the summary figures shown next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    pub duration_min: f64,
    pub strategy: RouteStrategy,
}
