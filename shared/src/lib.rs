use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lng: self.lng + (other.lng - self.lng) * t,
        }
    }
}

/// Gradient category of a drawn route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slope {
    #[serde(alias = "flach")]
    Flat,
    #[serde(alias = "leicht")]
    Light,
    #[serde(alias = "mittel")]
    Medium,
    #[serde(alias = "steil")]
    Steep,
    #[serde(alias = "varierend", alias = "variierend")]
    Varying,
}

impl Slope {
    pub fn as_str(self) -> &'static str {
        match self {
            Slope::Flat => "flat",
            Slope::Light => "light",
            Slope::Medium => "medium",
            Slope::Steep => "steep",
            Slope::Varying => "varying",
        }
    }
}

impl fmt::Display for Slope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSlope(pub String);

impl fmt::Display for UnknownSlope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown slope label `{}`", self.0)
    }
}

impl std::error::Error for UnknownSlope {}

impl FromStr for Slope {
    type Err = UnknownSlope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" | "flach" => Ok(Slope::Flat),
            "light" | "leicht" => Ok(Slope::Light),
            "medium" | "mittel" => Ok(Slope::Medium),
            "steep" | "steil" => Ok(Slope::Steep),
            "varying" | "varierend" | "variierend" => Ok(Slope::Varying),
            _ => Err(UnknownSlope(s.to_string())),
        }
    }
}

/// Labels the store does not know about count as "no slope recorded".
fn lenient_slope<'de, D>(deserializer: D) -> Result<Option<Slope>, D::Error>
where
    D: Deserializer<'de>,
{
    let label: Option<String> = Option::deserialize(deserializer)?;
    Ok(label.and_then(|label| label.parse().ok()))
}

/// One user-drawn bike path as held by the segment store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub points: Vec<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Per-user star ratings, keyed by user id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ratings: BTreeMap<String, f64>,
    #[serde(
        default,
        deserialize_with = "lenient_slope",
        skip_serializing_if = "Option::is_none"
    )]
    pub slope: Option<Slope>,
    /// Moderation state. Segments without one predate moderation and count as approved.
    #[serde(default, alias = "isApproved", skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl RouteSegment {
    pub fn new(id: impl Into<String>, points: Vec<Coordinate>) -> Self {
        Self {
            id: Some(id.into()),
            points,
            ..Default::default()
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_slope(mut self, slope: Slope) -> Self {
        self.slope = Some(slope);
        self
    }

    pub fn with_approval(mut self, approved: bool) -> Self {
        self.approved = Some(approved);
        self
    }

    /// Only segments a moderator has not rejected are offered for routing.
    pub fn is_approved(&self) -> bool {
        self.approved != Some(false)
    }

    /// Segments without an id or with fewer than two points take no part in routing.
    pub fn is_usable(&self) -> bool {
        self.id.is_some() && self.points.len() >= 2
    }

    /// The stored average, or the mean of the individual ratings when only those exist.
    /// Zero counts as unrated.
    pub fn effective_rating(&self) -> Option<f64> {
        let rating = self.rating.or_else(|| {
            if self.ratings.is_empty() {
                None
            } else {
                Some(self.ratings.values().sum::<f64>() / self.ratings.len() as f64)
            }
        })?;
        (rating.is_finite() && rating > 0.0).then_some(rating)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    #[default]
    Fastest,
    Flattest,
    BestRated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingPreference {
    #[serde(default, alias = "routeType")]
    pub route_type: RouteType,
    #[serde(default, alias = "avoidSteepSlopes")]
    pub avoid_steep_slopes: bool,
}

impl RoutingPreference {
    pub fn new(route_type: RouteType, avoid_steep_slopes: bool) -> Self {
        Self {
            route_type,
            avoid_steep_slopes,
        }
    }

    /// Plain fewest-hops search is only used when nothing is being optimised.
    pub fn is_weighted(&self) -> bool {
        self.route_type != RouteType::Fastest || self.avoid_steep_slopes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestPointResult {
    pub point: Coordinate,
    pub route_id: String,
    pub index: usize,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestSegmentResult {
    pub route_id: String,
    pub segment: [Coordinate; 2],
    /// Position at which a new vertex splits the edge.
    pub insert_index: usize,
    pub distance_km: f64,
    pub projection: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteStrategy {
    External,
    SameSegment { segment: String },
    Graph { segments: Vec<String> },
    Greedy { steps: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: Coordinate,
    pub end: Coordinate,
    #[serde(default)]
    pub preference: RoutingPreference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    pub duration_min: f64,
    pub strategy: RouteStrategy,
    pub gpx_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapRequest {
    pub point: Coordinate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapResponse {
    pub nearest_point: Option<NearestPointResult>,
    pub nearest_segment: Option<NearestSegmentResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
