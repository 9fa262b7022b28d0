//! Point-to-point routing through an external road router.
//!
//! A [`RoadRouter`] never fails: when the service cannot produce a route the
//! caller gets the straight line between the two points.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::models::Coordinate;

pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_OSRM_PROFILE: &str = "bicycle";
pub const DEFAULT_OSRM_TIMEOUT: Duration = Duration::from_secs(10);

pub trait RoadRouter: Send + Sync {
    /// Best-effort route from `start` to `end`, at least `[start, end]`.
    fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> impl Future<Output = Vec<Coordinate>> + Send;
}

/// Straight lines only. Used offline and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectLineRouter;

impl RoadRouter for DirectLineRouter {
    async fn route(&self, start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
        vec![start, end]
    }
}

#[derive(Debug, Error)]
pub enum ExternalRouteError {
    #[error("request to routing service failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("routing service answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("routing service found no route (code {0})")]
    NoRoute(String),
    #[error("invalid routing service response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("route geometry has {0} coordinates")]
    TooShort(usize),
}

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout: Duration,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OSRM_URL.to_string(),
            profile: DEFAULT_OSRM_PROFILE.to_string(),
            timeout: DEFAULT_OSRM_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: `[lng, lat]`.
    coordinates: Vec<[f64; 2]>,
}

/// Extract the first route's geometry from an OSRM `route` response body.
pub fn parse_osrm_response(body: &[u8]) -> Result<Vec<Coordinate>, ExternalRouteError> {
    let response: OsrmResponse = serde_json::from_slice(body)?;
    if response.code != "Ok" {
        return Err(ExternalRouteError::NoRoute(response.code));
    }
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ExternalRouteError::NoRoute(response.code))?;

    let path: Vec<Coordinate> = route
        .geometry
        .coordinates
        .into_iter()
        .map(|[lng, lat]| Coordinate::new(lat, lng))
        .collect();
    if path.len() < 2 {
        return Err(ExternalRouteError::TooShort(path.len()));
    }
    Ok(path)
}

/// Client for an OSRM-compatible `route` service.
#[derive(Debug, Clone)]
pub struct OsrmRouter {
    client: reqwest::Client,
    config: OsrmConfig,
}

impl OsrmRouter {
    pub fn new(config: OsrmConfig) -> Result<Self, ExternalRouteError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn route_url(&self, start: Coordinate, end: Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            start.lng,
            start.lat,
            end.lng,
            end.lat
        )
    }

    /// One request without the straight-line fallback.
    pub async fn fetch(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<Vec<Coordinate>, ExternalRouteError> {
        let response = self.client.get(self.route_url(start, end)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExternalRouteError::Status(status));
        }
        let body = response.bytes().await?;
        parse_osrm_response(&body)
    }
}

impl RoadRouter for OsrmRouter {
    async fn route(&self, start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
        match self.fetch(start, end).await {
            Ok(path) => {
                tracing::debug!("external route with {} points", path.len());
                path
            }
            Err(err) => {
                tracing::warn!("external routing failed, using straight line: {err}");
                vec![start, end]
            }
        }
    }
}

/// The router selected at startup.
#[derive(Debug, Clone)]
pub enum ConfiguredRouter {
    Osrm(OsrmRouter),
    Direct(DirectLineRouter),
}

impl RoadRouter for ConfiguredRouter {
    async fn route(&self, start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
        match self {
            Self::Osrm(router) => router.route(start, end).await,
            Self::Direct(router) => router.route(start, end).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_geojson_coordinates_as_lng_lat() {
        let body = br#"{
            "code": "Ok",
            "routes": [{
                "distance": 812.4,
                "geometry": {"type": "LineString", "coordinates": [[8.69, 49.40], [8.695, 49.401], [8.70, 49.402]]}
            }]
        }"#;
        let path = parse_osrm_response(body).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], Coordinate::new(49.40, 8.69));
        assert_eq!(path[2], Coordinate::new(49.402, 8.70));
    }

    #[test]
    fn rejects_non_ok_code() {
        let body = br#"{"code": "NoRoute", "message": "Impossible route"}"#;
        assert!(matches!(
            parse_osrm_response(body),
            Err(ExternalRouteError::NoRoute(code)) if code == "NoRoute"
        ));
    }

    #[test]
    fn rejects_empty_or_short_routes() {
        assert!(matches!(
            parse_osrm_response(br#"{"code": "Ok", "routes": []}"#),
            Err(ExternalRouteError::NoRoute(_))
        ));
        let single = br#"{"code": "Ok", "routes": [{"geometry": {"coordinates": [[8.69, 49.4]]}}]}"#;
        assert!(matches!(
            parse_osrm_response(single),
            Err(ExternalRouteError::TooShort(1))
        ));
        assert!(matches!(
            parse_osrm_response(b"<html>"),
            Err(ExternalRouteError::Parse(_))
        ));
    }

    #[test]
    fn builds_route_url() {
        let router = OsrmRouter::new(OsrmConfig {
            base_url: "http://localhost:5000/".into(),
            ..OsrmConfig::default()
        })
        .unwrap();
        let url = router.route_url(Coordinate::new(49.4, 8.69), Coordinate::new(49.41, 8.7));
        assert_eq!(
            url,
            "http://localhost:5000/route/v1/bicycle/8.69,49.4;8.7,49.41?overview=full&geometries=geojson"
        );
    }

    #[tokio::test]
    async fn direct_router_returns_straight_line() {
        let a = Coordinate::new(1.0, 2.0);
        let b = Coordinate::new(3.0, 4.0);
        assert_eq!(DirectLineRouter.route(a, b).await, vec![a, b]);
        assert_eq!(
            ConfiguredRouter::Direct(DirectLineRouter).route(a, b).await,
            vec![a, b]
        );
    }
}
