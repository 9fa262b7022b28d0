//! Command-line and environment configuration shared by the binaries.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};
use thiserror::Error;

use crate::external::{
    ConfiguredRouter, DEFAULT_OSRM_PROFILE, DirectLineRouter, ExternalRouteError, OsrmConfig,
    OsrmRouter,
};
use crate::index::VertexSampling;
use crate::models::Coordinate;
use crate::planner::PlannerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("vertex stride must be at least 1")]
    ZeroStride,
    #[error("expected \"lat,lng\", got {0:?}")]
    Coordinate(String),
    #[error("coordinate {0:?} is out of range")]
    OutOfRange(String),
    #[error(transparent)]
    Router(#[from] ExternalRouteError),
}

/// Routing knobs shared by the server and the one-shot planner.
#[derive(Debug, Clone, Args)]
pub struct RoutingArgs {
    /// Base URL of an OSRM-compatible routing service
    #[arg(long, env = "OSRM_URL", default_value = crate::external::DEFAULT_OSRM_URL)]
    pub osrm_url: String,

    /// Timeout for one routing service request, in seconds
    #[arg(long, env = "OSRM_TIMEOUT_SECS", default_value_t = 10)]
    pub osrm_timeout_secs: u64,

    /// Never call the routing service; gaps are bridged with straight lines
    #[arg(long, env = "RADWEGE_OFFLINE")]
    pub offline: bool,

    /// Sample every n-th vertex (plus both ends) in proximity scans
    #[arg(long, env = "RADWEGE_VERTEX_STRIDE", default_value_t = 1)]
    pub vertex_stride: usize,

    /// Segments with vertices closer than this are connected, in metres
    #[arg(long, env = "RADWEGE_CONNECTION_THRESHOLD_M", default_value_t = 150.0)]
    pub connection_threshold_m: f64,

    /// Route externally instead of walking greedily when segments are disconnected
    #[arg(long)]
    pub no_greedy: bool,
}

impl RoutingArgs {
    pub fn planner_config(&self) -> Result<PlannerConfig, ConfigError> {
        if self.vertex_stride == 0 {
            return Err(ConfigError::ZeroStride);
        }
        if self.connection_threshold_m.is_nan() || self.connection_threshold_m <= 0.0 {
            return Err(ConfigError::NotPositive {
                name: "connection threshold",
                value: self.connection_threshold_m,
            });
        }
        Ok(PlannerConfig {
            sampling: VertexSampling::every(self.vertex_stride),
            connection_threshold_m: self.connection_threshold_m,
            greedy_fallback: !self.no_greedy,
            ..PlannerConfig::default()
        })
    }

    pub fn osrm_config(&self) -> OsrmConfig {
        OsrmConfig {
            base_url: self.osrm_url.clone(),
            profile: DEFAULT_OSRM_PROFILE.to_string(),
            timeout: Duration::from_secs(self.osrm_timeout_secs),
        }
    }

    pub fn router(&self) -> Result<ConfiguredRouter, ConfigError> {
        if self.offline {
            return Ok(ConfiguredRouter::Direct(DirectLineRouter));
        }
        Ok(ConfiguredRouter::Osrm(OsrmRouter::new(self.osrm_config())?))
    }
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Bike route planning service")]
pub struct ServiceArgs {
    /// Address to listen on
    #[arg(long, env = "RADWEGE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// JSON file with the route segments (a `.json.zst` sibling is preferred)
    #[arg(long, env = "RADWEGE_SEGMENTS", default_value = "backend/data/sample_segments.json")]
    pub segments: PathBuf,

    #[command(flatten)]
    pub routing: RoutingArgs,
}

/// Parse `"lat,lng"`.
pub fn parse_coordinate(value: &str) -> Result<Coordinate, ConfigError> {
    let invalid = || ConfigError::Coordinate(value.to_string());
    let (lat, lng) = value.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    let coordinate = Coordinate::new(lat, lng);
    if !is_valid_coordinate(coordinate) {
        return Err(ConfigError::OutOfRange(value.to_string()));
    }
    Ok(coordinate)
}

pub fn is_valid_coordinate(coordinate: Coordinate) -> bool {
    coordinate.lat.is_finite()
        && coordinate.lng.is_finite()
        && (-90.0..=90.0).contains(&coordinate.lat)
        && (-180.0..=180.0).contains(&coordinate.lng)
}
