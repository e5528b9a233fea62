// src/route/mod.rs — Loop route generation and routing provider layer

pub mod generator;
pub mod google;
pub mod mapbox;
pub mod resolver;
pub mod retry;
pub mod waypoints;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::infra::errors::WalkError;

pub use generator::RouteGenerator;

/// Path-finding backend that turns an ordered set of points into a walkable path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    fn id(&self) -> &'static str;

    async fn route(&self, request: &RouteRequest) -> Result<ProviderRoute, WalkError>;
}

/// Produces candidate loop routes. One implementation per routing backend
/// family; the engine only sees this capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoutePlanner: Send + Sync {
    async fn generate(&self, options: &RouteGenerationOptions)
        -> Result<GeneratedRoute, WalkError>;

    /// `count` independent suggestions, cycling through complexity levels.
    async fn generate_alternatives(
        &self,
        options: &RouteGenerationOptions,
        count: usize,
    ) -> Vec<Result<GeneratedRoute, WalkError>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

impl Complexity {
    pub const ALL: [Complexity; 3] = [Complexity::Simple, Complexity::Medium, Complexity::Complex];

    /// Number of control points placed around the loop.
    pub fn waypoint_count(self) -> usize {
        match self {
            Complexity::Simple => 2,
            Complexity::Medium => 4,
            Complexity::Complex => 6,
        }
    }

    /// The next level, wrapping from complex back to simple.
    pub fn next(self) -> Self {
        match self {
            Complexity::Simple => Complexity::Medium,
            Complexity::Medium => Complexity::Complex,
            Complexity::Complex => Complexity::Simple,
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(Complexity::Simple),
            "medium" => Ok(Complexity::Medium),
            "complex" => Ok(Complexity::Complex),
            other => Err(format!("unknown complexity '{other}' (simple|medium|complex)")),
        }
    }
}

/// Default walk length when neither duration nor distance is given.
pub const DEFAULT_DURATION_MINUTES: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteGenerationOptions {
    /// Loop start and end. The engine fills this from the current fix when absent.
    pub start_location: Option<Coordinate>,
    pub duration_minutes: Option<f64>,
    /// Takes precedence over `duration_minutes` when both are set.
    pub preferred_distance_km: Option<f64>,
    pub complexity: Complexity,
    pub avoid_highways: bool,
    pub avoid_tolls: bool,
}

impl Default for RouteGenerationOptions {
    fn default() -> Self {
        Self {
            start_location: None,
            duration_minutes: None,
            preferred_distance_km: None,
            complexity: Complexity::default(),
            avoid_highways: true,
            avoid_tolls: true,
        }
    }
}

impl RouteGenerationOptions {
    pub fn for_duration(minutes: f64) -> Self {
        Self {
            duration_minutes: Some(minutes),
            ..Default::default()
        }
    }

    pub fn for_distance(km: f64) -> Self {
        Self {
            preferred_distance_km: Some(km),
            ..Default::default()
        }
    }

    pub fn starting_at(mut self, start: Coordinate) -> Self {
        self.start_location = Some(start);
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    /// Target loop length in kilometers at the given walking speed.
    pub fn target_distance_km(&self, speed_kmh: f64) -> f64 {
        match self.preferred_distance_km {
            Some(km) => km,
            None => waypoints::estimate_distance_km(
                self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
                speed_kmh,
            ),
        }
    }
}

/// A suggested loop as shown to the walker before starting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRoute {
    /// Dense path from the provider.
    pub coordinates: Vec<Coordinate>,
    /// Sparse control points used to shape the request.
    pub waypoints: Vec<Coordinate>,
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    pub instructions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Walking,
}

/// Ordered request submitted to a routing provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub waypoints: Vec<Coordinate>,
    pub destination: Coordinate,
    pub mode: TravelMode,
    pub avoid_highways: bool,
    pub avoid_tolls: bool,
    pub optimize_waypoints: bool,
}

/// Provider answer before it is combined with request-side data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderRoute {
    pub coordinates: Vec<Coordinate>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub instructions: Vec<String>,
}

/// Provider-agnostic failure codes every adapter maps its responses onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    NotFound,
    ZeroResults,
    TooManyWaypoints,
    InvalidRequest,
    OverQuota,
    AccessDenied,
    Unknown,
}

impl ProviderStatus {
    pub fn describe(self) -> &'static str {
        match self {
            ProviderStatus::NotFound => "Location not found",
            ProviderStatus::ZeroResults => "No route found between the specified points",
            ProviderStatus::TooManyWaypoints => "Too many waypoints specified",
            ProviderStatus::InvalidRequest => "Invalid route request",
            ProviderStatus::OverQuota => "API quota exceeded",
            ProviderStatus::AccessDenied => "Directions API access denied",
            ProviderStatus::Unknown => "Unknown error occurred",
        }
    }

    /// Collapse into the engine-facing error taxonomy.
    pub fn into_error(self, provider: &str, detail: Option<&str>) -> WalkError {
        let message = match detail {
            Some(d) if !d.is_empty() => format!("{} ({})", self.describe(), d),
            _ => self.describe().to_string(),
        };
        match self {
            ProviderStatus::NotFound
            | ProviderStatus::ZeroResults
            | ProviderStatus::TooManyWaypoints
            | ProviderStatus::InvalidRequest => WalkError::NoRouteFound { message },
            ProviderStatus::OverQuota => WalkError::ProviderQuota {
                provider: provider.to_string(),
                message,
            },
            ProviderStatus::AccessDenied => WalkError::ProviderAuth {
                provider: provider.to_string(),
                message,
            },
            ProviderStatus::Unknown => WalkError::Network { message },
        }
    }
}

/// Map a non-success HTTP status to an error when the body carries no usable code.
pub(crate) fn http_status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> WalkError {
    let detail = format!("HTTP {}: {}", status, crate::util::truncate_str(body, 200));
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ProviderStatus::OverQuota.into_error(provider, Some(&detail))
    } else if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        ProviderStatus::AccessDenied.into_error(provider, Some(&detail))
    } else if status.is_server_error() {
        WalkError::network(detail)
    } else {
        ProviderStatus::InvalidRequest.into_error(provider, Some(&detail))
    }
}
