// src/route/mapbox.rs — Mapbox Directions API adapter (walking profile)

use async_trait::async_trait;

use super::{http_status_error, ProviderRoute, ProviderStatus, RouteRequest, RoutingProvider};
use crate::geo::Coordinate;
use crate::infra::errors::WalkError;

const DEFAULT_BASE_URL: &str = "https://api.mapbox.com";

/// Public tokens are the only kind accepted by the directions endpoint from clients.
const PUBLIC_TOKEN_PREFIX: &str = "pk.";

pub struct MapboxDirectionsProvider {
    access_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl MapboxDirectionsProvider {
    pub fn new(access_token: String) -> Result<Self, WalkError> {
        if !access_token.starts_with(PUBLIC_TOKEN_PREFIX) {
            return Err(WalkError::ProviderAuth {
                provider: "mapbox".into(),
                message: format!("access token must start with '{PUBLIC_TOKEN_PREFIX}'"),
            });
        }
        Ok(Self {
            access_token,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `lng,lat;lng,lat;...` in visiting order.
    fn coordinate_path(request: &RouteRequest) -> String {
        std::iter::once(&request.origin)
            .chain(request.waypoints.iter())
            .chain(std::iter::once(&request.destination))
            .map(|c| format!("{:.6},{:.6}", c.lng, c.lat))
            .collect::<Vec<_>>()
            .join(";")
    }
}

fn status_from_code(code: &str) -> ProviderStatus {
    match code {
        "NoRoute" | "NoSegment" => ProviderStatus::ZeroResults,
        "InvalidInput" => ProviderStatus::InvalidRequest,
        "TooManyCoordinates" => ProviderStatus::TooManyWaypoints,
        "NotAuthorized" | "InvalidToken" => ProviderStatus::AccessDenied,
        "ProfileNotFound" => ProviderStatus::NotFound,
        _ => ProviderStatus::Unknown,
    }
}

/// Parse a directions body. `http_ok` is false for 4xx answers that still
/// carry a JSON `code`.
pub fn parse_directions(http_ok: bool, resp: &serde_json::Value) -> Result<ProviderRoute, WalkError> {
    let code = resp["code"].as_str();
    if code != Some("Ok") {
        let status = match code {
            Some(c) => status_from_code(c),
            None if http_ok => ProviderStatus::Unknown,
            None => ProviderStatus::InvalidRequest,
        };
        return Err(status.into_error("mapbox", resp["message"].as_str()));
    }

    let route = &resp["routes"][0];
    let points = route["geometry"]["coordinates"]
        .as_array()
        .ok_or_else(|| ProviderStatus::ZeroResults.into_error("mapbox", Some("response has no geometry")))?;

    let coordinates = points
        .iter()
        .filter_map(|p| {
            let lng = p[0].as_f64()?;
            let lat = p[1].as_f64()?;
            Some(Coordinate::new(lat, lng))
        })
        .collect();

    let instructions = route["legs"]
        .as_array()
        .into_iter()
        .flatten()
        .flat_map(|leg| leg["steps"].as_array().into_iter().flatten())
        .filter_map(|step| step["maneuver"]["instruction"].as_str().map(String::from))
        .collect();

    Ok(ProviderRoute {
        coordinates,
        distance_meters: route["distance"].as_f64().unwrap_or(0.0),
        duration_seconds: route["duration"].as_f64().unwrap_or(0.0),
        instructions,
    })
}

#[async_trait]
impl RoutingProvider for MapboxDirectionsProvider {
    fn id(&self) -> &'static str {
        "mapbox"
    }

    async fn route(&self, request: &RouteRequest) -> Result<ProviderRoute, WalkError> {
        if request.avoid_highways || request.avoid_tolls || request.optimize_waypoints {
            tracing::debug!("mapbox walking profile ignores avoid/optimize flags");
        }

        let url = format!(
            "{}/directions/v5/mapbox/walking/{}",
            self.base_url,
            Self::coordinate_path(request)
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("geometries", "geojson"),
                ("steps", "true"),
                ("overview", "full"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WalkError::network(format!("mapbox directions request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(resp) if resp.get("code").is_some() => parse_directions(status.is_success(), &resp),
            _ if !status.is_success() => Err(http_status_error("mapbox", status, &body)),
            _ => Err(WalkError::network("failed to parse mapbox response")),
        }
    }
}
