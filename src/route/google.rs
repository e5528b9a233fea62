// src/route/google.rs — Google Directions web service adapter

use async_trait::async_trait;

use super::{http_status_error, ProviderRoute, ProviderStatus, RouteRequest, RoutingProvider};
use crate::geo::{polyline, Coordinate};
use crate::infra::errors::WalkError;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

pub struct GoogleDirectionsProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleDirectionsProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Query parameters for the directions endpoint (key excluded).
    fn build_query(request: &RouteRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("origin", request.origin.to_string()),
            ("destination", request.destination.to_string()),
            ("mode", "walking".to_string()),
        ];

        if !request.waypoints.is_empty() {
            let mut parts: Vec<String> = Vec::with_capacity(request.waypoints.len() + 1);
            if request.optimize_waypoints {
                parts.push("optimize:true".into());
            }
            parts.extend(request.waypoints.iter().map(|w| w.to_string()));
            query.push(("waypoints", parts.join("|")));
        }

        let mut avoid = Vec::new();
        if request.avoid_highways {
            avoid.push("highways");
        }
        if request.avoid_tolls {
            avoid.push("tolls");
        }
        if !avoid.is_empty() {
            query.push(("avoid", avoid.join("|")));
        }

        query
    }
}

/// Map the service's `status` field.
fn status_from_code(code: &str) -> ProviderStatus {
    match code {
        "NOT_FOUND" => ProviderStatus::NotFound,
        "ZERO_RESULTS" => ProviderStatus::ZeroResults,
        "MAX_WAYPOINTS_EXCEEDED" | "MAX_ROUTE_LENGTH_EXCEEDED" => ProviderStatus::TooManyWaypoints,
        "INVALID_REQUEST" => ProviderStatus::InvalidRequest,
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => ProviderStatus::OverQuota,
        "REQUEST_DENIED" => ProviderStatus::AccessDenied,
        _ => ProviderStatus::Unknown,
    }
}

/// Flatten the first route of a Directions response.
pub fn parse_directions(resp: &serde_json::Value) -> Result<ProviderRoute, WalkError> {
    let status = resp["status"].as_str().unwrap_or("UNKNOWN_ERROR");
    if status != "OK" {
        return Err(status_from_code(status).into_error("google", resp["error_message"].as_str()));
    }

    let legs = resp["routes"][0]["legs"]
        .as_array()
        .ok_or_else(|| ProviderStatus::ZeroResults.into_error("google", Some("response has no legs")))?;

    let mut route = ProviderRoute::default();

    for leg in legs {
        route.distance_meters += leg["distance"]["value"].as_f64().unwrap_or(0.0);
        route.duration_seconds += leg["duration"]["value"].as_f64().unwrap_or(0.0);

        for step in leg["steps"].as_array().map(Vec::as_slice).unwrap_or_default() {
            if let Some(encoded) = step["polyline"]["points"].as_str() {
                let points = polyline::decode(encoded).ok_or_else(|| {
                    WalkError::network("google returned a malformed polyline")
                })?;
                extend_path(&mut route.coordinates, points);
            }
            if let Some(text) = step["html_instructions"].as_str() {
                route.instructions.push(text.to_string());
            }
        }
    }

    Ok(route)
}

/// Append, dropping a leading point equal to the current tail (step joins).
fn extend_path(path: &mut Vec<Coordinate>, points: Vec<Coordinate>) {
    let mut iter = points.into_iter().peekable();
    if let (Some(last), Some(first)) = (path.last(), iter.peek()) {
        if last == first {
            iter.next();
        }
    }
    path.extend(iter);
}

#[async_trait]
impl RoutingProvider for GoogleDirectionsProvider {
    fn id(&self) -> &'static str {
        "google"
    }

    async fn route(&self, request: &RouteRequest) -> Result<ProviderRoute, WalkError> {
        let url = format!("{}/directions/json", self.base_url);
        let mut query = Self::build_query(request);
        query.push(("key", self.api_key.clone()));

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| WalkError::network(format!("google directions request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_status_error("google", status, &body));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WalkError::network(format!("failed to parse google response: {e}")))?;

        parse_directions(&resp)
    }
}
