// src/route/generator.rs — Closed-loop route suggestions around a start point

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::waypoints::{self, DEFAULT_SPEED_KMH};
use super::{
    Complexity, GeneratedRoute, RouteGenerationOptions, RoutePlanner, RouteRequest, RoutingProvider,
    TravelMode,
};
use crate::infra::config::RoutingConfig;
use crate::infra::errors::WalkError;

/// Builds loop routes by placing jittered waypoints and delegating path-finding
/// to a [`RoutingProvider`].
pub struct RouteGenerator {
    provider: Arc<dyn RoutingProvider>,
    speed_kmh: f64,
    request_timeout: Duration,
    alternatives_delay: Duration,
    rng: Mutex<StdRng>,
}

impl RouteGenerator {
    pub fn new(provider: Arc<dyn RoutingProvider>) -> Self {
        Self {
            provider,
            speed_kmh: DEFAULT_SPEED_KMH,
            request_timeout: Duration::from_secs(15),
            alternatives_delay: Duration::from_millis(100),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_config(provider: Arc<dyn RoutingProvider>, config: &RoutingConfig) -> Self {
        Self {
            speed_kmh: config.walking_speed_kmh,
            request_timeout: config.request_timeout(),
            alternatives_delay: config.alternatives_delay(),
            ..Self::new(provider)
        }
    }

    /// Fix the waypoint jitter so route shapes are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_alternatives_delay(mut self, delay: Duration) -> Self {
        self.alternatives_delay = delay;
        self
    }

    pub fn provider_id(&self) -> &'static str {
        self.provider.id()
    }

    /// Assemble the ordered provider request for one attempt.
    fn build_request(
        &self,
        options: &RouteGenerationOptions,
    ) -> Result<RouteRequest, WalkError> {
        let start = options
            .start_location
            .ok_or_else(|| WalkError::location("no start location for route generation"))?;
        if !start.is_valid() {
            return Err(WalkError::location(format!("invalid start location {start}")));
        }

        let target_km = options.target_distance_km(self.speed_kmh);
        if !target_km.is_finite() || target_km <= 0.0 {
            return Err(WalkError::no_route(format!(
                "requested walk length must be positive (got {target_km} km)"
            )));
        }

        let radius_km = target_km / 2.0;
        let waypoints = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            waypoints::build_waypoints(start, radius_km, options.complexity, &mut *rng)
        };

        Ok(RouteRequest {
            origin: start,
            waypoints,
            destination: start,
            mode: TravelMode::Walking,
            avoid_highways: options.avoid_highways,
            avoid_tolls: options.avoid_tolls,
            optimize_waypoints: true,
        })
    }
}

#[async_trait]
impl RoutePlanner for RouteGenerator {
    async fn generate(
        &self,
        options: &RouteGenerationOptions,
    ) -> Result<GeneratedRoute, WalkError> {
        let request = self.build_request(options)?;

        tracing::debug!(
            provider = self.provider.id(),
            complexity = %options.complexity,
            waypoints = request.waypoints.len(),
            "Requesting loop route"
        );

        let route = tokio::time::timeout(self.request_timeout, self.provider.route(&request))
            .await
            .map_err(|_| {
                WalkError::network(format!(
                    "routing provider '{}' did not answer within {}s",
                    self.provider.id(),
                    self.request_timeout.as_secs()
                ))
            })??;

        if route.coordinates.is_empty() {
            return Err(WalkError::no_route("provider returned an empty path"));
        }

        tracing::info!(
            provider = self.provider.id(),
            distance_m = route.distance_meters as u64,
            duration_s = route.duration_seconds as u64,
            points = route.coordinates.len(),
            "Generated loop route"
        );

        Ok(GeneratedRoute {
            coordinates: route.coordinates,
            waypoints: request.waypoints,
            distance: route.distance_meters,
            duration: route.duration_seconds,
            instructions: (!route.instructions.is_empty()).then_some(route.instructions),
        })
    }

    async fn generate_alternatives(
        &self,
        options: &RouteGenerationOptions,
        count: usize,
    ) -> Vec<Result<GeneratedRoute, WalkError>> {
        let mut routes = Vec::with_capacity(count);

        for i in 0..count {
            let alt = RouteGenerationOptions {
                complexity: Complexity::ALL[i % Complexity::ALL.len()],
                ..options.clone()
            };
            routes.push(self.generate(&alt).await);

            // Space out requests for provider rate limits
            if i + 1 < count {
                tokio::time::sleep(self.alternatives_delay).await;
            }
        }

        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::route::{MockRoutingProvider, ProviderRoute, ProviderStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn start() -> Coordinate {
        Coordinate::new(51.5007, -0.1246)
    }

    fn ok_route() -> ProviderRoute {
        ProviderRoute {
            coordinates: vec![start(), Coordinate::new(51.505, -0.12), start()],
            distance_meters: 2480.0,
            duration_seconds: 1790.0,
            instructions: vec!["Head north".into()],
        }
    }

    #[tokio::test]
    async fn test_generate_submits_closed_loop_request() {
        let mut mock = MockRoutingProvider::new();
        mock.expect_id().returning(|| "mock");
        mock.expect_route()
            .withf(|req: &RouteRequest| {
                req.origin == req.destination
                    && req.waypoints.len() == 4
                    && req.mode == TravelMode::Walking
                    && req.optimize_waypoints
                    && req.avoid_highways
                    && req.avoid_tolls
            })
            .times(1)
            .returning(|_| Ok(ok_route()));

        let generator = RouteGenerator::new(Arc::new(mock)).with_seed(1);
        let route = generator
            .generate(&RouteGenerationOptions::for_duration(30.0).starting_at(start()))
            .await
            .unwrap();

        assert_eq!(route.coordinates.len(), 3);
        assert_eq!(route.waypoints.len(), 4);
        assert!((route.distance - 2480.0).abs() < 1e-9);
        assert_eq!(route.instructions, Some(vec!["Head north".to_string()]));
    }

    #[tokio::test]
    async fn test_generate_without_start_is_location_error() {
        let mut mock = MockRoutingProvider::new();
        mock.expect_id().returning(|| "mock");
        mock.expect_route().never();

        let generator = RouteGenerator::new(Arc::new(mock));
        let err = generator
            .generate(&RouteGenerationOptions::for_duration(30.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "location_unavailable");
    }

    #[tokio::test]
    async fn test_generate_rejects_non_positive_length() {
        let mut mock = MockRoutingProvider::new();
        mock.expect_id().returning(|| "mock");
        mock.expect_route().never();

        let generator = RouteGenerator::new(Arc::new(mock));
        let err = generator
            .generate(&RouteGenerationOptions::for_distance(0.0).starting_at(start()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "no_route_found");
    }

    #[tokio::test]
    async fn test_generate_propagates_mapped_status() {
        let mut mock = MockRoutingProvider::new();
        mock.expect_id().returning(|| "mock");
        mock.expect_route()
            .returning(|_| Err(ProviderStatus::OverQuota.into_error("mock", None)));

        let generator = RouteGenerator::new(Arc::new(mock));
        let err = generator
            .generate(&RouteGenerationOptions::for_duration(20.0).starting_at(start()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "provider_quota_error");
    }

    #[tokio::test]
    async fn test_empty_path_is_no_route() {
        let mut mock = MockRoutingProvider::new();
        mock.expect_id().returning(|| "mock");
        mock.expect_route().returning(|_| Ok(ProviderRoute::default()));

        let generator = RouteGenerator::new(Arc::new(mock));
        let err = generator
            .generate(&RouteGenerationOptions::for_duration(20.0).starting_at(start()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "no_route_found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_alternatives_cycle_complexity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let mut mock = MockRoutingProvider::new();
        mock.expect_id().returning(|| "mock");
        mock.expect_route().times(4).returning(move |req| {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            let expected = [2, 4, 6, 2][n];
            assert_eq!(req.waypoints.len(), expected);
            Ok(ok_route())
        });

        let generator = RouteGenerator::new(Arc::new(mock));
        let routes = generator
            .generate_alternatives(
                &RouteGenerationOptions::for_duration(45.0).starting_at(start()),
                4,
            )
            .await;

        assert_eq!(routes.len(), 4);
        assert!(routes.iter().all(|r| r.is_ok()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alternatives_keep_individual_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let mut mock = MockRoutingProvider::new();
        mock.expect_id().returning(|| "mock");
        mock.expect_route().returning(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) == 1 {
                Err(ProviderStatus::ZeroResults.into_error("mock", None))
            } else {
                Ok(ok_route())
            }
        });

        let generator = RouteGenerator::new(Arc::new(mock));
        let routes = generator
            .generate_alternatives(
                &RouteGenerationOptions::for_duration(30.0).starting_at(start()),
                3,
            )
            .await;

        assert!(routes[0].is_ok());
        assert_eq!(routes[1].as_ref().unwrap_err().kind(), "no_route_found");
        assert!(routes[2].is_ok());
    }
}
