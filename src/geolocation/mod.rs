// src/geolocation/mod.rs — Position sources feeding the walk engine

pub mod replay;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use crate::geo::Coordinate;
use crate::infra::errors::WalkError;

pub use replay::ReplaySource;

/// One reading from a positioning device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub coordinate: Coordinate,
    /// Horizontal accuracy radius in meters, when the device reports one.
    pub accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn now(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            accuracy_m: None,
            timestamp: Utc::now(),
        }
    }
}

pub type FixStream = Pin<Box<dyn Stream<Item = PositionFix> + Send>>;

/// Why a position could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationFailure {
    PermissionDenied,
    Unavailable,
    Timeout,
}

impl From<LocationFailure> for WalkError {
    fn from(f: LocationFailure) -> Self {
        let message = match f {
            LocationFailure::PermissionDenied => "location permission denied",
            LocationFailure::Unavailable => "position unavailable",
            LocationFailure::Timeout => "timed out waiting for a position fix",
        };
        WalkError::location(message)
    }
}

#[async_trait]
pub trait GeolocationSource: Send + Sync {
    /// One-shot read of the current position.
    async fn current_position(&self) -> Result<PositionFix, WalkError>;

    /// Continuous updates until the stream is dropped.
    fn watch(&self) -> FixStream;

    /// Release device resources held for `watch`. Dropping the stream is enough
    /// for most sources.
    fn unwatch(&self) {}
}

/// `current_position` bounded by `timeout`.
pub async fn locate_within(
    source: &dyn GeolocationSource,
    timeout: Duration,
) -> Result<PositionFix, WalkError> {
    tokio::time::timeout(timeout, source.current_position())
        .await
        .map_err(|_| WalkError::from(LocationFailure::Timeout))?
}
