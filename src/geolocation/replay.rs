// src/geolocation/replay.rs — Replays a recorded track as live fixes

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::{FixStream, GeolocationSource, LocationFailure, PositionFix};
use crate::geo::Coordinate;
use crate::infra::errors::WalkError;

/// Track file entry: `{"lat": .., "lng": .., "accuracy": ..}`.
#[derive(Debug, Deserialize)]
struct TrackPoint {
    lat: f64,
    lng: f64,
    #[serde(default)]
    accuracy: Option<f64>,
}

/// Emits a fixed list of positions, one per `interval`.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    fixes: Vec<Coordinate>,
    accuracy: Vec<Option<f64>>,
    interval: Duration,
}

impl ReplaySource {
    pub fn new(points: Vec<Coordinate>, interval: Duration) -> Self {
        let accuracy = vec![None; points.len()];
        Self {
            fixes: points,
            accuracy,
            interval,
        }
    }

    /// Load a JSON array of `{lat, lng[, accuracy]}` objects.
    pub fn from_json_file(path: &Path, interval: Duration) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content, interval)
    }

    pub fn from_json_str(content: &str, interval: Duration) -> anyhow::Result<Self> {
        let points: Vec<TrackPoint> = serde_json::from_str(content)?;
        if let Some(bad) = points
            .iter()
            .map(|p| Coordinate::new(p.lat, p.lng))
            .find(|c| !c.is_valid())
        {
            anyhow::bail!("track contains an invalid coordinate: {bad}");
        }
        Ok(Self {
            fixes: points.iter().map(|p| Coordinate::new(p.lat, p.lng)).collect(),
            accuracy: points.iter().map(|p| p.accuracy).collect(),
            interval,
        })
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.fixes
    }

    /// First point of the track.
    pub fn start(&self) -> Option<Coordinate> {
        self.fixes.first().copied()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn fix_at(&self, i: usize) -> PositionFix {
        PositionFix {
            coordinate: self.fixes[i],
            accuracy_m: self.accuracy.get(i).copied().flatten(),
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
impl GeolocationSource for ReplaySource {
    async fn current_position(&self) -> Result<PositionFix, WalkError> {
        if self.fixes.is_empty() {
            return Err(LocationFailure::Unavailable.into());
        }
        Ok(self.fix_at(0))
    }

    fn watch(&self) -> FixStream {
        let source = self.clone();
        let stream = async_stream::stream! {
            for i in 0..source.fixes.len() {
                tokio::time::sleep(source.interval).await;
                yield source.fix_at(i);
            }
        };
        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_parse_track() {
        let src = ReplaySource::from_json_str(
            r#"[{"lat": 1.0, "lng": 2.0, "accuracy": 4.5}, {"lat": 1.001, "lng": 2.0}]"#,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(src.len(), 2);
        assert_eq!(src.start(), Some(Coordinate::new(1.0, 2.0)));
        assert_eq!(src.fix_at(0).accuracy_m, Some(4.5));
        assert_eq!(src.fix_at(1).accuracy_m, None);
    }

    #[test]
    fn test_rejects_out_of_range_points() {
        let err = ReplaySource::from_json_str(r#"[{"lat": 91.0, "lng": 0.0}]"#, Duration::ZERO);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_empty_track_has_no_position() {
        let src = ReplaySource::new(vec![], Duration::ZERO);
        let err = src.current_position().await.unwrap_err();
        assert_eq!(err.kind(), "location_unavailable");
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_yields_every_point_in_order() {
        let pts = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.001),
            Coordinate::new(0.0, 0.002),
        ];
        let src = ReplaySource::new(pts.clone(), Duration::from_secs(1));
        let got: Vec<Coordinate> = src.watch().map(|f| f.coordinate).collect().await;
        assert_eq!(got, pts);
    }
}
