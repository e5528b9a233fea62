// src/session/types.rs — Walk session data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::geo::{trail_length, Coordinate};
use crate::infra::errors::WalkError;
use crate::route::GeneratedRoute;

/// Durable identifier handed out by the store on first write.
pub type SessionId = i64;

/// Engine lifecycle. `Completed` returns to `Idle` only through reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Generating,
    Preview,
    Active,
    Paused,
    Completed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Generating => "generating",
            Phase::Preview => "preview",
            Phase::Active => "active",
            Phase::Paused => "paused",
            Phase::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status written to the store. A subset of [`Phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "paused" => Ok(SessionStatus::Paused),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

/// A point of interest pinned during an active walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkMoment {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
    pub photo_ref: Option<String>,
    pub description: Option<String>,
}

impl WalkMoment {
    pub fn new(location: Coordinate, description: Option<String>, photo_ref: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            lat: location.lat,
            lng: location.lng,
            timestamp: Utc::now(),
            photo_ref,
            description,
        }
    }

    pub fn location(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// One walk from start to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkSession {
    /// Set once the store has accepted the initial record.
    pub id: Option<SessionId>,
    pub user_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Meters. Live while walking, frozen at completion.
    pub total_distance: f64,
    /// Active seconds. Live while walking, frozen at completion.
    pub total_duration: u64,
    pub route_path: Vec<Coordinate>,
    pub planned_route: Vec<Coordinate>,
    pub moments: Vec<WalkMoment>,
    pub status: SessionStatus,
}

impl WalkSession {
    pub fn new(user_id: String, title: Option<String>, start: Coordinate, planned: &GeneratedRoute) -> Self {
        let start_time = Utc::now();
        Self {
            id: None,
            user_id,
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| default_title(start_time)),
            start_time,
            end_time: None,
            total_distance: 0.0,
            total_duration: 0,
            route_path: vec![start],
            planned_route: planned.coordinates.clone(),
            moments: Vec::new(),
            status: SessionStatus::Active,
        }
    }
}

/// `Walk <date>` in the walker's calendar.
pub fn default_title(at: DateTime<Utc>) -> String {
    format!("Walk {}", at.format("%Y-%m-%d"))
}

/// Derived numbers shown while walking. Never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveStats {
    /// Whole active seconds.
    pub duration: u64,
    /// Meters along the trail.
    pub distance: f64,
    /// Minutes per kilometer, 0 while not moving.
    pub pace: f64,
    /// km/h
    pub speed: f64,
}

impl LiveStats {
    pub fn compute(active: Duration, trail: &[Coordinate]) -> Self {
        let duration = active.as_secs();
        let distance = trail_length(trail);
        let speed = if duration > 0 {
            (distance / 1000.0) / (duration as f64 / 3600.0)
        } else {
            0.0
        };
        let pace = if speed > 0.0 { 60.0 / speed } else { 0.0 };
        Self {
            duration,
            distance,
            pace,
            speed,
        }
    }
}

/// Outcome of the final write of a walk.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub session_id: SessionId,
    pub moments_saved: usize,
    /// Moment insert failure after the walk itself was saved. Not rolled back.
    pub moment_error: Option<WalkError>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SaveState {
    #[default]
    NotSaved,
    Saving,
    Saved(SaveReport),
    Failed(WalkError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_live_stats_zero_duration() {
        let s = LiveStats::compute(Duration::ZERO, &[Coordinate::new(0.0, 0.0)]);
        assert_eq!(s, LiveStats::default());
    }

    #[test]
    fn test_live_stats_speed_and_pace() {
        // ~1000 m north in 12 minutes => 5 km/h, 12 min/km
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1000.0 / 111_194.93, 0.0);
        let s = LiveStats::compute(Duration::from_secs(720), &[a, b]);
        assert_eq!(s.duration, 720);
        assert!((s.distance - 1000.0).abs() < 0.5, "{}", s.distance);
        assert!((s.speed - 5.0).abs() < 0.01);
        assert!((s.pace - 12.0).abs() < 0.05);
    }

    #[test]
    fn test_live_stats_floor_seconds() {
        let s = LiveStats::compute(Duration::from_millis(2999), &[]);
        assert_eq!(s.duration, 2);
    }

    #[test]
    fn test_default_title() {
        let t = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        assert_eq!(default_title(t), "Walk 2026-03-14");
    }

    #[test]
    fn test_new_session_seeds_trail_and_plan() {
        let start = Coordinate::new(48.85, 2.35);
        let planned = GeneratedRoute {
            coordinates: vec![start, Coordinate::new(48.86, 2.35), start],
            waypoints: vec![],
            distance: 2200.0,
            duration: 1600.0,
            instructions: None,
        };
        let s = WalkSession::new("u1".into(), Some("  ".into()), start, &planned);
        assert_eq!(s.route_path, vec![start]);
        assert_eq!(s.planned_route.len(), 3);
        assert!(s.title.starts_with("Walk "));
        assert_eq!(s.status, SessionStatus::Active);
        assert!(s.id.is_none());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("paused".parse::<SessionStatus>().unwrap(), SessionStatus::Paused);
        assert!("idle".parse::<SessionStatus>().is_err());
    }
}
