// src/route/waypoints.rs — Loop control points and walking-speed conversions

use rand::Rng;
use std::f64::consts::PI;

use super::Complexity;
use crate::geo::{Coordinate, EARTH_RADIUS_M};

/// Assumed walking speed when the caller does not override it.
pub const DEFAULT_SPEED_KMH: f64 = 5.0;

/// Each waypoint sits at `factor * radius` from the center, factor drawn from this band.
pub const RADIUS_FACTOR_MIN: f64 = 0.3;
pub const RADIUS_FACTOR_MAX: f64 = 0.7;

/// Angular jitter as a fraction of the even spacing between waypoints.
pub const ANGULAR_JITTER_FRACTION: f64 = 0.15;

/// Kilometers covered in `duration_minutes` at `speed_kmh`.
pub fn estimate_distance_km(duration_minutes: f64, speed_kmh: f64) -> f64 {
    (duration_minutes / 60.0) * speed_kmh
}

/// Whole minutes needed to cover `distance_km` at `speed_kmh`.
pub fn estimate_duration_minutes(distance_km: f64, speed_kmh: f64) -> f64 {
    ((distance_km / speed_kmh) * 60.0).round()
}

/// Place `complexity.waypoint_count()` points around `center`.
///
/// Points are evenly spaced by angle, then each gets a random radius factor
/// in `[RADIUS_FACTOR_MIN, RADIUS_FACTOR_MAX)` and a small angular offset so
/// that retries with identical input give visibly different loops.
pub fn build_waypoints<R: Rng>(
    center: Coordinate,
    radius_km: f64,
    complexity: Complexity,
    rng: &mut R,
) -> Vec<Coordinate> {
    let n = complexity.waypoint_count();
    let radius_deg = (radius_km * 1000.0 / EARTH_RADIUS_M).to_degrees();
    let spacing = 2.0 * PI / n as f64;
    let lat_scale = center.lat.to_radians().cos().max(1e-6);

    (0..n)
        .map(|i| {
            let jitter = rng.gen_range(-ANGULAR_JITTER_FRACTION..=ANGULAR_JITTER_FRACTION) * spacing;
            let angle = spacing * i as f64 + jitter;
            let factor = rng.gen_range(RADIUS_FACTOR_MIN..RADIUS_FACTOR_MAX);
            let r = radius_deg * factor;

            let lat = (center.lat + r * angle.cos()).clamp(-90.0, 90.0);
            let lng = wrap_longitude(center.lng + r * angle.sin() / lat_scale);
            Coordinate::new(lat, lng)
        })
        .collect()
}

fn wrap_longitude(lng: f64) -> f64 {
    if lng > 180.0 {
        lng - 360.0
    } else if lng < -180.0 {
        lng + 360.0
    } else {
        lng
    }
}
