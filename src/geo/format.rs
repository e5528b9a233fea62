// src/geo/format.rs — Human-readable stats

/// `MM:SS`; minutes keep growing past 59.
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Whole meters under a kilometer, otherwise kilometers with two decimals.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round() as i64)
    } else {
        format!("{:.2}km", meters / 1000.0)
    }
}

pub fn format_speed(kmh: f64) -> String {
    format!("{:.1} km/h", kmh)
}

/// Minutes-per-kilometer as `M:SS /km`, or `--:-- /km` when not moving.
pub fn format_pace(min_per_km: f64) -> String {
    if !min_per_km.is_finite() || min_per_km <= 0.0 {
        return "--:-- /km".into();
    }
    let total = (min_per_km * 60.0).round() as u64;
    format!("{}:{:02} /km", total / 60, total % 60)
}
