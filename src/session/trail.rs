// src/session/trail.rs — Breadcrumb trail with GPS jitter suppression

use crate::geo::{distance, trail_length, Coordinate};

/// Fixes closer than this to the last accepted point are treated as noise.
pub const MIN_FIX_DISTANCE_M: f64 = 5.0;

/// Append-only sequence of accepted fixes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trail {
    points: Vec<Coordinate>,
}

impl Trail {
    pub fn seeded(start: Coordinate) -> Self {
        Self { points: vec![start] }
    }

    /// Accept `fix` if it moved more than [`MIN_FIX_DISTANCE_M`]. Returns whether it was kept.
    pub fn push(&mut self, fix: Coordinate) -> bool {
        match self.points.last() {
            Some(&last) if distance(last, fix) <= MIN_FIX_DISTANCE_M => false,
            _ => {
                self.points.push(fix);
                true
            }
        }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn length_m(&self) -> f64 {
        trail_length(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Point `meters` north of `c`.
    fn north(c: Coordinate, meters: f64) -> Coordinate {
        Coordinate::new(c.lat + meters / 111_194.93, c.lng)
    }

    #[test]
    fn test_first_fix_always_accepted() {
        let mut t = Trail::default();
        assert!(t.push(Coordinate::new(1.0, 1.0)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_jitter_suppressed() {
        let start = Coordinate::new(52.52, 13.405);
        let mut t = Trail::seeded(start);
        assert!(!t.push(north(start, 3.0)));
        assert!(!t.push(north(start, 4.9)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_threshold_is_strict() {
        let start = Coordinate::new(52.52, 13.405);
        let mut t = Trail::seeded(start);
        assert!(!t.push(start));
        assert!(t.push(north(start, 5.5)));
    }

    #[test]
    fn test_compares_against_last_accepted_not_last_seen() {
        let start = Coordinate::new(52.52, 13.405);
        let mut t = Trail::seeded(start);
        // Three 4 m steps: the third is 12 m from the anchor.
        assert!(!t.push(north(start, 4.0)));
        assert!(t.push(north(start, 8.0)));
        assert!(!t.push(north(start, 12.0)));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_length_tracks_points() {
        let start = Coordinate::new(0.0, 0.0);
        let mut t = Trail::seeded(start);
        t.push(north(start, 100.0));
        t.push(north(start, 250.0));
        assert!((t.length_m() - 250.0).abs() < 0.1);
    }
}
