/// Centroid of a detected subject, in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;

        dx.hypot(dy)
    }
}

/// Remembers the last seen position and decides whether a new one counts as
/// movement. The first observation after a `clear` only sets the anchor.
#[derive(Clone, Debug)]
pub struct MotionTracker {
    last: Option<Position>,
    threshold: f64,
}

impl MotionTracker {
    pub fn new(threshold: f64) -> Self {
        MotionTracker {
            last: None,
            threshold,
        }
    }

    pub fn observe(&mut self, position: Position) -> bool {
        let moved = match self.last {
            Some(last) => last.distance(&position) > self.threshold,
            None => false,
        };

        self.last = Some(position);

        moved
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    pub fn last(&self) -> Option<Position> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(100, 100);
        let b = Position::new(130, 140);

        assert_eq!(a.distance(&b), 50.0);
        assert_eq!(b.distance(&a), 50.0);
    }

    #[test]
    fn first_observation_never_moves() {
        let mut tracker = MotionTracker::new(30.0);

        assert!(!tracker.observe(Position::new(0, 0)));
        assert_eq!(tracker.last(), Some(Position::new(0, 0)));
    }

    #[test]
    fn displacement_must_exceed_threshold() {
        let mut tracker = MotionTracker::new(30.0);
        tracker.observe(Position::new(100, 100));

        assert!(!tracker.observe(Position::new(130, 100)));
        assert!(tracker.observe(Position::new(161, 100)));
    }

    #[test]
    fn compares_consecutive_observations() {
        let mut tracker = MotionTracker::new(30.0);
        tracker.observe(Position::new(0, 0));

        // small steps never add up to movement
        for x in (20..=200).step_by(20) {
            assert!(!tracker.observe(Position::new(x, 0)));
        }
    }

    #[test]
    fn clear_drops_the_anchor() {
        let mut tracker = MotionTracker::new(30.0);
        tracker.observe(Position::new(0, 0));
        tracker.clear();

        assert_eq!(tracker.last(), None);
        assert!(!tracker.observe(Position::new(500, 500)));
    }
}
