use crate::{error::Result, motion::Position, session::Observation};

pub mod dnn;

/// COCO class index of "person".
pub const PERSON_CLASS: i32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centroid(&self) -> Position {
        Position::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub class_id: i32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

pub trait Detector<F> {
    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>>;
}

/// Centroid of the most confident person in `detections`.
pub fn locate_person(detections: &[Detection]) -> Option<Position> {
    detections
        .iter()
        .filter(|d| d.class_id == PERSON_CLASS)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map(|d| d.bbox.centroid())
}

/// Turns whatever happened during one loop iteration into an `Observation`.
pub trait MotionSource<F> {
    /// `key` is the key pressed during the previous iteration, if any.
    fn observe(&mut self, frame: &F, key: Option<char>) -> Result<Observation>;
}

pub struct PersonMotion<D> {
    detector: D,
}

impl<D> PersonMotion<D> {
    pub fn new(detector: D) -> Self {
        PersonMotion { detector }
    }
}

impl<F, D: Detector<F>> MotionSource<F> for PersonMotion<D> {
    fn observe(&mut self, frame: &F, _key: Option<char>) -> Result<Observation> {
        let detections = self.detector.detect(frame)?;

        Ok(match locate_person(&detections) {
            Some(position) => {
                trace!("person at {:?}\tdetections {}", position, detections.len());
                Observation::Position(position)
            }
            None => Observation::Nothing,
        })
    }
}

/// Counts presses of a single key as movement.
pub struct KeyboardMotion {
    key: char,
}

impl KeyboardMotion {
    pub fn new(key: char) -> Self {
        KeyboardMotion { key }
    }
}

impl Default for KeyboardMotion {
    fn default() -> Self {
        KeyboardMotion::new('w')
    }
}

impl<F> MotionSource<F> for KeyboardMotion {
    fn observe(&mut self, _frame: &F, key: Option<char>) -> Result<Observation> {
        Ok(match key {
            Some(k) if k.eq_ignore_ascii_case(&self.key) => Observation::Moved,
            _ => Observation::Nothing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn person(confidence: f32, bbox: BoundingBox) -> Detection {
        Detection {
            class_id: PERSON_CLASS,
            confidence,
            bbox,
        }
    }

    struct Scripted(Vec<Detection>);

    impl Detector<()> for Scripted {
        fn detect(&mut self, _frame: &()) -> Result<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl Detector<()> for Broken {
        fn detect(&mut self, _frame: &()) -> Result<Vec<Detection>> {
            Err(Error::Config("model went away".to_string()))
        }
    }

    #[test]
    fn centroid_is_box_center() {
        let bbox = BoundingBox::new(80, 60, 40, 81);

        assert_eq!(bbox.centroid(), Position::new(100, 100));
    }

    #[test]
    fn picks_most_confident_person() {
        let detections = vec![
            person(0.6, BoundingBox::new(0, 0, 10, 10)),
            Detection {
                class_id: 2,
                confidence: 0.99,
                bbox: BoundingBox::new(500, 500, 10, 10),
            },
            person(0.9, BoundingBox::new(100, 100, 20, 20)),
        ];

        assert_eq!(locate_person(&detections), Some(Position::new(110, 110)));
    }

    #[test]
    fn ignores_other_classes() {
        let detections = vec![Detection {
            class_id: 16,
            confidence: 0.8,
            bbox: BoundingBox::new(0, 0, 10, 10),
        }];

        assert_eq!(locate_person(&detections), None);
        assert_eq!(locate_person(&[]), None);
    }

    #[test]
    fn person_motion_reports_positions() {
        let mut motion = PersonMotion::new(Scripted(vec![person(
            0.7,
            BoundingBox::new(0, 0, 100, 200),
        )]));

        assert_eq!(
            motion.observe(&(), None).unwrap(),
            Observation::Position(Position::new(50, 100))
        );

        let mut empty = PersonMotion::new(Scripted(vec![]));
        assert_eq!(empty.observe(&(), Some('w')).unwrap(), Observation::Nothing);
    }

    #[test]
    fn detector_failures_propagate() {
        let mut motion = PersonMotion::new(Broken);

        assert!(motion.observe(&(), None).is_err());
    }

    #[test]
    fn keyboard_motion_counts_its_key() {
        let mut motion = KeyboardMotion::default();

        assert_eq!(motion.observe(&(), Some('w')).unwrap(), Observation::Moved);
        assert_eq!(motion.observe(&(), Some('W')).unwrap(), Observation::Moved);
        assert_eq!(motion.observe(&(), Some('a')).unwrap(), Observation::Nothing);
        assert_eq!(motion.observe(&(), None).unwrap(), Observation::Nothing);
    }
}
