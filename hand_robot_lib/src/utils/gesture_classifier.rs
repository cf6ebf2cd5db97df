// Thumb/index pinch classifier

use crate::{complete_hand, Gesture, GestureName, LandmarkPoint, INDEX_TIP, THUMB_TIP};

/// Pinch distance below which the hand is closed (normalized image units)
pub const GRAB_THRESHOLD: f64 = 0.10;
/// Pinch distance above which the hand is open
pub const RELEASE_THRESHOLD: f64 = 0.15;

pub const DECISIVE_CONFIDENCE: f64 = 0.9;
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Classify one frame from the planar thumb-tip/index-tip distance.
///
/// Stateless: distances inside the dead zone between the two thresholds are
/// Neutral on every frame, there is no hysteresis on prior results.
pub fn classify_gesture(landmarks: Option<&[LandmarkPoint]>) -> Gesture {
    let Some(points) = complete_hand(landmarks) else {
        return Gesture::none_detected();
    };

    let distance = pinch_distance(&points[THUMB_TIP], &points[INDEX_TIP]);

    if distance < GRAB_THRESHOLD {
        Gesture::new(GestureName::Grab, DECISIVE_CONFIDENCE)
    } else if distance > RELEASE_THRESHOLD {
        Gesture::new(GestureName::Release, DECISIVE_CONFIDENCE)
    } else {
        Gesture::new(GestureName::Neutral, NEUTRAL_CONFIDENCE)
    }
}

/// Euclidean distance in the image plane (z ignored)
pub fn pinch_distance(thumb_tip: &LandmarkPoint, index_tip: &LandmarkPoint) -> f64 {
    (thumb_tip.x - index_tip.x).hypot(thumb_tip.y - index_tip.y)
}
