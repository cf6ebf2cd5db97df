use serde::{Deserialize, Serialize};

/// Number of points in the hand topology emitted by the landmark detector
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Fixed landmark indices used by the pose and gesture pipeline
pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
/// Middle finger MCP joint, used as the palm center proxy
pub const PALM_CENTER: usize = 9;

/// One normalized 3D point on a tracked hand.
/// x/y are roughly in [0, 1] with the origin at the top-left of the image,
/// z is a small signed depth relative to the wrist.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One detection cycle from the external landmark detector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Zero or more detected hands, 21 points each
    #[serde(default, alias = "multiHandLandmarks")]
    pub hands: Vec<Vec<LandmarkPoint>>,

    /// Detector timestamp in milliseconds, when provided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl LandmarkFrame {
    /// Landmarks of the primary hand. Only the first detected hand drives the arm.
    pub fn primary_hand(&self) -> Option<&[LandmarkPoint]> {
        self.hands.first().map(|hand| hand.as_slice())
    }

    pub fn hands_detected(&self) -> usize {
        self.hands.iter().filter(|hand| !hand.is_empty()).count()
    }
}

/// Returns the landmarks only if the full topology is present.
/// Truncated sequences are treated the same as "no hand".
pub fn complete_hand(landmarks: Option<&[LandmarkPoint]>) -> Option<&[LandmarkPoint]> {
    landmarks.filter(|points| points.len() >= HAND_LANDMARK_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_accepts_detector_field_name() {
        let json = r#"{"multiHandLandmarks": [[{"x": 0.1, "y": 0.2, "z": -0.01}]]}"#;
        let frame: LandmarkFrame = serde_json::from_str(json).unwrap();

        assert_eq!(frame.hands_detected(), 1);
        assert_eq!(frame.primary_hand().unwrap()[0], LandmarkPoint::new(0.1, 0.2, -0.01));
        assert!(frame.timestamp.is_none());
    }

    #[test]
    fn test_empty_frame_has_no_primary_hand() {
        let frame: LandmarkFrame = serde_json::from_str("{}").unwrap();
        assert!(frame.primary_hand().is_none());
        assert_eq!(frame.hands_detected(), 0);
    }

    #[test]
    fn test_truncated_hand_is_incomplete() {
        let points = vec![LandmarkPoint::default(); 9];
        assert!(complete_hand(Some(points.as_slice())).is_none());

        let points = vec![LandmarkPoint::default(); HAND_LANDMARK_COUNT];
        assert!(complete_hand(Some(points.as_slice())).is_some());
        assert!(complete_hand(None).is_none());
    }
}
