use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureName {
    Grab,
    Release,
    Neutral,
    #[serde(rename = "None Detected", alias = "NoneDetected")]
    NoneDetected,
}

impl GestureName {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureName::Grab => "Grab",
            GestureName::Release => "Release",
            GestureName::Neutral => "Neutral",
            GestureName::NoneDetected => "None Detected",
        }
    }
}

impl fmt::Display for GestureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete hand shape classification for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gesture {
    pub name: GestureName,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
}

impl Gesture {
    pub fn new(name: GestureName, confidence: f64) -> Self {
        Self {
            name,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Result for a frame without a hand
    pub fn none_detected() -> Self {
        Self {
            name: GestureName::NoneDetected,
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_name_wire_format() {
        let json = serde_json::to_string(&GestureName::NoneDetected).unwrap();
        assert_eq!(json, "\"None Detected\"");

        let name: GestureName = serde_json::from_str("\"NoneDetected\"").unwrap();
        assert_eq!(name, GestureName::NoneDetected);

        let name: GestureName = serde_json::from_str("\"Grab\"").unwrap();
        assert_eq!(name, GestureName::Grab);
    }

    #[test]
    fn test_confidence_is_bounded() {
        assert_eq!(Gesture::new(GestureName::Grab, 1.7).confidence, 1.0);
        assert_eq!(Gesture::new(GestureName::Release, -0.2).confidence, 0.0);
    }
}
