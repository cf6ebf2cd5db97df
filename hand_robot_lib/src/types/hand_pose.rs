use crate::LandmarkPoint;
use serde::{Deserialize, Serialize};

/// Coordinate triple copied out of a landmark frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<LandmarkPoint> for Point3 {
    fn from(point: LandmarkPoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z: point.z,
        }
    }
}

/// Hand orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

/// Positional/orientation summary of one hand.
/// Every field comes from the same landmark frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandPose {
    pub palm_center: Point3,
    pub wrist: Point3,
    pub index_tip: Point3,
    pub thumb_tip: Point3,
    pub orientation: Orientation,
}
