// Hand pose extraction from a 21-point landmark frame

use crate::{complete_hand, HandPose, LandmarkPoint, Orientation, INDEX_TIP, PALM_CENTER, THUMB_TIP, WRIST};
use nalgebra::Vector3;

/// Derive a [`HandPose`] from one hand's landmarks.
///
/// Returns `None` when no complete hand is present; that is an ordinary
/// outcome, not an error.
///
/// Orientation is a cheap approximation rather than a full rotation-matrix
/// derivation:
/// - pitch and yaw come from the wrist → palm-center vector
/// - roll comes from the thumb-tip → index-tip vector in the image plane
pub fn extract_hand_pose(landmarks: Option<&[LandmarkPoint]>) -> Option<HandPose> {
    let points = complete_hand(landmarks)?;

    let wrist = points[WRIST];
    let palm_center = points[PALM_CENTER];
    let index_tip = points[INDEX_TIP];
    let thumb_tip = points[THUMB_TIP];

    let palm_direction = to_vector(palm_center) - to_vector(wrist);

    Some(HandPose {
        palm_center: palm_center.into(),
        wrist: wrist.into(),
        index_tip: index_tip.into(),
        thumb_tip: thumb_tip.into(),
        orientation: orientation(&palm_direction, index_tip, thumb_tip),
    })
}

fn orientation(palm_direction: &Vector3<f64>, index_tip: LandmarkPoint, thumb_tip: LandmarkPoint) -> Orientation {
    let (dx, dy, dz) = (palm_direction.x, palm_direction.y, palm_direction.z);

    let pitch = dy.atan2(dx.hypot(dz));
    let yaw = dx.atan2(dz);
    let roll = (index_tip.x - thumb_tip.x).atan2(index_tip.y - thumb_tip.y);

    Orientation {
        pitch: round_degrees(pitch),
        roll: round_degrees(roll),
        yaw: round_degrees(yaw),
    }
}

fn to_vector(point: LandmarkPoint) -> Vector3<f64> {
    Vector3::new(point.x, point.y, point.z)
}

/// Radians to degrees, rounded to 2 decimal places
fn round_degrees(radians: f64) -> f64 {
    (radians.to_degrees() * 100.0).round() / 100.0
}
