// Pose + gesture → bounded actuator angles

use crate::{
    ActuatorCommand, CommandOutput, Gesture, GestureName, HandPose, HandReport, Point3,
    BASE_ROTATION_RANGE, GRABBER_CLOSED, GRABBER_OPEN, JOINT_HORIZONTAL_RANGE,
    VERTICAL_MOVEMENT_RANGE,
};

/// Map a frame's pose and gesture to an actuator command.
///
/// A missing pose yields the explicit [`CommandOutput::HandNotDetected`]
/// sentinel. The transform is a clamped affine map, not a calibrated
/// kinematic model; every field is clamped after rounding.
pub fn map_command(pose: Option<&HandPose>, gesture: &Gesture) -> CommandOutput {
    match pose {
        Some(pose) => CommandOutput::Command(map_palm(&pose.palm_center, gesture.name)),
        None => CommandOutput::HandNotDetected,
    }
}

/// Map a palm position directly. Shared by the local pipeline and the relay,
/// which only receives palm center and gesture name.
pub fn map_palm(palm_center: &Point3, gesture: GestureName) -> ActuatorCommand {
    let base_rotation = BASE_ROTATION_RANGE.clamp_angle(palm_center.x * 180.0);

    // Image y grows downward, so it is inverted
    let vertical_movement = VERTICAL_MOVEMENT_RANGE.clamp_angle((1.0 - palm_center.y) * 180.0);

    // Depth is a small signed value, normalized before spreading over [30, 150]
    let depth = (palm_center.z + 0.5) * 0.5;
    let joint_horizontal = JOINT_HORIZONTAL_RANGE.clamp_angle(30.0 + depth * 120.0);

    let grabber = if gesture == GestureName::Grab {
        GRABBER_CLOSED
    } else {
        GRABBER_OPEN
    };

    ActuatorCommand::new(base_rotation, vertical_movement, joint_horizontal, grabber)
}

/// Map a hand report relayed by a client. A report without a gesture
/// counts as an open hand.
pub fn map_hand_report(report: &HandReport) -> ActuatorCommand {
    map_palm(
        &report.palm_center,
        report.gesture.unwrap_or(GestureName::Release),
    )
}
