// Operator-facing export of the current frame

use crate::{map_palm, Gesture, HandPose, HAND_NOT_DETECTED};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(format!("Unknown report format: {}", other)),
        }
    }
}

/// Render the frame's servo angles for export.
///
/// JSON is pretty-printed with the same four fields the board expects.
/// CSV is one `key,value` pair per line and also carries the raw palm
/// position and the gesture.
pub fn format_report(
    pose: Option<&HandPose>,
    gesture: Option<&Gesture>,
    format: ReportFormat,
    timestamp_ms: u64,
) -> String {
    let (Some(pose), Some(gesture)) = (pose, gesture) else {
        return match format {
            ReportFormat::Json => serde_json::to_string_pretty(&serde_json::json!({ "error": HAND_NOT_DETECTED }))
                .unwrap_or_default(),
            ReportFormat::Csv => format!("error,{}", HAND_NOT_DETECTED),
        };
    };

    let command = map_palm(&pose.palm_center, gesture.name);

    match format {
        ReportFormat::Json => serde_json::to_string_pretty(&command).unwrap_or_default(),
        ReportFormat::Csv => {
            let palm = pose.palm_center;
            [
                format!("timestamp,{}", timestamp_ms),
                format!("base_rotation,{}", command.base_rotation()),
                format!("vertical_movement,{}", command.vertical_movement()),
                format!("joint_horizontal,{}", command.joint_horizontal()),
                format!("grabber,{}", command.grabber()),
                format!("raw_hand_pos,{},{},{}", palm.x, palm.y, palm.z),
                format!("gesture,{},{}", gesture.name, gesture.confidence),
            ]
            .join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GestureName, Orientation, Point3};

    fn pose() -> HandPose {
        HandPose {
            palm_center: Point3::new(0.5, 0.25, 0.1),
            wrist: Point3::new(0.5, 0.6, 0.0),
            index_tip: Point3::new(0.52, 0.1, -0.05),
            thumb_tip: Point3::new(0.51, 0.12, -0.04),
            orientation: Orientation::default(),
        }
    }

    #[test]
    fn test_json_report() {
        let gesture = Gesture::new(GestureName::Grab, 0.9);
        let report = format_report(Some(&pose()), Some(&gesture), ReportFormat::Json, 0);
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "base_rotation": 90,
                "vertical_movement": 135,
                "joint_horizontal": 66,
                "grabber": 180
            })
        );
        assert!(report.contains('\n'));
    }

    #[test]
    fn test_csv_report() {
        let gesture = Gesture::new(GestureName::Release, 0.9);
        let report = format_report(Some(&pose()), Some(&gesture), ReportFormat::Csv, 1700000000000);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(
            lines,
            vec![
                "timestamp,1700000000000",
                "base_rotation,90",
                "vertical_movement,135",
                "joint_horizontal,66",
                "grabber,0",
                "raw_hand_pos,0.5,0.25,0.1",
                "gesture,Release,0.9",
            ]
        );
    }

    #[test]
    fn test_missing_hand_report() {
        assert_eq!(format_report(None, None, ReportFormat::Csv, 0), "error,No hand detected");

        let json = format_report(Some(&pose()), None, ReportFormat::Json, 0);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({ "error": "No hand detected" }));
    }

    #[test]
    fn test_parse_report_format() {
        assert_eq!("CSV".parse::<ReportFormat>().unwrap(), ReportFormat::Csv);
        assert_eq!(" json ".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
