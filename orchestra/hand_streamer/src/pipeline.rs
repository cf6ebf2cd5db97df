use eyre::{Result, WrapErr};
use hand_robot_lib::{
    classify_gesture, complete_hand, extract_hand_pose, format_report, map_command, now_millis,
    CommandOutput, FrameStatsTracker, Gesture, LandmarkFrame, ReportFormat, TrackingStats,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::debug;

/// Latest command, written per frame and read by the stream ticker
pub type LatestOutput = Arc<Mutex<Option<CommandOutput>>>;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub output: CommandOutput,
    pub gesture: Gesture,
    pub stats: TrackingStats,
    pub report: Option<String>,
}

/// Landmark frame → pose, gesture and command, one frame at a time
pub struct FramePipeline {
    tracker: FrameStatsTracker,
    report_format: Option<ReportFormat>,
    latest: LatestOutput,
}

impl FramePipeline {
    pub fn new(report_format: Option<ReportFormat>) -> Self {
        Self {
            tracker: FrameStatsTracker::new(),
            report_format,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    pub fn latest(&self) -> LatestOutput {
        self.latest.clone()
    }

    pub fn process_line(&mut self, line: &str, now: Instant) -> Result<FrameResult> {
        let frame: LandmarkFrame =
            serde_json::from_str(line).wrap_err("Malformed landmark frame")?;
        Ok(self.process_frame(&frame, now))
    }

    pub fn process_frame(&mut self, frame: &LandmarkFrame, now: Instant) -> FrameResult {
        let landmarks = complete_hand(frame.primary_hand());
        let pose = extract_hand_pose(landmarks);
        let gesture = classify_gesture(landmarks);
        let output = map_command(pose.as_ref(), &gesture);
        let stats = self.tracker.record_frame(now, frame.hands_detected());

        let report = self.report_format.map(|format| {
            let timestamp = frame.timestamp.unwrap_or_else(now_millis);
            format_report(pose.as_ref(), pose.as_ref().map(|_| &gesture), format, timestamp)
        });

        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(output);

        debug!(
            gesture = %gesture.name,
            confidence = gesture.confidence,
            fps = stats.fps,
            quality = ?stats.quality,
            "Frame processed"
        );

        FrameResult {
            output,
            gesture,
            stats,
            report,
        }
    }
}
