use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Detection time above which tracking is reported as Fair
const FAIR_DETECTION_MS: u64 = 20;
/// Detection time above which tracking is reported as Poor
const POOR_DETECTION_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingQuality {
    Good,
    Fair,
    Poor,
}

/// Snapshot of landmark pipeline health
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStats {
    /// Frames processed during the last complete second
    pub fps: u32,
    /// Milliseconds between the last two frames
    pub detection_time: u64,
    pub quality: TrackingQuality,
    pub hands_detected: usize,
}

impl Default for TrackingStats {
    fn default() -> Self {
        Self {
            fps: 0,
            detection_time: 0,
            quality: TrackingQuality::Good,
            hands_detected: 0,
        }
    }
}

/// Ephemeral per-process counters, updated once per landmark frame
#[derive(Debug)]
pub struct FrameStatsTracker {
    stats: TrackingStats,
    last_frame: Option<Instant>,
    window_start: Option<Instant>,
    frames_in_window: u32,
}

impl FrameStatsTracker {
    pub fn new() -> Self {
        Self {
            stats: TrackingStats::default(),
            last_frame: None,
            window_start: None,
            frames_in_window: 0,
        }
    }

    pub fn record_frame(&mut self, now: Instant, hands_detected: usize) -> TrackingStats {
        let detection_time = self
            .last_frame
            .map(|last| now.saturating_duration_since(last).as_millis() as u64)
            .unwrap_or(0);
        self.last_frame = Some(now);

        let window_start = *self.window_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(window_start);
        if elapsed >= Duration::from_secs(1) {
            self.stats.fps = self.frames_in_window;
            self.frames_in_window = 0;
            self.window_start = Some(now);
        }
        self.frames_in_window += 1;

        self.stats.detection_time = detection_time;
        self.stats.hands_detected = hands_detected;
        self.stats.quality = if detection_time > POOR_DETECTION_MS {
            TrackingQuality::Poor
        } else if hands_detected > 0 && detection_time > FAIR_DETECTION_MS {
            TrackingQuality::Fair
        } else {
            TrackingQuality::Good
        };

        self.stats
    }
}

impl Default for FrameStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
