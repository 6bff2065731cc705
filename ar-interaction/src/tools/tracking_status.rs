use constants::tracking::{STATUS_SEARCHING_FOR_SURFACE, STATUS_TAP_TO_PLACE};
use std::fmt;

use crate::engine::tracking::{TrackingFailureReason, TrackingFrame};

/// User-facing tracking prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingStatus {
    Failure(TrackingFailureReason),
    SearchingForSurface,
    TapToPlace,
}

impl TrackingStatus {
    pub fn text(&self) -> &str {
        match self {
            Self::Failure(reason) => reason.description(),
            Self::SearchingForSurface => STATUS_SEARCHING_FOR_SURFACE,
            Self::TapToPlace => STATUS_TAP_TO_PLACE,
        }
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Stateless mapping from the latest frame and anchor count to a prompt.
pub struct TrackingQualityMonitor;

impl TrackingQualityMonitor {
    pub fn status(frame: Option<&dyn TrackingFrame>, anchor_count: usize) -> TrackingStatus {
        if let Some(reason) = frame.and_then(|f| f.tracking_failure_reason()) {
            return TrackingStatus::Failure(reason);
        }
        if anchor_count == 0 {
            TrackingStatus::SearchingForSurface
        } else {
            TrackingStatus::TapToPlace
        }
    }
}
