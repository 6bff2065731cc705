/// Hits reported with a confidence below this are treated as noise.
pub const MIN_HIT_CONFIDENCE: f32 = 0.5;

pub const STATUS_SEARCHING_FOR_SURFACE: &str = "searching for surface";
pub const STATUS_TAP_TO_PLACE: &str = "tap to place";

pub struct FailureMessage {
    pub code: &'static str,
    pub text: &'static str,
}

pub const FAILURE_MESSAGES: &[FailureMessage] = &[
    FailureMessage {
        code: "bad_state",
        text: "Tracking lost due to bad internal state. Please try restarting the AR experience.",
    },
    FailureMessage {
        code: "insufficient_light",
        text: "Too dark. Try moving to a well-lit area.",
    },
    FailureMessage {
        code: "excessive_motion",
        text: "Moving too fast. Slow down.",
    },
    FailureMessage {
        code: "insufficient_features",
        text: "Can't find anything. Aim device at a surface with more texture or color.",
    },
    FailureMessage {
        code: "camera_unavailable",
        text: "Another app is using the camera. Tap on this app or try closing the other one.",
    },
];

pub fn get_failure_text(code: &str) -> &'static str {
    FAILURE_MESSAGES
        .iter()
        .find(|m| m.code == code)
        .map_or("Tracking lost.", |m| m.text)
}
