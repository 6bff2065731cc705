use bevy::prelude::*;
use constants::tracking::{MIN_HIT_CONFIDENCE, get_failure_text};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ANCHOR_ID: AtomicU64 = AtomicU64::new(1);

/// Session-unique identity of a spatial anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(u64);

impl AnchorId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

/// A fixed real-world pose created from a surface hit.
///
/// Not `Clone`: an anchor is owned by exactly one registry entry
/// and is destroyed together with it.
#[derive(Debug)]
pub struct SpatialAnchor {
    id: AnchorId,
    pose: Transform,
}

impl SpatialAnchor {
    pub fn new(pose: Transform) -> Self {
        Self {
            id: AnchorId(NEXT_ANCHOR_ID.fetch_add(1, Ordering::Relaxed)),
            pose,
        }
    }

    pub fn id(&self) -> AnchorId {
        self.id
    }

    pub fn pose(&self) -> &Transform {
        &self.pose
    }

    pub fn translation(&self) -> Vec3 {
        self.pose.translation
    }

    /// Straight-line distance between anchor positions. Orientation is ignored.
    pub fn distance_to(&self, other: &SpatialAnchor) -> f32 {
        self.pose.translation.distance(other.pose.translation)
    }
}

/// Reason reported by the tracking provider when it cannot track reliably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingFailureReason {
    BadState,
    InsufficientLight,
    ExcessiveMotion,
    InsufficientFeatures,
    CameraUnavailable,
    /// Provider-specific reason with an already localised description.
    Other(String),
}

impl TrackingFailureReason {
    pub fn code(&self) -> &str {
        match self {
            Self::BadState => "bad_state",
            Self::InsufficientLight => "insufficient_light",
            Self::ExcessiveMotion => "excessive_motion",
            Self::InsufficientFeatures => "insufficient_features",
            Self::CameraUnavailable => "camera_unavailable",
            Self::Other(_) => "other",
        }
    }

    /// User-facing description. Passed through untouched for `Other`.
    pub fn description(&self) -> &str {
        match self {
            Self::Other(text) => text.as_str(),
            reason => get_failure_text(reason.code()),
        }
    }
}

impl fmt::Display for TrackingFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A candidate surface intersection returned by a hit-test.
pub trait SurfaceHit: Send + Sync {
    /// Depth-only and low-confidence hits must report `false`.
    fn is_valid_surface_hit(&self) -> bool;

    /// Returns `None` when tracking was lost between hit-test and anchor creation.
    fn create_anchor(&self) -> Option<SpatialAnchor>;
}

/// Immutable per-update snapshot supplied by the tracking provider.
pub trait TrackingFrame: Send + Sync {
    /// Ray-cast from a screen point. Results are ordered nearest first.
    fn hit_test(&self, screen: Vec2) -> Vec<Box<dyn SurfaceHit>>;

    fn tracking_failure_reason(&self) -> Option<TrackingFailureReason>;
}

/// What kind of trackable a hit landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    Plane { pose_in_polygon: bool },
    Point { oriented: bool },
    DepthPoint,
    InstantPlacement,
}

/// Plain-data hit result that providers can translate their native hits into.
#[derive(Debug, Clone)]
pub struct HitResult {
    pub pose: Transform,
    /// Distance from the camera along the ray, in metres.
    pub distance: f32,
    pub confidence: f32,
    pub kind: HitKind,
    /// Whether the underlying trackable is still tracking, and so can host an anchor.
    pub tracking: bool,
}

impl HitResult {
    /// A confident hit inside a detected plane.
    pub fn plane(translation: Vec3) -> Self {
        Self {
            pose: Transform::from_translation(translation),
            distance: 1.0,
            confidence: 1.0,
            kind: HitKind::Plane {
                pose_in_polygon: true,
            },
            tracking: true,
        }
    }

    pub fn with_kind(mut self, kind: HitKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_tracking(mut self, tracking: bool) -> Self {
        self.tracking = tracking;
        self
    }
}

impl SurfaceHit for HitResult {
    fn is_valid_surface_hit(&self) -> bool {
        if !self.distance.is_finite() || self.distance <= 0.0 {
            return false;
        }
        if self.confidence < MIN_HIT_CONFIDENCE {
            return false;
        }
        match self.kind {
            HitKind::Plane { pose_in_polygon } => pose_in_polygon,
            HitKind::Point { oriented } => oriented,
            HitKind::DepthPoint | HitKind::InstantPlacement => false,
        }
    }

    fn create_anchor(&self) -> Option<SpatialAnchor> {
        self.tracking.then(|| SpatialAnchor::new(self.pose))
    }
}

/// Frame that replays recorded hit results for every hit-test, regardless of
/// screen position. Used to drive the core from captured sessions.
#[derive(Debug, Clone, Default)]
pub struct ReplayFrame {
    hits: Vec<HitResult>,
    failure: Option<TrackingFailureReason>,
}

impl ReplayFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hit(mut self, hit: HitResult) -> Self {
        self.hits.push(hit);
        self
    }

    pub fn with_failure(mut self, reason: TrackingFailureReason) -> Self {
        self.failure = Some(reason);
        self
    }
}

impl TrackingFrame for ReplayFrame {
    fn hit_test(&self, _screen: Vec2) -> Vec<Box<dyn SurfaceHit>> {
        self.hits
            .iter()
            .cloned()
            .map(|hit| Box::new(hit) as Box<dyn SurfaceHit>)
            .collect()
    }

    fn tracking_failure_reason(&self) -> Option<TrackingFailureReason> {
        self.failure.clone()
    }
}

/// First valid hit in provider order. The provider already sorts by depth.
pub fn first_valid_hit(frame: &dyn TrackingFrame, screen: Vec2) -> Option<Box<dyn SurfaceHit>> {
    frame
        .hit_test(screen)
        .into_iter()
        .find(|hit| hit.is_valid_surface_hit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_depth_only_and_low_confidence_hits() {
        let origin = Vec3::ZERO;
        assert!(HitResult::plane(origin).is_valid_surface_hit());
        assert!(
            !HitResult::plane(origin)
                .with_kind(HitKind::DepthPoint)
                .is_valid_surface_hit()
        );
        assert!(
            !HitResult::plane(origin)
                .with_kind(HitKind::InstantPlacement)
                .is_valid_surface_hit()
        );
        assert!(
            !HitResult::plane(origin)
                .with_kind(HitKind::Plane {
                    pose_in_polygon: false
                })
                .is_valid_surface_hit()
        );
        assert!(
            HitResult::plane(origin)
                .with_kind(HitKind::Point { oriented: true })
                .is_valid_surface_hit()
        );
        assert!(
            !HitResult::plane(origin)
                .with_confidence(0.1)
                .is_valid_surface_hit()
        );
    }

    #[test]
    fn hits_behind_the_camera_are_invalid() {
        let mut hit = HitResult::plane(Vec3::ONE);
        hit.distance = -0.5;
        assert!(!hit.is_valid_surface_hit());
        hit.distance = f32::NAN;
        assert!(!hit.is_valid_surface_hit());
    }

    #[test]
    fn anchor_creation_fails_once_tracking_is_lost() {
        let hit = HitResult::plane(Vec3::new(1.0, 0.0, 2.0));
        let anchor = hit.create_anchor().expect("tracking hit should anchor");
        assert_eq!(anchor.translation(), Vec3::new(1.0, 0.0, 2.0));

        assert!(hit.with_tracking(false).create_anchor().is_none());
    }

    #[test]
    fn anchor_ids_are_unique() {
        let a = SpatialAnchor::new(Transform::IDENTITY);
        let b = SpatialAnchor::new(Transform::IDENTITY);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn first_valid_hit_keeps_provider_order() {
        let frame = ReplayFrame::new()
            .with_hit(HitResult::plane(Vec3::X).with_kind(HitKind::DepthPoint))
            .with_hit(HitResult::plane(Vec3::Y))
            .with_hit(HitResult::plane(Vec3::Z));

        let hit = first_valid_hit(&frame, Vec2::ZERO).expect("valid hit");
        let anchor = hit.create_anchor().expect("anchor");
        assert_eq!(anchor.translation(), Vec3::Y);
    }

    #[test]
    fn failure_descriptions_pass_through() {
        assert_eq!(
            TrackingFailureReason::ExcessiveMotion.description(),
            "Moving too fast. Slow down."
        );
        let custom = TrackingFailureReason::Other("Kamera verdeckt".to_string());
        assert_eq!(custom.to_string(), "Kamera verdeckt");
    }
}
