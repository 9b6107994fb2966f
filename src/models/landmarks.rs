// Data models for face-landmark inference results

use serde::{Deserialize, Serialize};

// ==============================================================================
// Keypoints
// ==============================================================================

/// A single face-mesh landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64, // Normalized [0, 1] across the frame width
    pub y: f64, // Normalized [0, 1] across the frame height
    #[serde(default)]
    pub z: f64, // Relative depth, unused by the classifier
}

impl Keypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// MediaPipe Face Mesh indices the classifier depends on.
///
/// The detector must preserve this index contract; iris centers only exist
/// when refined landmarks are enabled (478 points instead of 468).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FaceMeshLandmark {
    NoseTip = 1,
    LeftEyeOuter = 33,
    LeftEyeInner = 133,
    RightEyeInner = 362,
    RightEyeOuter = 263,
    LeftIrisCenter = 468,
    RightIrisCenter = 473,
}

impl FaceMeshLandmark {
    pub fn index(self) -> usize {
        self as usize
    }
}

// ==============================================================================
// Face Landmark Set
// ==============================================================================

/// Ordered landmarks for one detected face
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarkSet {
    pub points: Vec<Keypoint>,
}

impl FaceLandmarkSet {
    pub fn new(points: Vec<Keypoint>) -> Self {
        Self { points }
    }

    pub fn get(&self, landmark: FaceMeshLandmark) -> Option<Keypoint> {
        self.points.get(landmark.index()).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether refined iris landmarks are present
    pub fn has_iris(&self) -> bool {
        self.get(FaceMeshLandmark::LeftIrisCenter).is_some()
            && self.get(FaceMeshLandmark::RightIrisCenter).is_some()
    }

    /// Horizontal extent of all landmarks (max x - min x)
    pub fn bounding_width(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        let (min_x, max_x) = self
            .points
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
        max_x - min_x
    }
}

// ==============================================================================
// Detector Options
// ==============================================================================

/// Options handed to the face-landmark capability at load time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMeshOptions {
    pub max_num_faces: u32,
    pub refine_landmarks: bool,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for FaceMeshOptions {
    fn default() -> Self {
        Self {
            max_num_faces: 4,
            refine_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}
