// Landmark classification - turns face-mesh geometry into violation flags

use crate::models::landmarks::{FaceLandmarkSet, FaceMeshLandmark, Keypoint};
use crate::models::violation::{ViolationKind, ViolationSet};

/// Roll angle (degrees) beyond which the head counts as tilted
pub const HEAD_TILT_MAX_DEGREES: f64 = 20.0;
/// Nose offset from the eye midpoint, in inter-eye distances
pub const HEAD_TURN_MAX_OFFSET: f64 = 0.35;
/// Iris offset from the eye-corner midpoint, in eye widths
pub const GAZE_MAX_OFFSET: f64 = 0.6;
/// Accepted face width range in normalized frame units (inclusive)
pub const FACE_WIDTH_MIN: f64 = 0.1;
pub const FACE_WIDTH_MAX: f64 = 0.8;

/// Measurements taken from a single face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceGeometry {
    pub roll_degrees: f64,
    pub turn_offset: f64,
    /// (left, right) iris offsets; `None` without refined landmarks
    pub gaze_offsets: Option<(f64, f64)>,
    pub width: f64,
}

impl FaceGeometry {
    /// Measure a face, or `None` when a required landmark is missing
    pub fn measure(face: &FaceLandmarkSet) -> Option<Self> {
        let nose = face.get(FaceMeshLandmark::NoseTip)?;
        let left_outer = face.get(FaceMeshLandmark::LeftEyeOuter)?;
        let left_inner = face.get(FaceMeshLandmark::LeftEyeInner)?;
        let right_inner = face.get(FaceMeshLandmark::RightEyeInner)?;
        let right_outer = face.get(FaceMeshLandmark::RightEyeOuter)?;

        let dx = right_outer.x - left_outer.x;
        let dy = right_outer.y - left_outer.y;
        let roll_degrees = dy.atan2(dx).to_degrees();

        let eyes_mid_x = (left_outer.x + right_outer.x) / 2.0;
        let eye_distance = (dx * dx + dy * dy).sqrt();
        let turn_offset = (nose.x - eyes_mid_x) / eye_distance;

        let gaze_offsets = match (
            face.get(FaceMeshLandmark::LeftIrisCenter),
            face.get(FaceMeshLandmark::RightIrisCenter),
        ) {
            (Some(left_iris), Some(right_iris)) => Some((
                iris_offset(left_iris, left_outer, left_inner),
                iris_offset(right_iris, right_inner, right_outer),
            )),
            _ => None,
        };

        Some(Self {
            roll_degrees,
            turn_offset,
            gaze_offsets,
            width: face.bounding_width(),
        })
    }

    /// Flags raised by this face
    pub fn violations(&self) -> ViolationSet {
        let mut raised = ViolationSet::new();

        if self.roll_degrees.abs() > HEAD_TILT_MAX_DEGREES {
            raised.insert(ViolationKind::HeadTilt);
        }

        if self.turn_offset.abs() > HEAD_TURN_MAX_OFFSET {
            raised.insert(ViolationKind::HeadTurned);
        }

        if let Some((left, right)) = self.gaze_offsets {
            if left.abs() > GAZE_MAX_OFFSET || right.abs() > GAZE_MAX_OFFSET {
                raised.insert(ViolationKind::GazeAway);
            }
        }

        if self.width < FACE_WIDTH_MIN || self.width > FACE_WIDTH_MAX {
            raised.insert(ViolationKind::FaceVisibility);
        }

        raised
    }
}

fn iris_offset(iris: Keypoint, corner_a: Keypoint, corner_b: Keypoint) -> f64 {
    let eye_width = (corner_b.x - corner_a.x).abs();
    let eye_mid = (corner_a.x + corner_b.x) / 2.0;
    (iris.x - eye_mid) / eye_width
}

/// Stateless classifier applied to every frame's landmark output
#[derive(Debug, Default, Clone, Copy)]
pub struct LandmarkClassifier;

impl LandmarkClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify all faces in one frame
    ///
    /// An empty frame raises nothing; absence of a face is not treated as a
    /// visibility violation.
    pub fn classify(&self, faces: &[FaceLandmarkSet]) -> ViolationSet {
        let mut raised = ViolationSet::new();

        if faces.len() > 1 {
            raised.insert(ViolationKind::MultiplePeople);
        }

        for face in faces {
            match FaceGeometry::measure(face) {
                Some(geometry) => raised.extend(&geometry.violations()),
                None => {
                    tracing::debug!(points = face.len(), "Face landmark set missing required indices");
                }
            }
        }

        raised
    }
}


#[cfg(test)]
mod tests {
    use super::test_faces::FaceBuilder;
    use super::*;

    fn classify(face: FaceLandmarkSet) -> ViolationSet {
        LandmarkClassifier::new().classify(&[face])
    }

    fn geometry(roll_degrees: f64, width: f64) -> FaceGeometry {
        FaceGeometry {
            roll_degrees,
            turn_offset: 0.0,
            gaze_offsets: Some((0.0, 0.0)),
            width,
        }
    }

    #[test]
    fn test_frontal_face_is_clean() {
        let face = FaceBuilder::frontal().width(0.3).build();
        let raised = classify(face);
        assert!(raised.is_empty(), "unexpected flags: {:?}", raised.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_no_faces_raises_nothing() {
        assert!(LandmarkClassifier::new().classify(&[]).is_empty());
    }

    #[test]
    fn test_multiple_people_raised_once() {
        let face = FaceBuilder::frontal().width(0.3).build();
        let raised = LandmarkClassifier::new().classify(&[face.clone(), face.clone(), face]);
        assert!(raised.contains(ViolationKind::MultiplePeople));
        assert_eq!(raised.len(), 1);
    }

    #[test]
    fn test_head_tilt_threshold_is_strict() {
        assert!(!geometry(20.0, 0.3).violations().contains(ViolationKind::HeadTilt));
        assert!(geometry(20.01, 0.3).violations().contains(ViolationKind::HeadTilt));
        assert!(geometry(-20.01, 0.3).violations().contains(ViolationKind::HeadTilt));
    }

    #[test]
    fn test_roll_measured_from_outer_eye_corners() {
        let face = FaceBuilder::frontal().width(0.3).roll(20.0).build();
        let measured = FaceGeometry::measure(&face).unwrap();
        assert!((measured.roll_degrees - 20.0).abs() < 1e-9);

        let at_threshold = FaceBuilder::frontal().width(0.3).roll(20.0).build();
        assert!(!classify(at_threshold).contains(ViolationKind::HeadTilt));

        let below = FaceBuilder::frontal().width(0.3).roll(19.99).build();
        assert!(!classify(below).contains(ViolationKind::HeadTilt));

        let above = FaceBuilder::frontal().width(0.3).roll(20.01).build();
        assert!(classify(above).contains(ViolationKind::HeadTilt));

        let other_way = FaceBuilder::frontal().width(0.3).roll(-25.0).build();
        assert!(classify(other_way).contains(ViolationKind::HeadTilt));
    }

    #[test]
    fn test_head_turned() {
        // Eye distance 0.06 around a midpoint of 0.05
        let slight = FaceBuilder::frontal()
            .width(0.3)
            .set(FaceMeshLandmark::NoseTip, 0.068, 0.5)
            .build();
        assert!(!classify(slight).contains(ViolationKind::HeadTurned));

        let turned = FaceBuilder::frontal()
            .width(0.3)
            .set(FaceMeshLandmark::NoseTip, 0.02, 0.5)
            .build();
        let measured = FaceGeometry::measure(&turned).unwrap();
        assert!((measured.turn_offset + 0.5).abs() < 1e-4);
        assert!(classify(turned).contains(ViolationKind::HeadTurned));
    }

    #[test]
    fn test_gaze_away_either_eye() {
        // Left eye spans 0.02..0.04, right eye 0.06..0.08
        let left_away = FaceBuilder::frontal()
            .width(0.3)
            .set(FaceMeshLandmark::LeftIrisCenter, 0.045, 0.4)
            .build();
        assert!(classify(left_away).contains(ViolationKind::GazeAway));

        let right_away = FaceBuilder::frontal()
            .width(0.3)
            .set(FaceMeshLandmark::RightIrisCenter, 0.055, 0.4)
            .build();
        assert!(classify(right_away).contains(ViolationKind::GazeAway));

        let within = FaceBuilder::frontal()
            .width(0.3)
            .set(FaceMeshLandmark::LeftIrisCenter, 0.035, 0.4)
            .build();
        assert!(!classify(within).contains(ViolationKind::GazeAway));
    }

    #[test]
    fn test_gaze_skipped_without_iris() {
        let face = FaceBuilder::frontal()
            .width(0.3)
            .without_iris()
            .build();
        let measured = FaceGeometry::measure(&face).unwrap();
        assert!(measured.gaze_offsets.is_none());
        assert!(!classify(face).contains(ViolationKind::GazeAway));
    }

    #[test]
    fn test_face_visibility_bounds_are_inclusive() {
        for width in [0.1_f64, 0.8] {
            let face = FaceBuilder::frontal().width(width).build();
            assert_eq!(face.bounding_width(), width);
            assert!(
                !classify(face).contains(ViolationKind::FaceVisibility),
                "width {} should be accepted",
                width
            );
        }
        for width in [0.09_f64, 0.81] {
            let face = FaceBuilder::frontal().width(width).build();
            assert!(
                classify(face).contains(ViolationKind::FaceVisibility),
                "width {} should be flagged",
                width
            );
        }
    }

    #[test]
    fn test_truncated_landmark_set_contributes_no_face_flags() {
        let face = FaceLandmarkSet::new(vec![Keypoint::new(0.5, 0.5); 10]);
        assert!(FaceGeometry::measure(&face).is_none());
        assert!(classify(face).is_empty());
    }
}
