// Parsers for the JSON shapes emitted by the browser-side models
// Face Mesh: { "multiFaceLandmarks": [[{"x":..,"y":..,"z":..}, ...], ...] }
// COCO-SSD:  [{ "class": "cell phone", "score": 0.87, "bbox": [x, y, w, h] }, ...]

use crate::models::capture::ObjectPrediction;
use crate::models::error::{ProctorError, ProctorResult};
use crate::models::landmarks::{FaceLandmarkSet, Keypoint};
use serde_json::Value;

/// Parse a Face Mesh results object into per-face landmark sets
///
/// A missing or null `multiFaceLandmarks` means no faces were found.
pub fn parse_face_mesh_results(data: &Value) -> ProctorResult<Vec<FaceLandmarkSet>> {
    let faces = match data.get("multiFaceLandmarks") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(faces) => faces
            .as_array()
            .ok_or_else(|| ProctorError::InferenceFailed("multiFaceLandmarks is not an array".to_string()))?,
    };

    faces.iter().map(parse_face).collect()
}

fn parse_face(face: &Value) -> ProctorResult<FaceLandmarkSet> {
    let landmarks = face
        .as_array()
        .ok_or_else(|| ProctorError::InferenceFailed("Face landmarks are not an array".to_string()))?;

    let points = landmarks
        .iter()
        .map(|lm| {
            let x = lm.get("x").and_then(|v| v.as_f64());
            let y = lm.get("y").and_then(|v| v.as_f64());
            match (x, y) {
                (Some(x), Some(y)) => Ok(Keypoint {
                    x,
                    y,
                    z: lm.get("z").and_then(|v| v.as_f64()).unwrap_or(0.0),
                }),
                _ => Err(ProctorError::InferenceFailed(format!(
                    "Landmark missing coordinates: {}",
                    lm
                ))),
            }
        })
        .collect::<ProctorResult<Vec<_>>>()?;

    Ok(FaceLandmarkSet::new(points))
}

/// Parse COCO-SSD predictions
pub fn parse_object_predictions(data: &Value) -> ProctorResult<Vec<ObjectPrediction>> {
    serde_json::from_value(data.clone()).map_err(|e| {
        ProctorError::InferenceFailed(format!("Failed to parse object predictions: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_two_faces() {
        let data = json!({
            "multiFaceLandmarks": [
                [{"x": 0.1, "y": 0.2, "z": -0.03}, {"x": 0.3, "y": 0.4}],
                [{"x": 0.6, "y": 0.5, "z": 0.0}]
            ]
        });

        let faces = parse_face_mesh_results(&data).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].len(), 2);
        assert!((faces[0].points[0].z + 0.03).abs() < 1e-6);
        assert_eq!(faces[1].points[0], Keypoint::new(0.6, 0.5));
    }

    #[test]
    fn test_missing_faces_is_empty() {
        assert!(parse_face_mesh_results(&json!({})).unwrap().is_empty());
        assert!(parse_face_mesh_results(&json!({"multiFaceLandmarks": null}))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_malformed_landmark_is_an_inference_error() {
        let data = json!({"multiFaceLandmarks": [[{"x": 0.1}]]});
        assert!(matches!(
            parse_face_mesh_results(&data),
            Err(ProctorError::InferenceFailed(_))
        ));
    }

    #[test]
    fn test_parse_coco_predictions() {
        let data = json!([
            {"class": "person", "score": 0.98, "bbox": [10.0, 20.0, 300.0, 400.0]},
            {"class": "cell phone", "score": 0.71, "bbox": [50.0, 60.0, 40.0, 80.0]}
        ]);

        let predictions = parse_object_predictions(&data).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[1].class_label, "cell phone");
        assert_eq!(predictions[1].bbox.height, 80.0);
    }
}
