// Inference capability bridge
// The face-landmark and object models are black boxes behind these traits;
// hosts plug in whatever runtime they have (browser bindings, ONNX, a remote service)

pub mod json;

use crate::models::capture::{ObjectPrediction, VideoFrame};
use crate::models::error::ProctorResult;
use crate::models::landmarks::{FaceLandmarkSet, FaceMeshOptions};
use async_trait::async_trait;
use std::sync::Arc;

/// Multi-face landmark detector (MediaPipe Face Mesh index contract)
#[async_trait]
pub trait FaceLandmarker: Send + Sync {
    /// One landmark set per detected face, at most `max_num_faces`
    async fn detect(&self, frame: &VideoFrame) -> ProctorResult<Vec<FaceLandmarkSet>>;

    /// Human-readable backend description for logs
    fn model_info(&self) -> String;
}

/// General object detector (COCO-SSD style class labels)
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self, frame: &VideoFrame) -> ProctorResult<Vec<ObjectPrediction>>;

    fn model_info(&self) -> String;
}

/// Loads both capabilities at session start. A failure here is fatal to the session.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn load_face_landmarker(
        &self,
        options: &FaceMeshOptions,
    ) -> ProctorResult<Arc<dyn FaceLandmarker>>;

    async fn load_object_detector(&self) -> ProctorResult<Arc<dyn ObjectDetector>>;
}

/// Both capabilities, ready for the frame loop
#[derive(Clone)]
pub struct Capabilities {
    pub face_landmarker: Arc<dyn FaceLandmarker>,
    pub object_detector: Arc<dyn ObjectDetector>,
}

impl Capabilities {
    pub async fn load(provider: &dyn ModelProvider, options: &FaceMeshOptions) -> ProctorResult<Self> {
        let object_detector = provider.load_object_detector().await?;
        let face_landmarker = provider.load_face_landmarker(options).await?;

        tracing::info!(
            face = %face_landmarker.model_info(),
            objects = %object_detector.model_info(),
            "Inference capabilities loaded"
        );

        Ok(Self {
            face_landmarker,
            object_detector,
        })
    }
}

/// Provider that hands out already constructed capabilities
pub struct PreloadedModels {
    capabilities: Capabilities,
}

impl PreloadedModels {
    pub fn new(face_landmarker: Arc<dyn FaceLandmarker>, object_detector: Arc<dyn ObjectDetector>) -> Self {
        Self {
            capabilities: Capabilities {
                face_landmarker,
                object_detector,
            },
        }
    }
}

#[async_trait]
impl ModelProvider for PreloadedModels {
    async fn load_face_landmarker(
        &self,
        _options: &FaceMeshOptions,
    ) -> ProctorResult<Arc<dyn FaceLandmarker>> {
        Ok(self.capabilities.face_landmarker.clone())
    }

    async fn load_object_detector(&self) -> ProctorResult<Arc<dyn ObjectDetector>> {
        Ok(self.capabilities.object_detector.clone())
    }
}
