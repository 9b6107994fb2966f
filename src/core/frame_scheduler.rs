// Per-frame evaluation pipeline
// Every delivered frame goes through the landmark classifier; object scans and
// audio ride along on the same tick.

use crate::core::audio_activity::AudioActivityDetector;
use crate::core::config::ProctorConfig;
use crate::core::landmark_classifier::LandmarkClassifier;
use crate::core::object_detector::ObjectPresenceDetector;
use crate::core::violation_aggregator::ViolationAggregator;
use crate::models::audio::SpectrumSnapshot;
use crate::models::capture::VideoFrame;
use crate::models::violation::{SessionStatus, ViolationCounts, ViolationKind, ViolationSet};
use crate::platform::inference::{Capabilities, FaceLandmarker};
use std::sync::Arc;
use tokio::time::Instant;

/// Owns every detector and the aggregator for one session
///
/// Only the frame loop touches this; it is the single writer of the counts.
pub struct FrameScheduler {
    classifier: LandmarkClassifier,
    landmarker: Arc<dyn FaceLandmarker>,
    objects: ObjectPresenceDetector,
    audio: AudioActivityDetector,
    aggregator: ViolationAggregator,
    frames: u64,
}

impl FrameScheduler {
    pub fn new(capabilities: &Capabilities, config: &ProctorConfig) -> Self {
        Self {
            classifier: LandmarkClassifier::new(),
            landmarker: Arc::clone(&capabilities.face_landmarker),
            objects: ObjectPresenceDetector::new(
                Arc::clone(&capabilities.object_detector),
                config.restricted_object_label.clone(),
                config.object_scan_interval(),
            ),
            audio: AudioActivityDetector::new(config.fallback_sample_rate),
            aggregator: ViolationAggregator::new(),
            frames: 0,
        }
    }

    /// Evaluate one frame and the audio spectrum captured alongside it
    ///
    /// A failed landmark inference leaves the face-derived kinds as they were;
    /// the object and audio results still apply.
    pub async fn on_frame(
        &mut self,
        frame: VideoFrame,
        spectrum: Option<SpectrumSnapshot>,
        now: Instant,
    ) -> SessionStatus {
        self.frames += 1;
        let frame = Arc::new(frame);

        let mut raised = match self.landmarker.detect(&frame).await {
            Ok(faces) => self.classifier.classify(&faces),
            Err(e) => {
                tracing::debug!(frame = self.frames, error = %e, "Landmark inference failed");
                self.aggregator
                    .active()
                    .iter()
                    .filter(|kind| kind.is_face_derived())
                    .collect::<ViolationSet>()
            }
        };

        if self.objects.poll(&frame, now) {
            raised.insert(ViolationKind::MobileDetected);
        }

        if self.audio.update(spectrum.as_ref(), now) {
            raised.insert(ViolationKind::AudioDetected);
        }

        self.aggregator.update(&raised)
    }

    pub fn status(&self) -> SessionStatus {
        self.aggregator.status()
    }

    pub fn counts(&self) -> ViolationCounts {
        self.aggregator.counts()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }
}
