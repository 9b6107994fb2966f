// Capture stream abstraction
// Tracks take `&self` so the session can stop them while the frame loop is
// parked on `next_frame`.

use crate::models::audio::SpectrumSnapshot;
use crate::models::capture::VideoFrame;
use crate::models::error::ProctorResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Camera track delivering frames at the device's pace
#[async_trait]
pub trait VideoTrack: Send + Sync {
    /// Wait for the next frame. `Ok(None)` once the track has ended or been stopped.
    async fn next_frame(&self) -> ProctorResult<Option<VideoFrame>>;

    /// Release the device. Idempotent.
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Microphone track exposing the latest analysed spectrum
pub trait AudioTrack: Send + Sync {
    /// Spectrum for the current tick, `None` when nothing has been captured yet
    fn spectrum(&self) -> Option<SpectrumSnapshot>;

    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Camera plus optional microphone, acquired together for one session
#[derive(Clone)]
pub struct CaptureStream {
    pub video: Arc<dyn VideoTrack>,
    pub audio: Option<Arc<dyn AudioTrack>>,
}

impl CaptureStream {
    pub fn new(video: Arc<dyn VideoTrack>, audio: Option<Arc<dyn AudioTrack>>) -> Self {
        Self { video, audio }
    }

    /// Pull this tick's spectrum, if there is a microphone
    pub fn spectrum(&self) -> Option<SpectrumSnapshot> {
        self.audio.as_ref().and_then(|audio| audio.spectrum())
    }

    /// Stop every track in the stream
    /// Stop every track; calling it again is a no-op
    pub fn stop_tracks(&self) {
        let was_live = self.video.is_live() || self.audio.as_ref().is_some_and(|audio| audio.is_live());
        self.video.stop();
        if let Some(audio) = &self.audio {
            audio.stop();
        }
        if was_live {
            tracing::info!("Capture tracks stopped");
        }
    }
}
