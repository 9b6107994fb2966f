// Host-facing seams: capture tracks and inference capabilities

pub mod audio;
pub mod inference;
pub mod media;
pub mod replay;

pub use inference::{Capabilities, FaceLandmarker, ModelProvider, ObjectDetector, PreloadedModels};
pub use media::{AudioTrack, CaptureStream, VideoTrack};
