// Trace replay
// Plays back a recorded (or hand-written) JSON-lines trace of per-frame model
// output as a live capture stream with matching inference capabilities.
//
// One line per frame:
// {"at_ms": 0, "faces": {"multiFaceLandmarks": [...]}, "objects": [...], "audio_level": 80}
// `poses` may replace `faces` to synthesize landmark sets from a few angles.

use crate::models::audio::SpectrumSnapshot;
use crate::models::capture::{ObjectPrediction, VideoFrame};
use crate::models::error::{ProctorError, ProctorResult};
use crate::models::landmarks::{FaceLandmarkSet, FaceMeshLandmark, Keypoint};
use crate::platform::inference::json::{parse_face_mesh_results, parse_object_predictions};
use crate::platform::inference::{FaceLandmarker, ObjectDetector, PreloadedModels};
use crate::platform::media::{AudioTrack, CaptureStream, VideoTrack};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

// ==============================================================================
// Synthetic faces
// ==============================================================================

/// Compact description of a face, expanded into a full landmark set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacePose {
    /// Roll of the eye line in degrees
    pub roll_degrees: f64,
    /// Nose offset from the eye midpoint, in inter-eye distances
    pub turn: f64,
    /// Iris offset from each eye's center, in eye widths
    pub gaze: f64,
    /// Face bounding width in normalized frame units
    pub width: f64,
    pub center_x: f64,
    pub center_y: f64,
    /// Include the iris landmarks (478 points)
    pub refined: bool,
}

impl Default for FacePose {
    fn default() -> Self {
        Self {
            roll_degrees: 0.0,
            turn: 0.0,
            gaze: 0.0,
            width: 0.3,
            center_x: 0.5,
            center_y: 0.5,
            refined: true,
        }
    }
}

const CHEEK_LEFT: usize = 234;
const CHEEK_RIGHT: usize = 454;

impl FacePose {
    /// Expand into a Face Mesh landmark set
    pub fn landmarks(&self) -> FaceLandmarkSet {
        let count = if self.refined { 478 } else { 468 };
        let (cx, cy) = (self.center_x, self.center_y);
        let (sin, cos) = self.roll_degrees.to_radians().sin_cos();
        let place = |dx: f64, dy: f64| Keypoint::new(cx + dx * cos - dy * sin, cy + dx * sin + dy * cos);

        let eye_distance = self.width * 0.5;
        let eye_width = eye_distance * 0.3;
        let eye_y = -0.1 * self.width;
        let left_outer = -eye_distance / 2.0;
        let right_outer = eye_distance / 2.0;
        let left_center = left_outer + eye_width / 2.0;
        let right_center = right_outer - eye_width / 2.0;

        let mut points = vec![Keypoint::new(cx, cy); count];
        points[CHEEK_LEFT] = place(-self.width / 2.0, 0.0);
        points[CHEEK_RIGHT] = place(self.width / 2.0, 0.0);
        points[FaceMeshLandmark::LeftEyeOuter.index()] = place(left_outer, eye_y);
        points[FaceMeshLandmark::LeftEyeInner.index()] = place(left_outer + eye_width, eye_y);
        points[FaceMeshLandmark::RightEyeInner.index()] = place(right_outer - eye_width, eye_y);
        points[FaceMeshLandmark::RightEyeOuter.index()] = place(right_outer, eye_y);
        points[FaceMeshLandmark::NoseTip.index()] = place(self.turn * eye_distance, 0.0);
        if self.refined {
            points[FaceMeshLandmark::LeftIrisCenter.index()] =
                place(left_center + self.gaze * eye_width, eye_y);
            points[FaceMeshLandmark::RightIrisCenter.index()] =
                place(right_center + self.gaze * eye_width, eye_y);
        }

        FaceLandmarkSet::new(points)
    }
}

// ==============================================================================
// Trace
// ==============================================================================

/// One recorded frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub at_ms: u64,
    /// Face Mesh results object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub poses: Vec<FacePose>,
    /// COCO-SSD predictions array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Value>,
    /// Full spectrum for this frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spectrum: Option<SpectrumSnapshot>,
    /// Shorthand for a flat spectrum at this byte level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_level: Option<u8>,
}

/// Frames with their model output already parsed
#[derive(Debug, Clone, Default)]
pub struct ReplayTrace {
    frames: Vec<ParsedFrame>,
}

#[derive(Debug, Clone)]
struct ParsedFrame {
    at: Duration,
    faces: Vec<FaceLandmarkSet>,
    objects: Vec<ObjectPrediction>,
    spectrum: Option<SpectrumSnapshot>,
}

impl ReplayTrace {
    /// Parse a JSON-lines trace. Blank lines and `#` comments are skipped.
    pub fn from_reader<R: BufRead>(reader: R, fft_size: usize, sample_rate: u32) -> ProctorResult<Self> {
        let mut frames = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let frame: ReplayFrame = serde_json::from_str(trimmed).map_err(|e| {
                ProctorError::CaptureFailed(format!("Trace line {}: {}", line_no + 1, e))
            })?;
            frames.push(frame);
        }
        Self::from_frames(frames, fft_size, sample_rate)
    }

    pub fn load(path: &Path, fft_size: usize, sample_rate: u32) -> ProctorResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file), fft_size, sample_rate)
    }

    pub fn from_frames(frames: Vec<ReplayFrame>, fft_size: usize, sample_rate: u32) -> ProctorResult<Self> {
        let mut parsed = Vec::with_capacity(frames.len());
        let mut last_at = 0;

        for frame in frames {
            if frame.at_ms < last_at {
                return Err(ProctorError::CaptureFailed(format!(
                    "Trace timestamps go backwards at {} ms",
                    frame.at_ms
                )));
            }
            last_at = frame.at_ms;

            let mut faces = match &frame.faces {
                Some(results) => parse_face_mesh_results(results)?,
                None => Vec::new(),
            };
            faces.extend(frame.poses.iter().map(FacePose::landmarks));

            let objects = match &frame.objects {
                Some(predictions) => parse_object_predictions(predictions)?,
                None => Vec::new(),
            };

            let spectrum = frame.spectrum.or_else(|| {
                frame
                    .audio_level
                    .map(|level| SpectrumSnapshot::flat(level, fft_size, Some(sample_rate)))
            });

            parsed.push(ParsedFrame {
                at: Duration::from_millis(frame.at_ms),
                faces,
                objects,
                spectrum,
            });
        }

        Ok(Self { frames: parsed })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Time of the last frame
    pub fn duration(&self) -> Duration {
        self.frames.last().map(|f| f.at).unwrap_or_default()
    }
}

// ==============================================================================
// Stream and capabilities
// ==============================================================================

/// Builds a capture stream and models that play back a trace in real (tokio) time
pub struct ReplayStream;

impl ReplayStream {
    pub fn build(trace: ReplayTrace, width: u32, height: u32) -> (CaptureStream, PreloadedModels) {
        let mut faces = HashMap::new();
        let mut objects = HashMap::new();
        let mut timeline = Vec::with_capacity(trace.frames.len());

        for (i, frame) in trace.frames.into_iter().enumerate() {
            // Frame timestamps double as the lookup key for the scripted models
            faces.insert(i as i64, frame.faces);
            objects.insert(i as i64, frame.objects);
            timeline.push((frame.at, frame.spectrum));
        }

        let current_spectrum = Arc::new(Mutex::new(None));
        let video = Arc::new(ReplayVideoTrack {
            timeline,
            cursor: AtomicUsize::new(0),
            origin: Mutex::new(None),
            width,
            height,
            live: AtomicBool::new(true),
            current_spectrum: Arc::clone(&current_spectrum),
        });
        let audio = Arc::new(ReplayAudioTrack {
            current_spectrum,
            live: AtomicBool::new(true),
        });

        let models = PreloadedModels::new(
            Arc::new(ReplayLandmarker { faces }),
            Arc::new(ReplayObjects { objects }),
        );

        (CaptureStream::new(video, Some(audio)), models)
    }
}

struct ReplayVideoTrack {
    timeline: Vec<(Duration, Option<SpectrumSnapshot>)>,
    cursor: AtomicUsize,
    origin: Mutex<Option<Instant>>,
    width: u32,
    height: u32,
    live: AtomicBool,
    current_spectrum: Arc<Mutex<Option<SpectrumSnapshot>>>,
}

#[async_trait]
impl VideoTrack for ReplayVideoTrack {
    async fn next_frame(&self) -> ProctorResult<Option<VideoFrame>> {
        if !self.is_live() {
            return Ok(None);
        }

        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let Some((at, spectrum)) = self.timeline.get(index) else {
            self.live.store(false, Ordering::SeqCst);
            return Ok(None);
        };

        let origin = {
            let mut origin = self
                .origin
                .lock()
                .map_err(|_| ProctorError::CaptureFailed("Replay clock poisoned".to_string()))?;
            *origin.get_or_insert_with(Instant::now)
        };
        tokio::time::sleep_until(origin + *at).await;

        if !self.is_live() {
            return Ok(None);
        }

        if let Ok(mut current) = self.current_spectrum.lock() {
            *current = spectrum.clone();
        }

        Ok(Some(VideoFrame::empty(index as i64, self.width, self.height)))
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

struct ReplayAudioTrack {
    current_spectrum: Arc<Mutex<Option<SpectrumSnapshot>>>,
    live: AtomicBool,
}

impl AudioTrack for ReplayAudioTrack {
    fn spectrum(&self) -> Option<SpectrumSnapshot> {
        if !self.is_live() {
            return None;
        }
        self.current_spectrum.lock().ok().and_then(|s| s.clone())
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

struct ReplayLandmarker {
    faces: HashMap<i64, Vec<FaceLandmarkSet>>,
}

#[async_trait]
impl FaceLandmarker for ReplayLandmarker {
    async fn detect(&self, frame: &VideoFrame) -> ProctorResult<Vec<FaceLandmarkSet>> {
        self.faces
            .get(&frame.timestamp)
            .cloned()
            .ok_or_else(|| ProctorError::InferenceFailed(format!("No faces recorded for frame {}", frame.timestamp)))
    }

    fn model_info(&self) -> String {
        format!("trace replay ({} frames)", self.faces.len())
    }
}

struct ReplayObjects {
    objects: HashMap<i64, Vec<ObjectPrediction>>,
}

#[async_trait]
impl ObjectDetector for ReplayObjects {
    async fn detect(&self, frame: &VideoFrame) -> ProctorResult<Vec<ObjectPrediction>> {
        self.objects
            .get(&frame.timestamp)
            .cloned()
            .ok_or_else(|| ProctorError::InferenceFailed(format!("No objects recorded for frame {}", frame.timestamp)))
    }

    fn model_info(&self) -> String {
        "trace replay".to_string()
    }
}
