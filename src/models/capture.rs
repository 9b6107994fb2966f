// Data structures for camera frames and object-detection output

use serde::{Deserialize, Serialize};

/// A frame delivered by the camera track. Only ever held in memory.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: PixelFormat,
}

impl VideoFrame {
    /// Frame with no pixel payload, used when detectors consume
    /// precomputed results rather than pixels
    pub fn empty(timestamp: i64, width: u32, height: u32) -> Self {
        Self {
            timestamp,
            width,
            height,
            data: Vec::new(),
            format: PixelFormat::RGBA8,
        }
    }
}

/// Pixel format of captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    RGBA8,
    BGRA8,
}

/// Box in source pixels: `[x, y, width, height]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl From<[f32; 4]> for BoundingBox {
    fn from(b: [f32; 4]) -> Self {
        Self {
            x: b[0],
            y: b[1],
            width: b[2],
            height: b[3],
        }
    }
}

/// One prediction from the general object detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPrediction {
    #[serde(rename = "class")]
    pub class_label: String,
    pub score: f32,
    pub bbox: BoundingBox,
}

impl ObjectPrediction {
    pub fn new(class_label: impl Into<String>, score: f32, bbox: [f32; 4]) -> Self {
        Self {
            class_label: class_label.into(),
            score,
            bbox: bbox.into(),
        }
    }
}
