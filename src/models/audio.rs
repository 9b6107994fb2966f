// Data models for microphone spectrum analysis

use serde::{Deserialize, Serialize};

/// Byte-scaled power spectrum for one tick, in the layout of a Web Audio
/// `AnalyserNode::getByteFrequencyData` call: `fft_size / 2` bins, each
/// 0..=255 over the analyser's decibel range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSnapshot {
    pub bins: Vec<u8>,
    pub fft_size: usize,
    /// Capture sample rate in Hz, when the source reports one
    #[serde(default)]
    pub sample_rate: Option<u32>,
}

impl SpectrumSnapshot {
    pub fn new(bins: Vec<u8>, fft_size: usize, sample_rate: Option<u32>) -> Self {
        Self {
            bins,
            fft_size,
            sample_rate,
        }
    }

    /// A spectrum with every bin at `level`
    pub fn flat(level: u8, fft_size: usize, sample_rate: Option<u32>) -> Self {
        Self::new(vec![level; fft_size / 2], fft_size, sample_rate)
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Width of one bin in Hz
    pub fn bin_hz(&self, fallback_sample_rate: u32) -> f32 {
        let rate = self.sample_rate.unwrap_or(fallback_sample_rate);
        rate as f32 / self.fft_size.max(1) as f32
    }
}

/// Speech classification for a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceActivity {
    Speech,
    Silence,
}

impl VoiceActivity {
    pub fn is_speech(self) -> bool {
        self == VoiceActivity::Speech
    }
}
