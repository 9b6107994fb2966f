// Audio activity detection - speech presence with temporal hysteresis

use crate::models::audio::{SpectrumSnapshot, VoiceActivity};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Lower edge of the voice band in Hz
pub const VOICE_BAND_LOW_HZ: f32 = 300.0;
/// Upper edge of the voice band in Hz
pub const VOICE_BAND_HIGH_HZ: f32 = 3400.0;
/// Mean byte magnitude over the voice band above which a tick counts as speech
pub const SPEECH_ENERGY_THRESHOLD: f32 = 45.0;
/// Continuous speech longer than this raises AUDIO_DETECTED
pub const SUSTAINED_SPEECH: Duration = Duration::from_millis(2000);
/// Episodes longer than this are remembered as bursts
pub const MIN_BURST: Duration = Duration::from_millis(500);
/// Trailing window for the burst history
pub const BURST_WINDOW: Duration = Duration::from_millis(10_000);
/// Bursts inside the window that amount to a conversation
pub const CHATTER_BURSTS: usize = 3;

/// Classifies speech from one spectrum per tick and tracks speech episodes
#[derive(Debug)]
pub struct AudioActivityDetector {
    fallback_sample_rate: u32,
    speech_start: Option<Instant>,
    burst_history: VecDeque<Instant>,
}

impl AudioActivityDetector {
    /// Create a detector
    ///
    /// # Arguments
    /// * `fallback_sample_rate` - Used when a snapshot does not report its rate
    pub fn new(fallback_sample_rate: u32) -> Self {
        Self {
            fallback_sample_rate,
            speech_start: None,
            burst_history: VecDeque::new(),
        }
    }

    /// Mean magnitude over the 300-3400 Hz bins, `None` if the band falls
    /// outside the snapshot
    pub fn voice_band_energy(&self, snapshot: &SpectrumSnapshot) -> Option<f32> {
        if snapshot.bins.is_empty() {
            return None;
        }

        let bin_hz = snapshot.bin_hz(self.fallback_sample_rate);
        if bin_hz <= 0.0 {
            return None;
        }

        let start_bin = (VOICE_BAND_LOW_HZ / bin_hz).floor() as usize;
        let end_bin = ((VOICE_BAND_HIGH_HZ / bin_hz).floor() as usize).min(snapshot.bins.len() - 1);
        if start_bin > end_bin {
            return None;
        }

        let sum: u32 = snapshot.bins[start_bin..=end_bin]
            .iter()
            .map(|b| *b as u32)
            .sum();
        Some(sum as f32 / (end_bin - start_bin + 1) as f32)
    }

    pub fn classify(&self, snapshot: &SpectrumSnapshot) -> VoiceActivity {
        match self.voice_band_energy(snapshot) {
            Some(energy) if energy > SPEECH_ENERGY_THRESHOLD => VoiceActivity::Speech,
            _ => VoiceActivity::Silence,
        }
    }

    /// Advance one tick. Returns true when AUDIO_DETECTED should be raised.
    ///
    /// A missing snapshot (no audio track) counts as silence.
    pub fn update(&mut self, snapshot: Option<&SpectrumSnapshot>, now: Instant) -> bool {
        let activity = snapshot
            .map(|s| self.classify(s))
            .unwrap_or(VoiceActivity::Silence);
        self.update_with_activity(activity, now)
    }

    /// Advance one tick with an already classified activity
    pub fn update_with_activity(&mut self, activity: VoiceActivity, now: Instant) -> bool {
        let mut raised = false;

        if activity.is_speech() {
            let start = *self.speech_start.get_or_insert(now);
            if now.saturating_duration_since(start) > SUSTAINED_SPEECH {
                raised = true;
            }
        } else if let Some(start) = self.speech_start.take() {
            if now.saturating_duration_since(start) > MIN_BURST {
                self.burst_history.push_back(now);
            }
        }

        self.prune(now);
        if self.burst_history.len() >= CHATTER_BURSTS {
            raised = true;
        }

        raised
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.burst_history.front() {
            if now.saturating_duration_since(*oldest) < BURST_WINDOW {
                break;
            }
            self.burst_history.pop_front();
        }
    }

    /// Bursts currently inside the trailing window
    pub fn burst_count(&self) -> usize {
        self.burst_history.len()
    }

    pub fn is_in_speech(&self) -> bool {
        self.speech_start.is_some()
    }

    pub fn reset(&mut self) {
        self.speech_start = None;
        self.burst_history.clear();
    }
}
