// Microphone tracks
// `PcmAudioTrack` analyses whatever PCM it is fed; the cpal-backed
// `MicrophoneTrack` feeds one from the system input device.

#[cfg(feature = "mic-cpal")]
mod microphone;
#[cfg(feature = "mic-cpal")]
pub use microphone::*;

use crate::core::spectrum::SpectrumAnalyser;
use crate::models::audio::SpectrumSnapshot;
use crate::platform::media::AudioTrack;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Audio track driven by pushed mono samples
pub struct PcmAudioTrack {
    analyser: Mutex<SpectrumAnalyser>,
    samples_seen: AtomicU64,
    live: AtomicBool,
}

impl PcmAudioTrack {
    pub fn new(fft_size: usize, sample_rate: u32) -> Self {
        Self {
            analyser: Mutex::new(SpectrumAnalyser::new(fft_size, sample_rate)),
            samples_seen: AtomicU64::new(0),
            live: AtomicBool::new(true),
        }
    }

    /// Feed mono samples in `[-1.0, 1.0]`. Ignored once stopped.
    pub fn push_samples(&self, samples: &[f32]) {
        if !self.is_live() {
            return;
        }
        if let Ok(mut analyser) = self.analyser.lock() {
            analyser.push_samples(samples);
            self.samples_seen
                .fetch_add(samples.len() as u64, Ordering::Relaxed);
        }
    }

    /// Downmix interleaved frames and feed them
    pub fn push_interleaved(&self, data: &[f32], channels: usize) {
        if channels <= 1 {
            self.push_samples(data);
            return;
        }
        let mono: Vec<f32> = data
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        self.push_samples(&mono);
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen.load(Ordering::Relaxed)
    }
}

impl AudioTrack for PcmAudioTrack {
    fn spectrum(&self) -> Option<SpectrumSnapshot> {
        if !self.is_live() || self.samples_seen() == 0 {
            return None;
        }
        self.analyser.lock().ok().map(|mut analyser| analyser.snapshot())
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio_activity::AudioActivityDetector;
    use crate::models::audio::VoiceActivity;
    use std::f32::consts::PI;

    fn tone(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / 48_000.0).sin())
            .collect()
    }

    #[test]
    fn test_no_spectrum_before_samples() {
        let track = PcmAudioTrack::new(1024, 48_000);
        assert!(track.spectrum().is_none());
    }

    #[test]
    fn test_voice_band_tone_classifies_as_speech() {
        let track = PcmAudioTrack::new(1024, 48_000);
        let detector = AudioActivityDetector::new(48_000);

        // A spread of tones across the voice band
        let mut samples = vec![0.0; 4096];
        for freq in (400..3200).step_by(150) {
            for (s, t) in samples.iter_mut().zip(tone(freq as f32, 0.05, 4096)) {
                *s += t;
            }
        }
        for _ in 0..10 {
            track.push_samples(&samples);
            track.spectrum();
        }

        let spectrum = track.spectrum().unwrap();
        assert_eq!(spectrum.sample_rate, Some(48_000));
        assert_eq!(detector.classify(&spectrum), VoiceActivity::Speech);
    }

    #[test]
    fn test_silence_classifies_as_silence() {
        let track = PcmAudioTrack::new(1024, 48_000);
        let detector = AudioActivityDetector::new(48_000);
        track.push_samples(&vec![0.0; 2048]);
        let spectrum = track.spectrum().unwrap();
        assert_eq!(detector.classify(&spectrum), VoiceActivity::Silence);
    }

    #[test]
    fn test_stopped_track_reports_nothing() {
        let track = PcmAudioTrack::new(1024, 48_000);
        track.push_samples(&vec![0.1; 1024]);
        track.stop();
        assert!(!track.is_live());
        assert!(track.spectrum().is_none());

        track.push_samples(&vec![0.1; 1024]);
        assert_eq!(track.samples_seen(), 1024);
    }

    #[test]
    fn test_interleaved_stereo_is_downmixed() {
        let track = PcmAudioTrack::new(1024, 48_000);
        track.push_interleaved(&[0.5, -0.5, 0.25, 0.25], 2);
        assert_eq!(track.samples_seen(), 2);
    }
}
