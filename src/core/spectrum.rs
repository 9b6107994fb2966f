// Spectrum analysis for raw microphone samples
// Produces the same byte-scaled magnitudes a Web Audio AnalyserNode reports,
// so the audio activity thresholds carry over to native capture unchanged.

use crate::models::audio::SpectrumSnapshot;
use std::collections::VecDeque;
use std::f32::consts::PI;

pub const DEFAULT_SMOOTHING: f32 = 0.8;
pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;

/// Sliding-window spectrum analyser
///
/// Keeps the most recent `fft_size` samples. Each [`snapshot`](Self::snapshot)
/// applies a Blackman window, transforms, smooths against the previous
/// snapshot and maps decibels onto `0..=255`.
#[derive(Debug, Clone)]
pub struct SpectrumAnalyser {
    fft_size: usize,
    sample_rate: u32,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    samples: VecDeque<f32>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyser {
    /// Create an analyser. `fft_size` is rounded up to a power of two (minimum 32).
    pub fn new(fft_size: usize, sample_rate: u32) -> Self {
        let fft_size = fft_size.max(32).next_power_of_two();
        Self {
            fft_size,
            sample_rate,
            smoothing: DEFAULT_SMOOTHING,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
            window: blackman_window(fft_size),
            samples: VecDeque::from(vec![0.0; fft_size]),
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.clamp(0.0, 1.0);
        self
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Append mono samples in `[-1.0, 1.0]`, discarding the oldest
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            if self.samples.len() == self.fft_size {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    /// Compute the current byte spectrum
    pub fn snapshot(&mut self) -> SpectrumSnapshot {
        let n = self.fft_size;
        let mut re: Vec<f32> = self
            .samples
            .iter()
            .zip(&self.window)
            .map(|(s, w)| s * w)
            .collect();
        let mut im = vec![0.0; n];
        fft_in_place(&mut re, &mut im);

        let range = self.max_decibels - self.min_decibels;
        let bins = self
            .smoothed
            .iter_mut()
            .enumerate()
            .map(|(k, previous)| {
                let magnitude = (re[k] * re[k] + im[k] * im[k]).sqrt() / n as f32;
                *previous = self.smoothing * *previous + (1.0 - self.smoothing) * magnitude;

                let db = 20.0 * previous.log10();
                let scaled = (255.0 / range) * (db - self.min_decibels);
                if scaled.is_finite() {
                    scaled.floor().clamp(0.0, 255.0) as u8
                } else {
                    0
                }
            })
            .collect();

        SpectrumSnapshot::new(bins, n, Some(self.sample_rate))
    }

    pub fn reset(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self.smoothed.iter_mut().for_each(|m| *m = 0.0);
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42, 0.5, 0.08);
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / n as f32;
            a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
        })
        .collect()
}

/// Iterative radix-2 Cooley-Tukey transform. Length must be a power of two.
fn fft_in_place(re: &mut [f32], im: &mut [f32]) {
    let n = re.len();
    debug_assert!(n.is_power_of_two() && im.len() == n);

    // Bit-reversal permutation
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let angle = -2.0 * PI / len as f32;
        let (w_im, w_re) = angle.sin_cos();
        for start in (0..n).step_by(len) {
            let (mut cur_re, mut cur_im) = (1.0_f32, 0.0_f32);
            for k in 0..len / 2 {
                let a = start + k;
                let b = a + len / 2;
                let t_re = re[b] * cur_re - im[b] * cur_im;
                let t_im = re[b] * cur_im + im[b] * cur_re;
                re[b] = re[a] - t_re;
                im[b] = im[a] - t_im;
                re[a] += t_re;
                im[a] += t_im;

                let next_re = cur_re * w_re - cur_im * w_im;
                cur_im = cur_re * w_im + cur_im * w_re;
                cur_re = next_re;
            }
        }
        len <<= 1;
    }
}
