//! Analysis tap and spectrum computation
//!
//! The tap sits at the end of the chain and only records a mono mix of the
//! most recent `FFT_SIZE` frames. Spectra are computed on request from a copy
//! of that history, never on the render thread.

use crate::nodes::AudioNode;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

pub const FFT_SIZE: usize = 2048;
pub const FREQUENCY_BIN_COUNT: usize = FFT_SIZE / 2;

/// Weight of the previous spectrum in the running average
pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

/// Non-destructive probe recording the signal passing through it
pub struct AnalysisTap {
    history: Vec<f32>,
    write_pos: usize,
}

impl AnalysisTap {
    pub fn new() -> Self {
        Self {
            history: vec![0.0; FFT_SIZE],
            write_pos: 0,
        }
    }

    /// Most recent `FFT_SIZE` mono samples, oldest first
    pub fn snapshot(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(FFT_SIZE);
        out.extend_from_slice(&self.history[self.write_pos..]);
        out.extend_from_slice(&self.history[..self.write_pos]);
        out
    }
}

impl Default for AnalysisTap {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioNode for AnalysisTap {
    fn process(&mut self, buffer: &mut [f32], _sample_rate: u32) {
        for frame in buffer.chunks_exact(2) {
            self.history[self.write_pos] = (frame[0] + frame[1]) * 0.5;
            self.write_pos = (self.write_pos + 1) % FFT_SIZE;
        }
    }

    fn reset(&mut self) {
        self.history.fill(0.0);
        self.write_pos = 0;
    }

    fn name(&self) -> &str {
        "Analysis Tap"
    }
}

/// Turns tap snapshots into byte-normalised spectra
///
/// Keeps the smoothed magnitudes between calls, like a hardware analyser.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    bins: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let fft = FftPlanner::new().plan_fft_forward(FFT_SIZE);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
        // Blackman window
        let window = (0..FFT_SIZE)
            .map(|n| {
                let x = 2.0 * PI * n as f32 / FFT_SIZE as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Self {
            fft,
            window,
            smoothed: vec![0.0; FREQUENCY_BIN_COUNT],
            bins: vec![Complex::default(); FFT_SIZE],
            scratch,
        }
    }

    /// One byte per bin: 0 at `MIN_DECIBELS` or below, 255 at `MAX_DECIBELS` or above
    pub fn frequency_bytes(&mut self, samples: &[f32]) -> Vec<u8> {
        for (i, bin) in self.bins.iter_mut().enumerate() {
            let s = samples.get(i).copied().unwrap_or(0.0);
            *bin = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process_with_scratch(&mut self.bins, &mut self.scratch);

        let range = MAX_DECIBELS - MIN_DECIBELS;
        self.smoothed
            .iter_mut()
            .zip(&self.bins)
            .map(|(smoothed, bin)| {
                let magnitude = bin.norm() / FFT_SIZE as f32;
                *smoothed = SMOOTHING_TIME_CONSTANT * *smoothed
                    + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
                let db = if *smoothed > 0.0 {
                    20.0 * smoothed.log10()
                } else {
                    f32::NEG_INFINITY
                };
                (255.0 / range * (db - MIN_DECIBELS)).clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    /// One byte per sample, 128 is silence
    pub fn time_domain_bytes(samples: &[f32]) -> Vec<u8> {
        samples
            .iter()
            .map(|&s| (128.0 * (1.0 + s)).clamp(0.0, 255.0) as u8)
            .collect()
    }

    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
