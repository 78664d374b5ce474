//! Ten cascaded peaking filters
//!
//! One RBJ peaking biquad per band at the fixed centre frequencies in
//! `aria_core::BAND_FREQUENCIES`, all with unit Q. Gains are taken as given;
//! range checking belongs to the parameter store.

use super::{flush_denormal, AudioNode};
use aria_core::{BAND_COUNT, BAND_FREQUENCIES};
use std::f32::consts::PI;

/// Quality factor shared by all bands
pub const BAND_Q: f32 = 1.0;

/// Gains closer to zero than this are treated as flat
const FLAT_EPSILON_DB: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn peaking(frequency: f32, gain_db: f32, q: f32, sample_rate: f32) -> Self {
        if sample_rate < 1.0 || gain_db.abs() < FLAT_EPSILON_DB {
            return Self::IDENTITY;
        }

        let a = 10.0_f32.powf(gain_db / 40.0);
        // Keep the centre away from Nyquist at low sample rates
        let freq = frequency.min(sample_rate * 0.45);
        let omega = 2.0 * PI * freq / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_omega) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_omega) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }
}

/// A single peaking filter with stereo state
#[derive(Debug, Clone)]
pub struct PeakingBand {
    frequency: f32,
    gain_db: f32,
    coeffs: Coefficients,
    // [x1, x2, y1, y2] per channel
    state: [[f32; 4]; 2],
    coeffs_rate: u32,
}

impl PeakingBand {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            gain_db: 0.0,
            coeffs: Coefficients::IDENTITY,
            state: [[0.0; 4]; 2],
            coeffs_rate: 0,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Filter history is kept so the change settles naturally
    pub fn set_gain_db(&mut self, gain_db: f32) {
        if !gain_db.is_finite() {
            return;
        }
        self.gain_db = gain_db;
        self.coeffs_rate = 0;
    }

    fn prepare(&mut self, sample_rate: u32) {
        if self.coeffs_rate != sample_rate {
            self.coeffs =
                Coefficients::peaking(self.frequency, self.gain_db, BAND_Q, sample_rate as f32);
            self.coeffs_rate = sample_rate;
        }
    }

    #[inline]
    fn tick(&mut self, channel: usize, x: f32) -> f32 {
        let c = &self.coeffs;
        let s = &mut self.state[channel];
        let y = flush_denormal(c.b0 * x + c.b1 * s[0] + c.b2 * s[1] - c.a1 * s[2] - c.a2 * s[3]);
        s[1] = s[0];
        s[0] = x;
        s[3] = s[2];
        s[2] = y;
        y
    }

    fn is_flat(&self) -> bool {
        self.gain_db.abs() < FLAT_EPSILON_DB
    }

    fn reset(&mut self) {
        self.state = [[0.0; 4]; 2];
    }
}

/// The cascaded ten-band equalizer stage
pub struct Equalizer {
    bands: Vec<PeakingBand>,
}

impl Equalizer {
    pub fn new() -> Self {
        Self {
            bands: BAND_FREQUENCIES.iter().map(|&f| PeakingBand::new(f)).collect(),
        }
    }

    /// Out-of-range indices are ignored
    pub fn set_band(&mut self, index: usize, gain_db: f32) {
        if let Some(band) = self.bands.get_mut(index) {
            band.set_gain_db(gain_db);
        }
    }

    pub fn set_all(&mut self, gains: &[f32; BAND_COUNT]) {
        for (band, &gain) in self.bands.iter_mut().zip(gains) {
            band.set_gain_db(gain);
        }
    }

    pub fn gains(&self) -> [f32; BAND_COUNT] {
        let mut gains = [0.0; BAND_COUNT];
        for (slot, band) in gains.iter_mut().zip(&self.bands) {
            *slot = band.gain_db;
        }
        gains
    }

    pub fn band(&self, index: usize) -> Option<&PeakingBand> {
        self.bands.get(index)
    }
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioNode for Equalizer {
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        for band in &mut self.bands {
            if band.is_flat() {
                continue;
            }
            band.prepare(sample_rate);
            for frame in buffer.chunks_exact_mut(2) {
                frame[0] = band.tick(0, frame[0]);
                frame[1] = band.tick(1, frame[1]);
            }
        }
    }

    fn reset(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
    }

    fn is_active(&self) -> bool {
        self.bands.iter().any(|b| !b.is_flat())
    }

    fn name(&self) -> &str {
        "10-Band Equalizer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.25;
                [s, s]
            })
            .collect()
    }

    fn rms(buffer: &[f32]) -> f32 {
        (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt()
    }

    #[test]
    fn bands_use_fixed_frequencies() {
        let eq = Equalizer::new();
        assert_eq!(eq.band(0).unwrap().frequency(), 32.0);
        assert_eq!(eq.band(9).unwrap().frequency(), 16000.0);
        assert!(eq.band(10).is_none());
    }

    #[test]
    fn flat_equalizer_is_inactive() {
        let mut eq = Equalizer::new();
        assert!(!eq.is_active());
        eq.set_band(4, 3.0);
        assert!(eq.is_active());
    }

    #[test]
    fn engine_side_gain_is_not_clamped() {
        let mut eq = Equalizer::new();
        eq.set_band(2, 18.0);
        assert_eq!(eq.gains()[2], 18.0);
    }

    #[test]
    fn out_of_range_band_is_ignored() {
        let mut eq = Equalizer::new();
        eq.set_band(10, 6.0);
        assert_eq!(eq.gains(), [0.0; BAND_COUNT]);
    }

    #[test]
    fn boost_raises_level_at_centre() {
        let mut eq = Equalizer::new();
        eq.set_band(5, 12.0);

        let mut buffer = sine(1000.0, 48000, 9600);
        let before = rms(&buffer[4800..]);
        eq.process(&mut buffer, 48000);
        let after = rms(&buffer[4800..]);

        let gain_db = 20.0 * (after / before).log10();
        assert!((gain_db - 12.0).abs() < 0.5, "got {gain_db} dB");
    }

    #[test]
    fn cut_leaves_distant_band_alone() {
        let mut eq = Equalizer::new();
        eq.set_band(0, -12.0);

        let mut buffer = sine(4000.0, 48000, 9600);
        let before = rms(&buffer[4800..]);
        eq.process(&mut buffer, 48000);
        let after = rms(&buffer[4800..]);

        assert!((20.0 * (after / before).log10()).abs() < 0.2);
    }
}
