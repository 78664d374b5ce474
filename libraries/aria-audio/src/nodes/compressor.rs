/// Dynamics compressor
///
/// Two-stage design: a peak detector with instant attack and a fixed slow
/// release tracks the level, then the gain reduction derived from the
/// static curve is smoothed with the configured attack/release times.
/// Stereo-linked so the image does not shift under compression.
use super::AudioNode;
use aria_core::CompressorSettings;

const NOISE_FLOOR_DB: f32 = -120.0;
const PEAK_RELEASE_SEC: f32 = 0.05;

pub struct Compressor {
    settings: CompressorSettings,
    sample_rate: u32,
    needs_update: bool,

    peak_release_coeff: f32,
    attack_coeff: f32,
    release_coeff: f32,

    peak_level_db: f32,
    gain_reduction_db: f32,
}

/// One-pole coefficient reaching 63% of a step after `seconds`
fn time_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    let samples = seconds * sample_rate;
    if samples < 1.0 {
        0.0
    } else {
        (-1.0 / samples).exp()
    }
}

impl Compressor {
    pub fn new(settings: CompressorSettings) -> Self {
        Self {
            settings: settings.clamped(),
            sample_rate: 0,
            needs_update: true,
            peak_release_coeff: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            peak_level_db: NOISE_FLOOR_DB,
            gain_reduction_db: 0.0,
        }
    }

    pub fn set_settings(&mut self, settings: CompressorSettings) {
        self.settings = settings.clamped();
        self.needs_update = true;
    }

    pub fn settings(&self) -> CompressorSettings {
        self.settings
    }

    /// Current smoothed gain reduction (dB, <= 0)
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    fn update_coefficients(&mut self) {
        if !self.needs_update {
            return;
        }
        let sr = self.sample_rate as f32;
        self.peak_release_coeff = time_coefficient(PEAK_RELEASE_SEC, sr);
        self.attack_coeff = time_coefficient(self.settings.attack_sec, sr);
        self.release_coeff = time_coefficient(self.settings.release_sec, sr);
        self.needs_update = false;
    }

    /// Static curve: output level (dB) for a given input level (dB)
    pub fn output_level(&self, input_db: f32) -> f32 {
        let CompressorSettings {
            threshold_db,
            knee_db,
            ratio,
            ..
        } = self.settings;

        if knee_db <= 0.0 {
            if input_db <= threshold_db {
                input_db
            } else {
                threshold_db + (input_db - threshold_db) / ratio
            }
        } else {
            let knee_start = threshold_db - knee_db / 2.0;
            let knee_end = threshold_db + knee_db / 2.0;
            if input_db <= knee_start {
                input_db
            } else if input_db >= knee_end {
                threshold_db + (input_db - threshold_db) / ratio
            } else {
                let x = input_db - knee_start;
                input_db - (1.0 - 1.0 / ratio) / (2.0 * knee_db) * x * x
            }
        }
    }

    #[inline]
    fn update_peak_level(&mut self, input_db: f32) {
        if input_db > self.peak_level_db {
            self.peak_level_db = input_db;
        } else {
            self.peak_level_db = self.peak_release_coeff * (self.peak_level_db - NOISE_FLOOR_DB)
                + NOISE_FLOOR_DB;
        }
    }

    #[inline]
    fn smooth_gain_reduction(&mut self, target_db: f32) {
        let coeff = if target_db < self.gain_reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.gain_reduction_db = coeff * self.gain_reduction_db + (1.0 - coeff) * target_db;
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(CompressorSettings::default())
    }
}

impl AudioNode for Compressor {
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        if self.sample_rate != sample_rate {
            self.sample_rate = sample_rate;
            self.needs_update = true;
        }
        self.update_coefficients();

        for frame in buffer.chunks_exact_mut(2) {
            let peak = frame[0].abs().max(frame[1].abs());
            let input_db = if peak > 1e-10 {
                20.0 * peak.log10()
            } else {
                -200.0
            };

            self.update_peak_level(input_db);
            let target = self.output_level(self.peak_level_db) - self.peak_level_db;
            self.smooth_gain_reduction(target);

            let gain = 10.0_f32.powf(self.gain_reduction_db / 20.0);
            frame[0] *= gain;
            frame[1] *= gain;
        }
    }

    fn reset(&mut self) {
        self.peak_level_db = NOISE_FLOOR_DB;
        self.gain_reduction_db = 0.0;
    }

    /// A 1:1 ratio never changes the signal
    fn is_active(&self) -> bool {
        self.settings.ratio > 1.0
    }

    fn name(&self) -> &str {
        "Dynamics Compressor"
    }
}
