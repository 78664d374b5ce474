use super::{flush_denormal, AudioNode};
use aria_core::ChorusSettings;
use std::f32::consts::PI;

const MAX_DELAY_SEC: f32 = 0.05;
const BASE_DELAY_SEC: f32 = 0.02;
/// Modulation swing at depth 1.0
const MAX_DEPTH_SEC: f32 = 0.005;
/// Right channel LFO leads the left by 90 degrees
const STEREO_OFFSET: f32 = PI * 0.5;

/// Modulated stereo delay
///
/// The delay time swings around `BASE_DELAY_SEC` driven by a sine LFO.
/// The delay line is sized lazily on the first block at a given rate.
pub struct Chorus {
    settings: ChorusSettings,
    buffers: [Vec<f32>; 2],
    write_pos: usize,
    phase: f32,
    sample_rate: u32,
}

impl Chorus {
    pub fn new(settings: ChorusSettings) -> Self {
        Self {
            settings: settings.clamped(),
            buffers: [Vec::new(), Vec::new()],
            write_pos: 0,
            phase: 0.0,
            sample_rate: 0,
        }
    }

    pub fn set_settings(&mut self, settings: ChorusSettings) {
        self.settings = settings.clamped();
    }

    pub fn settings(&self) -> ChorusSettings {
        self.settings
    }

    fn prepare(&mut self, sample_rate: u32) {
        if self.sample_rate == sample_rate {
            return;
        }
        let len = ((MAX_DELAY_SEC * sample_rate as f32) as usize).max(4);
        self.buffers = [vec![0.0; len], vec![0.0; len]];
        self.write_pos = 0;
        self.sample_rate = sample_rate;
    }

    #[inline]
    fn read_interpolated(buffer: &[f32], position: f32) -> f32 {
        let len = buffer.len();
        let base = position.floor();
        let frac = position - base;
        let i0 = (base as usize) % len;
        let i1 = (i0 + 1) % len;
        buffer[i0] + (buffer[i1] - buffer[i0]) * frac
    }
}

impl Default for Chorus {
    fn default() -> Self {
        Self::new(ChorusSettings::default())
    }
}

impl AudioNode for Chorus {
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        self.prepare(sample_rate);

        let sr = sample_rate as f32;
        let len = self.buffers[0].len();
        let base = BASE_DELAY_SEC * sr;
        let swing = self.settings.depth * MAX_DEPTH_SEC * sr;
        let phase_step = 2.0 * PI * self.settings.rate / sr;
        let wet = self.settings.wet_level;
        let feedback = self.settings.feedback;

        for frame in buffer.chunks_exact_mut(2) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                let lfo = (self.phase + STEREO_OFFSET * ch as f32).sin();
                let delay = (base + swing * lfo).clamp(1.0, (len - 2) as f32);
                let read_pos = self.write_pos as f32 + len as f32 - delay;
                let delayed = Self::read_interpolated(&self.buffers[ch], read_pos);

                let input = *sample;
                self.buffers[ch][self.write_pos] = flush_denormal(input + delayed * feedback);
                *sample = input * (1.0 - wet) + delayed * wet;
            }

            self.write_pos = (self.write_pos + 1) % len;
            self.phase += phase_step;
            if self.phase > 2.0 * PI {
                self.phase -= 2.0 * PI;
            }
        }
    }

    fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
        self.write_pos = 0;
        self.phase = 0.0;
    }

    fn is_active(&self) -> bool {
        self.settings.wet_level > 0.0
    }

    fn name(&self) -> &str {
        "Chorus"
    }
}
