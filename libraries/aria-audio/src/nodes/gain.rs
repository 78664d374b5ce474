use super::AudioNode;

/// Frames over which a volume change is ramped
const RAMP_FRAMES: u32 = 128;

/// Master volume stage
///
/// Volume is a linear factor in [0, 1]. Changes ramp linearly over
/// `RAMP_FRAMES` to avoid zipper noise.
pub struct GainNode {
    target: f32,
    current: f32,
    step: f32,
    ramp_remaining: u32,
}

impl GainNode {
    pub fn new(volume: f32) -> Self {
        let volume = volume.clamp(0.0, 1.0);
        Self {
            target: volume,
            current: volume,
            step: 0.0,
            ramp_remaining: 0,
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.target = volume;
        self.step = (self.target - self.current) / RAMP_FRAMES as f32;
        self.ramp_remaining = RAMP_FRAMES;
    }

    pub fn volume(&self) -> f32 {
        self.target
    }
}

impl AudioNode for GainNode {
    fn process(&mut self, buffer: &mut [f32], _sample_rate: u32) {
        for frame in buffer.chunks_exact_mut(2) {
            if self.ramp_remaining > 0 {
                self.current += self.step;
                self.ramp_remaining -= 1;
                if self.ramp_remaining == 0 {
                    self.current = self.target;
                }
            }
            frame[0] *= self.current;
            frame[1] *= self.current;
        }
    }

    fn reset(&mut self) {
        self.current = self.target;
        self.ramp_remaining = 0;
    }

    fn name(&self) -> &str {
        "Master Gain"
    }
}
