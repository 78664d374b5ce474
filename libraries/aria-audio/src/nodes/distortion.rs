use super::AudioNode;
use aria_core::OversampleMode;

/// Number of points in the transfer curve
pub const CURVE_RESOLUTION: usize = 44_100;

/// Build the waveshaping transfer curve for `amount` in [0, 100]
///
/// `f(x) = (1 + k) x / (1 + k |x|)` sampled over [-1, 1]. `k = 0` is the
/// identity; larger values bend the curve towards a soft clip while keeping
/// `f(±1) = ±1`.
pub fn distortion_curve(amount: f32) -> Vec<f32> {
    let k = if amount.is_finite() {
        amount.clamp(0.0, 100.0)
    } else {
        0.0
    };
    (0..CURVE_RESOLUTION)
        .map(|i| {
            let x = i as f32 * 2.0 / (CURVE_RESOLUTION - 1) as f32 - 1.0;
            (1.0 + k) * x / (1.0 + k * x.abs())
        })
        .collect()
}

/// Waveshaper stage
///
/// Input is upsampled by linear interpolation, shaped through the curve
/// and averaged back down.
pub struct Distortion {
    amount: f32,
    curve: Vec<f32>,
    oversample: OversampleMode,
    previous: [f32; 2],
}

impl Distortion {
    pub fn new() -> Self {
        Self {
            amount: 0.0,
            curve: distortion_curve(0.0),
            oversample: OversampleMode::default(),
            previous: [0.0; 2],
        }
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn oversample(&self) -> OversampleMode {
        self.oversample
    }

    pub fn set_oversample(&mut self, mode: OversampleMode) {
        self.oversample = mode;
    }

    /// Swap in a curve built off the render thread
    pub fn set_curve(&mut self, amount: f32, curve: Vec<f32>) {
        if curve.len() == CURVE_RESOLUTION {
            self.amount = amount;
            self.curve = curve;
        }
    }

    pub fn set_amount(&mut self, amount: f32) {
        self.set_curve(amount, distortion_curve(amount));
    }

    /// Curve lookup with linear interpolation, clamping outside [-1, 1]
    #[inline]
    fn shape(&self, x: f32) -> f32 {
        let pos = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * (CURVE_RESOLUTION - 1) as f32;
        let idx = pos as usize;
        if idx >= CURVE_RESOLUTION - 1 {
            return self.curve[CURVE_RESOLUTION - 1];
        }
        let frac = pos - idx as f32;
        self.curve[idx] + (self.curve[idx + 1] - self.curve[idx]) * frac
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioNode for Distortion {
    fn process(&mut self, buffer: &mut [f32], _sample_rate: u32) {
        let factor = self.oversample.factor();
        for frame in buffer.chunks_exact_mut(2) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                let prev = self.previous[ch];
                let current = *sample;
                let mut acc = 0.0;
                for step in 1..=factor {
                    let t = step as f32 / factor as f32;
                    acc += self.shape(prev + (current - prev) * t);
                }
                self.previous[ch] = current;
                *sample = acc / factor as f32;
            }
        }
    }

    fn reset(&mut self) {
        self.previous = [0.0; 2];
    }

    fn is_active(&self) -> bool {
        self.amount > 0.0
    }

    fn name(&self) -> &str {
        "Waveshaper"
    }
}
