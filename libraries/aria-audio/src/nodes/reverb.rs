//! Convolution reverb over a generated impulse response
//!
//! The impulse is two seconds of exponentially decaying stereo noise.
//! `room_size` scales its amplitude and `damping` its decay rate. The
//! convolution is uniformly partitioned overlap-save, so the wet path runs
//! one partition behind the dry path.

use super::AudioNode;
use aria_core::ReverbSettings;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Impulse response length
pub const IMPULSE_SECONDS: f32 = 2.0;

const PARTITION: usize = 512;
const FFT_LEN: usize = PARTITION * 2;
const NOISE_SEED: u64 = 0x5EED_CAFE;

/// Decay rate (1/s) at damping 0 and the extra rate added at damping 1
const BASE_DECAY: f32 = 2.0;
const DAMPING_DECAY: f32 = 10.0;

/// Time-domain stereo impulse for the given settings
///
/// Each channel is normalised to unit energy before the `room_size` gain,
/// so the wet level stays comparable across damping values.
pub fn generate_impulse_response(sample_rate: u32, settings: &ReverbSettings) -> [Vec<f32>; 2] {
    let settings = settings.clamped();
    let len = (IMPULSE_SECONDS * sample_rate as f32) as usize;
    let decay = BASE_DECAY + settings.damping * DAMPING_DECAY;
    let mut rng = StdRng::seed_from_u64(NOISE_SEED);

    let mut channels = [Vec::with_capacity(len), Vec::with_capacity(len)];
    for i in 0..len {
        let envelope = (-decay * i as f32 / sample_rate as f32).exp();
        for channel in &mut channels {
            channel.push(rng.gen_range(-1.0f32..1.0) * envelope);
        }
    }

    for channel in &mut channels {
        let energy = channel.iter().map(|s| s * s).sum::<f32>().sqrt();
        let scale = if energy > 0.0 {
            settings.room_size / energy
        } else {
            0.0
        };
        channel.iter_mut().for_each(|s| *s *= scale);
    }
    channels
}

/// Impulse response split into partition spectra
pub struct ImpulseResponse {
    sample_rate: u32,
    room_size: f32,
    damping: f32,
    spectra: [Vec<Vec<Complex<f32>>>; 2],
}

impl ImpulseResponse {
    /// Generate and transform; expensive, keep it off the render thread
    pub fn new(sample_rate: u32, settings: &ReverbSettings) -> Self {
        let settings = settings.clamped();
        let raw = generate_impulse_response(sample_rate, &settings);
        let fft = FftPlanner::new().plan_fft_forward(FFT_LEN);
        let mut scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];

        let spectra = raw.map(|channel| {
            channel
                .chunks(PARTITION)
                .map(|chunk| {
                    let mut bins = vec![Complex::default(); FFT_LEN];
                    for (bin, &s) in bins.iter_mut().zip(chunk) {
                        *bin = Complex::new(s, 0.0);
                    }
                    fft.process_with_scratch(&mut bins, &mut scratch);
                    bins
                })
                .collect()
        });

        Self {
            sample_rate,
            room_size: settings.room_size,
            damping: settings.damping,
            spectra,
        }
    }

    pub fn partitions(&self) -> usize {
        self.spectra[0].len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// True when regenerating for `settings` would give the same impulse
    pub fn matches(&self, sample_rate: u32, settings: &ReverbSettings) -> bool {
        let settings = settings.clamped();
        self.sample_rate == sample_rate
            && self.room_size == settings.room_size
            && self.damping == settings.damping
    }
}

/// Overlap-save state for one channel
struct ChannelConvolver {
    // [previous block | current block]
    input: Vec<f32>,
    output: Vec<f32>,
    fill: usize,
    // frequency-domain delay line, one spectrum per partition
    history: Vec<Vec<Complex<f32>>>,
    head: usize,
    spectrum: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
}

impl ChannelConvolver {
    fn new(partitions: usize) -> Self {
        Self {
            input: vec![0.0; FFT_LEN],
            output: vec![0.0; PARTITION],
            fill: 0,
            history: vec![vec![Complex::default(); FFT_LEN]; partitions.max(1)],
            head: 0,
            spectrum: vec![Complex::default(); FFT_LEN],
            accum: vec![Complex::default(); FFT_LEN],
        }
    }

    fn reset(&mut self) {
        self.input.fill(0.0);
        self.output.fill(0.0);
        self.fill = 0;
        for spectrum in &mut self.history {
            spectrum.fill(Complex::default());
        }
        self.head = 0;
    }

    #[inline]
    fn push(&mut self, x: f32, kernels: &[Vec<Complex<f32>>], fft: &mut Transforms) -> f32 {
        let y = self.output[self.fill];
        self.input[PARTITION + self.fill] = x;
        self.fill += 1;
        if self.fill == PARTITION {
            self.convolve_block(kernels, fft);
            self.fill = 0;
        }
        y
    }

    fn convolve_block(&mut self, kernels: &[Vec<Complex<f32>>], fft: &mut Transforms) {
        for (bin, &s) in self.spectrum.iter_mut().zip(&self.input) {
            *bin = Complex::new(s, 0.0);
        }
        fft.forward(&mut self.spectrum);

        let count = self.history.len();
        self.history[self.head].copy_from_slice(&self.spectrum);

        self.accum.fill(Complex::default());
        for (p, kernel) in kernels.iter().enumerate().take(count) {
            let delayed = &self.history[(self.head + count - p) % count];
            for ((acc, x), h) in self.accum.iter_mut().zip(delayed).zip(kernel) {
                *acc += x * h;
            }
        }
        fft.inverse(&mut self.accum);

        let scale = 1.0 / FFT_LEN as f32;
        for (out, bin) in self.output.iter_mut().zip(&self.accum[PARTITION..]) {
            *out = bin.re * scale;
        }

        self.head = (self.head + 1) % count;
        self.input.copy_within(PARTITION.., 0);
    }
}

struct Transforms {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Transforms {
    fn new() -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(FFT_LEN);
        let inverse = planner.plan_fft_inverse(FFT_LEN);
        let len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            forward,
            inverse,
            scratch: vec![Complex::default(); len],
        }
    }

    fn forward(&mut self, buffer: &mut [Complex<f32>]) {
        self.forward.process_with_scratch(buffer, &mut self.scratch);
    }

    fn inverse(&mut self, buffer: &mut [Complex<f32>]) {
        self.inverse.process_with_scratch(buffer, &mut self.scratch);
    }
}

/// Reverb stage: dry signal plus the convolved wet signal
pub struct Reverb {
    settings: ReverbSettings,
    impulse: ImpulseResponse,
    channels: [ChannelConvolver; 2],
    transforms: Transforms,
}

impl Reverb {
    pub fn new(sample_rate: u32, settings: ReverbSettings) -> Self {
        let settings = settings.clamped();
        Self::with_impulse(settings, ImpulseResponse::new(sample_rate, &settings))
    }

    pub fn with_impulse(settings: ReverbSettings, impulse: ImpulseResponse) -> Self {
        let partitions = impulse.partitions();
        Self {
            settings: settings.clamped(),
            impulse,
            channels: [
                ChannelConvolver::new(partitions),
                ChannelConvolver::new(partitions),
            ],
            transforms: Transforms::new(),
        }
    }

    pub fn settings(&self) -> ReverbSettings {
        self.settings
    }

    pub fn impulse(&self) -> &ImpulseResponse {
        &self.impulse
    }

    /// Update wet/dry levels only; the impulse stays as it is
    pub fn set_levels(&mut self, settings: ReverbSettings) {
        let settings = settings.clamped();
        self.settings.wet_level = settings.wet_level;
        self.settings.dry_level = settings.dry_level;
    }

    /// Install a regenerated impulse together with the settings it was built for
    pub fn set_impulse(&mut self, settings: ReverbSettings, impulse: ImpulseResponse) {
        let partitions = impulse.partitions();
        self.settings = settings.clamped();
        self.impulse = impulse;
        self.channels = [
            ChannelConvolver::new(partitions),
            ChannelConvolver::new(partitions),
        ];
    }
}

impl AudioNode for Reverb {
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        if self.impulse.sample_rate() != sample_rate {
            let settings = self.settings;
            self.set_impulse(settings, ImpulseResponse::new(sample_rate, &settings));
        }

        let ReverbSettings {
            wet_level,
            dry_level,
            ..
        } = self.settings;

        if wet_level <= 0.0 {
            buffer.iter_mut().for_each(|s| *s *= dry_level);
            return;
        }

        for frame in buffer.chunks_exact_mut(2) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                let x = *sample;
                let wet =
                    self.channels[ch].push(x, &self.impulse.spectra[ch], &mut self.transforms);
                *sample = x * dry_level + wet * wet_level;
            }
        }
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }

    fn is_active(&self) -> bool {
        self.settings.wet_level > 0.0 || self.settings.dry_level != 1.0
    }

    fn name(&self) -> &str {
        "Convolution Reverb"
    }
}
