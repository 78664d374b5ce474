//! Processing nodes of the signal graph
//!
//! Every node works in place on interleaved stereo `f32` blocks
//! (L, R, L, R, ...) and keeps its state between blocks, so parameter
//! changes never require rebuilding the graph.

mod chorus;
mod compressor;
mod distortion;
mod equalizer;
mod gain;
mod reverb;

pub use chorus::Chorus;
pub use compressor::Compressor;
pub use distortion::{distortion_curve, Distortion, CURVE_RESOLUTION};
pub use equalizer::{Equalizer, PeakingBand, BAND_Q};
pub use gain::GainNode;
pub use reverb::{generate_impulse_response, ImpulseResponse, Reverb, IMPULSE_SECONDS};

/// A stage in the processing chain
///
/// # Real-Time Constraints
/// `process` runs on the render thread: no allocation, no blocking.
pub trait AudioNode: Send {
    /// Process an interleaved stereo block in place
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32);

    /// Clear internal history (filter state, delay lines, tails)
    fn reset(&mut self);

    /// Inactive nodes are skipped; they must be exact pass-throughs
    fn is_active(&self) -> bool {
        true
    }

    fn name(&self) -> &str;
}

/// Flush values that would otherwise decay into denormals
#[inline]
pub(crate) fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-15 {
        0.0
    } else {
        x
    }
}
