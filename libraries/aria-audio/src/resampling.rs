//! Sample-rate conversion to the context rate (rubato)

use crate::error::LoadError;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

const CHUNK_FRAMES: usize = 1024;

/// Convert interleaved stereo from `from` Hz to `to` Hz
pub fn resample_stereo(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>, LoadError> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from == 0 || to == 0 {
        return Err(LoadError::Resample(format!("invalid rates {from} -> {to}")));
    }

    let ratio = f64::from(to) / f64::from(from);
    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, CHUNK_FRAMES, 2)
            .map_err(|e| LoadError::Resample(format!("failed to create resampler: {e}")))?;

    let frames = samples.len() / 2;
    let (left, right): (Vec<f32>, Vec<f32>) =
        samples.chunks_exact(2).map(|f| (f[0], f[1])).unzip();

    let expected = (frames as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut out_left = Vec::with_capacity(expected + delay + CHUNK_FRAMES);
    let mut out_right = Vec::with_capacity(expected + delay + CHUNK_FRAMES);

    let mut pos = 0;
    loop {
        let needed = resampler.input_frames_next();
        if pos + needed > frames {
            break;
        }
        let chunk = [&left[pos..pos + needed], &right[pos..pos + needed]];
        let out = resampler
            .process(&chunk[..], None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;
        out_left.extend_from_slice(&out[0]);
        out_right.extend_from_slice(&out[1]);
        pos += needed;
    }

    if pos < frames {
        let chunk = [&left[pos..], &right[pos..]];
        let out = resampler
            .process_partial(Some(&chunk[..]), None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;
        out_left.extend_from_slice(&out[0]);
        out_right.extend_from_slice(&out[1]);
    }

    // Drain the filter so the tail is not cut short
    while out_left.len() < expected + delay {
        let out = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;
        if out[0].is_empty() {
            break;
        }
        out_left.extend_from_slice(&out[0]);
        out_right.extend_from_slice(&out[1]);
    }

    let end = (delay + expected).min(out_left.len());
    let start = delay.min(end);
    Ok(out_left[start..end]
        .iter()
        .zip(&out_right[start..end])
        .flat_map(|(&l, &r)| [l, r])
        .collect())
}
