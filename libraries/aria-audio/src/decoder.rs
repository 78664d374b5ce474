//! Symphonia-based decoding of in-memory sources
//!
//! Everything is decoded up front into interleaved stereo `f32`. Mono is
//! duplicated, surround is folded down to the front pair.

use crate::error::LoadError;
use bytes::Bytes;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Fully decoded audio
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved stereo samples
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Duration as declared by the container, if it declared one
    pub declared_duration: Option<f64>,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }
}

/// Decode a complete file held in memory
///
/// `extension` is only a probing hint; the content decides.
pub fn decode_bytes(data: Bytes, extension: Option<&str>) -> Result<DecodedAudio, LoadError> {
    if data.is_empty() {
        return Err(LoadError::Empty);
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| LoadError::Unsupported(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| LoadError::Unsupported("no audio track".into()))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| LoadError::Unsupported("sample rate not declared".into()))?;
    let declared_duration = track
        .codec_params
        .n_frames
        .map(|frames| frames as f64 / f64::from(sample_rate));

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| LoadError::Unsupported(e.to_string()))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(LoadError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                push_stereo(buf.samples(), channels, &mut samples);
            }
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!("Skipping corrupt packet: {}", e);
            }
            Err(e) => return Err(LoadError::Decode(e.to_string())),
        }
    }

    if samples.is_empty() {
        return Err(LoadError::Empty);
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        declared_duration,
    })
}

fn push_stereo(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            for &s in interleaved {
                out.push(s);
                out.push(s);
            }
        }
        2 => out.extend_from_slice(interleaved),
        n => {
            for frame in interleaved.chunks_exact(n) {
                out.push(frame[0]);
                out.push(frame[1]);
            }
        }
    }
}
