//! Synthesized demo material
//!
//! Tones are rendered straight into an in-memory WAV so they travel through
//! the same decode path as any other source.

use aria_core::{AudioSource, Track};
use bytes::Bytes;
use std::f32::consts::PI;
use std::io::Cursor;

/// Fade applied to both ends of a tone
const FADE_SECONDS: f32 = 0.01;

/// A-minor pentatonic, one note per demo track
const DEMO_NOTES: [(f32, &str); 5] = [
    (220.0, "A3"),
    (261.63, "C4"),
    (293.66, "D4"),
    (329.63, "E4"),
    (392.0, "G4"),
];

/// Stereo 16-bit sine tone as WAV bytes
pub fn tone_wav(frequency: f32, seconds: f32, sample_rate: u32) -> Result<Bytes, hound::Error> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let frames = (seconds.max(0.0) * sample_rate as f32) as usize;
    let fade = ((FADE_SECONDS * sample_rate as f32) as usize).max(1);

    let mut data = Vec::with_capacity(44 + frames * 4);
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut data), spec)?;
        for i in 0..frames {
            let envelope = (i.min(frames - 1 - i) as f32 / fade as f32).min(1.0);
            let s = (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5 * envelope;
            let v = (s * f32::from(i16::MAX)) as i16;
            writer.write_sample(v)?;
            writer.write_sample(v)?;
        }
        writer.finalize()?;
    }
    Ok(Bytes::from(data))
}

/// The `index`-th demo track (cycles through the note table)
pub fn demo_track(index: usize, seconds: f32, sample_rate: u32) -> Result<Track, hound::Error> {
    let (frequency, note) = DEMO_NOTES[index % DEMO_NOTES.len()];
    let wav = tone_wav(frequency, seconds, sample_rate)?;
    Ok(Track::new(
        format!("demo-{}", index + 1),
        format!("Demo Track {} ({note})", index + 1),
        "Aria Tone Generator",
        AudioSource::Bytes(wav),
    )
    .with_duration(f64::from(seconds)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_has_expected_length() {
        let wav = tone_wav(440.0, 1.0, 8000).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav.to_vec())).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.duration(), 8000);
    }

    #[test]
    fn tone_fades_in() {
        let wav = tone_wav(440.0, 0.5, 8000).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(wav.to_vec())).unwrap();
        let first: i16 = reader.samples::<i16>().next().unwrap().unwrap();
        assert_eq!(first, 0);
    }

    #[test]
    fn demo_tracks_are_in_memory() {
        let track = demo_track(6, 0.2, 8000).unwrap();
        assert_eq!(track.id, "demo-7");
        assert!(track.title.contains("C4"));
        assert!(!track.is_persistable());
    }
}
