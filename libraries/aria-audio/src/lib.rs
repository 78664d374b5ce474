//! Aria Audio
//!
//! The signal graph engine behind Aria's player.
//!
//! This crate provides:
//! - A long-lived processing chain (gain, 10-band EQ, compressor,
//!   distortion, chorus, convolution reverb) with an analysis tap
//! - A render context driven by a real-time thread or a manual clock
//! - Source loading over HTTP or from disk, decoded with Symphonia and
//!   resampled with rubato
//!
//! # Example: Rendering a Tone
//!
//! ```rust,no_run
//! use aria_audio::{synth::tone_wav, ContextConfig, SignalGraphEngine};
//! use aria_core::AudioSource;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = SignalGraphEngine::with_config(ContextConfig::manual(48000))?;
//! let wav = tone_wav(440.0, 2.0, 48000)?;
//! engine.load_source(AudioSource::Bytes(wav)).await?;
//!
//! engine.set_equalizer_band(0, 6.0);
//! engine.play();
//! engine.render_seconds(1.0)?;
//!
//! println!("{:.2}s of {:.2}s", engine.current_time(), engine.duration());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
mod context;
mod decoder;
mod engine;
mod error;
mod graph;
mod loader;
pub mod nodes;
mod resampling;
pub mod synth;

pub use context::{
    AudioSink, ContextConfig, MemorySink, NullSink, RenderClock, RenderContext, WavFileSink,
};
pub use decoder::{decode_bytes, DecodedAudio};
pub use engine::{FetchedLoad, PendingLoad, SignalGraphEngine, SourceInfo};
pub use error::{EngineError, LoadError, Result};
pub use graph::{SignalGraph, SourceNode};
pub use loader::{DefaultSourceLoader, FetchedBytes, SourceLoader};
pub use resampling::resample_stereo;
