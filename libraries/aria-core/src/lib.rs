//! Aria Core
//!
//! Value types and collaborator contracts shared by the audio engine and the
//! playback session.
//!
//! # Architecture
//!
//! - **Domain Types**: `Track`, `AudioSource`, `PlaylistSnapshot`
//! - **Parameters**: `EqualizerState`, `EffectsState` and their pure delta types
//! - **Collaborators**: `SourceResolver`, `CrossOriginRelay`, `SessionMetadataSink`, `PlaylistStore`
//!
//! # Example
//!
//! ```rust
//! use aria_core::{AudioSource, EqualizerState, Track};
//!
//! let track = Track::new("intro", "Intro", "Aria", AudioSource::url("https://example.com/intro.mp3"));
//! assert_eq!(track.duration, 0.0);
//!
//! let eq = EqualizerState::flat().with_band(0, 20.0).unwrap();
//! assert_eq!(eq.gain(0), Some(12.0));
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ExtractionError, PersistenceError};
pub use traits::{CrossOriginRelay, PlaylistStore, SessionMetadataSink, SourceResolver};
pub use types::{
    AudioSource, ChorusDelta, ChorusSettings, CompressorDelta, CompressorSettings,
    DistortionDelta, DistortionSettings, EffectGroups, EffectsDelta, EffectsState,
    EqualizerState, MetadataPlaybackState, OversampleMode, PlaybackSessionState,
    PlaylistSnapshot, RepeatMode, ResolvedSource, ReverbDelta, ReverbSettings, SessionMetadata,
    Track, TransportCommand, TransportState, BAND_COUNT, BAND_FREQUENCIES, MAX_BAND_GAIN_DB,
    MIN_BAND_GAIN_DB,
};
